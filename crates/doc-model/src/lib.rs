use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod view;

pub use view::{
    apply_view_action, PageGeometry, Rotation, ViewAction, ViewState, DEFAULT_SCALE, MAX_SCALE,
    MIN_SCALE, ZOOM_STEP,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("page numbers are 1-based, got {0}")]
    InvalidPage(u32),
    #[error("selected text must not be empty")]
    EmptySelection,
    #[error("position must be finite with non-negative size: {0:?}")]
    InvalidPosition(CanonicalPosition),
    #[error("rotation must be a multiple of 90 degrees, got {0}")]
    InvalidRotation(i64),
}

/// Rectangle in canonical page space: scale 1, rotation 0, origin at the
/// unrotated page's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalPosition {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CanonicalPosition {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height].iter().all(|value| value.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ModelError::InvalidPosition(*self))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Transient capture of a text-selection gesture. Becomes a [`Note`] once the
/// user confirms it; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub text: String,
    pub page_number: u32,
    pub position: CanonicalPosition,
}

/// A persisted comment anchored to a canonical rectangle on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub page_number: u32,
    pub selected_text: String,
    #[serde(default)]
    pub note_text: String,
    pub position: CanonicalPosition,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Note {
    pub fn from_selection(selection: &Selection, note_text: &str) -> Result<Self, ModelError> {
        Self::with_id(NoteId::new(), selection, note_text, now_millis())
    }

    pub fn with_id(
        id: NoteId,
        selection: &Selection,
        note_text: &str,
        timestamp: u64,
    ) -> Result<Self, ModelError> {
        if selection.page_number == 0 {
            return Err(ModelError::InvalidPage(selection.page_number));
        }

        let selected_text = selection.text.trim();
        if selected_text.is_empty() {
            return Err(ModelError::EmptySelection);
        }

        selection.position.validate()?;

        Ok(Self {
            id,
            page_number: selection.page_number,
            selected_text: selected_text.to_owned(),
            note_text: note_text.trim().to_owned(),
            position: selection.position,
            timestamp,
        })
    }

    /// Applies the mutable fields of `patch`. Returns whether anything changed.
    pub fn apply_patch(&mut self, patch: &NotePatch) -> bool {
        let mut changed = false;

        if let Some(note_text) = &patch.note_text {
            if *note_text != self.note_text {
                self.note_text = note_text.clone();
                changed = true;
            }
        }

        changed
    }

    /// Selected text cut to `max_chars` characters, with `...` appended when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let mut chars = self.selected_text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();

        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// Mutable fields of a [`Note`]. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_text: Option<String>,
}

impl NotePatch {
    pub fn note_text(text: impl Into<String>) -> Self {
        Self { note_text: Some(text.into()) }
    }

    pub fn is_empty(&self) -> bool {
        self.note_text.is_none()
    }
}

pub fn notes_for_page(notes: &[Note], page_number: u32) -> Vec<&Note> {
    notes.iter().filter(|note| note.page_number == page_number).collect()
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
