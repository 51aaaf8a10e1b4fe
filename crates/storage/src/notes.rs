//! Note persistence over a single JSON slot.
//!
//! Every operation returns the complete new list so callers replace their
//! cached copy instead of patching it. Failures never reach the caller: they
//! are logged and the operation degrades to an empty or best-effort list.
//!
//! Records are decoded one at a time. An entry that is not a valid note is
//! skipped on load and written back untouched, and a slot that cannot be read
//! or parsed at all is never overwritten.

use crate::{SlotBackend, StorageError};
use doc_model::{Note, NoteId, NotePatch};
use serde_json::Value;

pub const NOTES_SLOT: &str = "pdf-reader-notes";

#[derive(Debug)]
pub struct NotesStore<B> {
    backend: B,
    slot: String,
}

/// Decoded slot: the notes plus every entry that did not decode as one.
#[derive(Debug, Default)]
struct SlotContents {
    notes: Vec<Note>,
    undecoded: Vec<Value>,
}

impl<B: SlotBackend> NotesStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_slot(backend, NOTES_SLOT)
    }

    pub fn with_slot(backend: B, slot: impl Into<String>) -> Self {
        Self { backend, slot: slot.into() }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Current snapshot; `[]` when the slot is empty, unreadable or corrupt.
    pub fn load_all(&self) -> Vec<Note> {
        match self.try_load() {
            Ok(contents) => contents.notes,
            Err(error) => {
                log::error!("failed to load notes from `{}`: {error}", self.slot);
                Vec::new()
            }
        }
    }

    /// Appends `note`. The returned list includes it even if writing failed.
    pub fn add(&self, note: Note) -> Vec<Note> {
        let Some(mut contents) = self.load_for_write() else {
            return vec![note];
        };

        contents.notes.push(note);
        self.save(&contents);
        contents.notes
    }

    pub fn remove_by_id(&self, id: &NoteId) -> Vec<Note> {
        let Some(mut contents) = self.load_for_write() else {
            return Vec::new();
        };

        let before = contents.notes.len();
        contents.notes.retain(|note| note.id != *id);

        if contents.notes.len() != before {
            self.save(&contents);
        }

        contents.notes
    }

    pub fn update_by_id(&self, id: &NoteId, patch: &NotePatch) -> Vec<Note> {
        let Some(mut contents) = self.load_for_write() else {
            return Vec::new();
        };

        let changed = contents
            .notes
            .iter_mut()
            .find(|note| note.id == *id)
            .map(|note| note.apply_patch(patch))
            .unwrap_or(false);

        if changed {
            self.save(&contents);
        }

        contents.notes
    }

    pub fn find(&self, id: &NoteId) -> Option<Note> {
        self.load_all().into_iter().find(|note| note.id == *id)
    }

    fn try_load(&self) -> Result<SlotContents, StorageError> {
        let Some(raw) = self.backend.read(&self.slot)? else {
            return Ok(SlotContents::default());
        };

        if raw.trim().is_empty() {
            return Ok(SlotContents::default());
        }

        let entries: Vec<Value> = serde_json::from_str(&raw)?;
        let mut contents = SlotContents::default();

        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Note>(entry.clone()) {
                Ok(note) => contents.notes.push(note),
                Err(error) => {
                    log::warn!("skipping record {index} in `{}`: {error}", self.slot);
                    contents.undecoded.push(entry);
                }
            }
        }

        Ok(contents)
    }

    /// Like [`Self::try_load`], but `None` when the slot must not be rewritten.
    fn load_for_write(&self) -> Option<SlotContents> {
        match self.try_load() {
            Ok(contents) => Some(contents),
            Err(error) => {
                log::error!("leaving `{}` untouched, it could not be loaded: {error}", self.slot);
                None
            }
        }
    }

    fn save(&self, contents: &SlotContents) {
        let result = contents
            .notes
            .iter()
            .map(serde_json::to_value)
            .chain(contents.undecoded.iter().cloned().map(Ok))
            .collect::<Result<Vec<Value>, _>>()
            .and_then(|entries| serde_json::to_string(&entries))
            .map_err(StorageError::from)
            .and_then(|json| self.backend.write(&self.slot, &json));

        if let Err(error) = result {
            log::error!(
                "failed to save {} notes to `{}`: {error}",
                contents.notes.len(),
                self.slot
            );
        }
    }
}
