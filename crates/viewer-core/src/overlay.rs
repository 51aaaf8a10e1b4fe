//! Note highlights for the current page.

use crate::transform::{canonical_to_screen, ScreenRect, TransformOrigin};
use doc_model::{Note, NoteId, ViewState};
use serde::Serialize;

/// A highlight to draw over the rendered page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightOverlay {
    pub note_id: NoteId,
    pub rect: ScreenRect,
    pub rotation_degrees: u16,
    pub origin: TransformOrigin,
    pub style: HighlightStyle,
    /// Always `false`: highlights never take pointer events from the page.
    pub interactive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HighlightStyle {
    /// RGBA, normalized 0-1
    pub border: (f32, f32, f32, f32),
    pub fill: (f32, f32, f32, f32),
    pub border_width_px: f32,
}

impl HighlightStyle {
    pub const NOTE: HighlightStyle = HighlightStyle {
        border: (0.98, 0.8, 0.08, 1.0),
        fill: (1.0, 0.94, 0.54, 0.3),
        border_width_px: 2.0,
    };
}

/// Screen-space highlights for every note on `view.current_page`.
///
/// Pure function of its inputs: call it again whenever the scale, rotation,
/// current page or the note list changes. Notes that cannot be placed this
/// frame (page not measured yet) are left out.
pub fn render_overlays(notes: &[Note], view: &ViewState) -> Vec<HighlightOverlay> {
    notes
        .iter()
        .filter(|note| note.page_number == view.current_page)
        .filter_map(|note| {
            let Some(placement) = canonical_to_screen(&note.position, view) else {
                log::debug!("note {} not placed on page {}", note.id, view.current_page);
                return None;
            };

            Some(HighlightOverlay {
                note_id: note.id.clone(),
                rect: placement.rect,
                rotation_degrees: placement.rotation_degrees,
                origin: placement.origin,
                style: HighlightStyle::NOTE,
                interactive: false,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{
        apply_view_action, CanonicalPosition, PageGeometry, Rotation, Selection, ViewAction,
    };

    fn note(id: &str, page_number: u32, position: CanonicalPosition) -> Note {
        let selection = Selection { text: "text".to_owned(), page_number, position };
        Note::with_id(NoteId::from(id), &selection, "", 1).expect("note should be created")
    }

    fn notes() -> Vec<Note> {
        vec![
            note("a", 1, CanonicalPosition::new(100.0, 50.0, 40.0, 20.0)),
            note("b", 2, CanonicalPosition::new(10.0, 10.0, 10.0, 10.0)),
            note("c", 1, CanonicalPosition::new(0.0, 0.0, 600.0, 12.0)),
        ]
    }

    fn view() -> ViewState {
        let mut view = ViewState::default();
        apply_view_action(&mut view, ViewAction::DocumentLoaded { page_count: 2 });
        apply_view_action(
            &mut view,
            ViewAction::SetPageGeometry(Some(PageGeometry::new(600.0, 800.0))),
        );
        view.scale = 1.0;
        view
    }

    #[test]
    fn only_current_page_notes_are_rendered() {
        let overlays = render_overlays(&notes(), &view());

        let ids: Vec<&str> = overlays.iter().map(|overlay| overlay.note_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(overlays.iter().all(|overlay| !overlay.interactive));
    }

    #[test]
    fn overlays_follow_zoom() {
        let mut view = view();
        view.scale = 2.0;

        let overlays = render_overlays(&notes(), &view);
        assert_eq!(overlays[0].rect, ScreenRect::new(200.0, 100.0, 80.0, 40.0));
        assert_eq!(overlays[0].rotation_degrees, 0);
    }

    #[test]
    fn overlays_follow_rotation() {
        let mut view = view();
        apply_view_action(&mut view, ViewAction::RotateClockwise);

        let overlays = render_overlays(&notes(), &view);
        assert_eq!(overlays[0].rect, ScreenRect::new(50.0, 660.0, 20.0, 40.0));
        assert_eq!(overlays[0].rotation_degrees, 90);
        assert_eq!(overlays[0].origin, TransformOrigin::TopLeft);

        view.rotation = Rotation::Deg180;
        let overlays = render_overlays(&notes(), &view);
        assert_eq!(overlays[0].origin, TransformOrigin::Center);
    }

    #[test]
    fn rendering_is_idempotent() {
        let notes = notes();
        let view = view();

        assert_eq!(render_overlays(&notes, &view), render_overlays(&notes, &view));
    }

    #[test]
    fn unmeasured_page_renders_nothing() {
        let mut view = view();
        apply_view_action(&mut view, ViewAction::NextPage);
        assert_eq!(view.page_geometry, None);

        assert!(render_overlays(&notes(), &view).is_empty());
    }

    #[test]
    fn overlay_serializes_for_the_shell() {
        let overlays = render_overlays(&notes(), &view());
        let value = serde_json::to_value(&overlays[0]).expect("overlay should serialize");

        assert_eq!(value["note_id"], "a");
        assert_eq!(value["origin"], "top-left");
        assert_eq!(value["rect"]["left"], 100.0);
        assert_eq!(value["interactive"], false);
    }
}
