//! Text selection capture.
//!
//! Turns the host's native text selection into a canonical [`Selection`] when
//! the user finishes a selection gesture inside the page area.

use crate::transform::{screen_to_canonical, ScreenRect};
use doc_model::{Selection, ViewState};

/// Native text selection as exposed by the page host.
///
/// Rectangles are in the host's client coordinates; capture makes them
/// relative to the page container itself.
pub trait SelectionSurface {
    fn is_collapsed(&self) -> bool;

    fn text(&self) -> String;

    /// Bounding rectangle of the selected range, if there is one.
    fn bounding_rect(&self) -> Option<ScreenRect>;

    /// Rectangle of the rendered page container, `None` when it cannot be
    /// located.
    fn page_container_rect(&self) -> Option<ScreenRect>;

    /// Drops the native selection highlight.
    fn clear(&mut self);
}

/// Handles a selection-end gesture.
///
/// Returns `None` and leaves the native selection alone for collapsed or blank
/// selections and while the page cannot be measured. On success the native
/// highlight is cleared so it does not compete with the note prompt.
pub fn capture_selection<S>(surface: &mut S, view: &ViewState) -> Option<Selection>
where
    S: SelectionSurface + ?Sized,
{
    if surface.is_collapsed() {
        return None;
    }

    let text = surface.text().trim().to_owned();
    if text.is_empty() {
        return None;
    }

    let bounds = surface.bounding_rect()?;
    let container = surface.page_container_rect()?;
    let relative = bounds.relative_to(&container);

    let Some(position) = screen_to_canonical(&relative, view) else {
        log::debug!("selection on page {} skipped: page not measured", view.current_page);
        return None;
    };

    surface.clear();

    Some(Selection { text, page_number: view.current_page, position })
}
