//! Geometry core of the notes viewer: transform between screen and canonical
//! page space, capture text selections, and place note highlights.

pub mod overlay;
pub mod selection;
pub mod transform;

pub use overlay::{render_overlays, HighlightOverlay, HighlightStyle};
pub use selection::{capture_selection, SelectionSurface};
pub use transform::{
    canonical_to_screen, rendered_page_size, screen_to_canonical, OverlayPlacement,
    RenderedPageSize, ScreenRect, TransformOrigin,
};
