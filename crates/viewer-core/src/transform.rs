//! Mapping between screen space and canonical page space.
//!
//! Screen space is the pixel frame of the rendered page container, which is
//! scaled by `view.scale` and rotated by `view.rotation`. Canonical space is the
//! same page at scale 1 and rotation 0. [`canonical_to_screen`] and
//! [`screen_to_canonical`] are exact inverses of each other for every view, so
//! a rectangle captured under one view renders correctly under any other.
//!
//! Both directions return `None` while the page geometry is unknown or the view
//! is degenerate; callers skip the rectangle for that frame.

use doc_model::{CanonicalPosition, Rotation, ViewState};
use serde::Serialize;

/// Axis-aligned rectangle in screen pixels, relative to the page container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Rectangle of `self` relative to `origin`'s top-left corner.
    pub fn relative_to(&self, origin: &ScreenRect) -> Self {
        Self { left: self.left - origin.left, top: self.top - origin.top, ..*self }
    }

    pub fn is_finite(&self) -> bool {
        [self.left, self.top, self.width, self.height].iter().all(|value| value.is_finite())
    }

    /// Same area with the origin at the top-left corner and a non-negative size.
    pub fn normalized(&self) -> Self {
        Self {
            left: self.left.min(self.left + self.width),
            top: self.top.min(self.top + self.height),
            width: self.width.abs(),
            height: self.height.abs(),
        }
    }

    #[cfg(test)]
    pub(crate) fn approx_eq(&self, other: &ScreenRect, tolerance: f64) -> bool {
        (self.left - other.left).abs() <= tolerance
            && (self.top - other.top).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// Point a CSS-style visual rotation pivots around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformOrigin {
    TopLeft,
    Center,
}

/// Forward-transform result: the box to lay out plus the visual rotation the
/// highlight receives at that box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayPlacement {
    pub rect: ScreenRect,
    pub rotation_degrees: u16,
    pub origin: TransformOrigin,
}

/// Page size in screen pixels at the current scale and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderedPageSize {
    pub width: f64,
    pub height: f64,
}

pub fn rendered_page_size(view: &ViewState) -> Option<RenderedPageSize> {
    let geometry = view.page_geometry.filter(|geometry| geometry.is_measured())?;
    if !view.scale.is_finite() || view.scale <= 0.0 {
        return None;
    }

    let (width, height) = if view.rotation.swaps_axes() {
        (geometry.height, geometry.width)
    } else {
        (geometry.width, geometry.height)
    };

    Some(RenderedPageSize { width: width * view.scale, height: height * view.scale })
}

/// Canonical → screen.
pub fn canonical_to_screen(
    position: &CanonicalPosition,
    view: &ViewState,
) -> Option<OverlayPlacement> {
    if !position.is_valid() {
        return None;
    }

    let page = rendered_page_size(view)?;
    let s = view.scale;
    let CanonicalPosition { x, y, width: w, height: h } = *position;

    let (rect, origin) = match view.rotation {
        Rotation::Deg0 => (ScreenRect::new(x * s, y * s, w * s, h * s), TransformOrigin::TopLeft),
        Rotation::Deg90 => (
            ScreenRect::new(y * s, page.width - (x + w) * s, h * s, w * s),
            TransformOrigin::TopLeft,
        ),
        Rotation::Deg180 => (
            ScreenRect::new(page.width - (x + w) * s, page.height - (y + h) * s, w * s, h * s),
            TransformOrigin::Center,
        ),
        Rotation::Deg270 => (
            ScreenRect::new(page.height - (y + h) * s, x * s, h * s, w * s),
            TransformOrigin::TopLeft,
        ),
    };

    Some(OverlayPlacement { rect, rotation_degrees: view.rotation.as_degrees(), origin })
}

/// Screen → canonical.
pub fn screen_to_canonical(rect: &ScreenRect, view: &ViewState) -> Option<CanonicalPosition> {
    if !rect.is_finite() {
        return None;
    }

    let page = rendered_page_size(view)?;
    let ScreenRect { left: rx, top: ry, width: rw, height: rh } = rect.normalized();

    let (x, y, w, h) = match view.rotation {
        Rotation::Deg0 => (rx, ry, rw, rh),
        Rotation::Deg90 => (page.width - ry - rh, rx, rh, rw),
        Rotation::Deg180 => (page.width - rx - rw, page.height - ry - rh, rw, rh),
        Rotation::Deg270 => (ry, page.height - rx - rw, rh, rw),
    };

    let s = view.scale;
    let position = CanonicalPosition::new(x / s, y / s, w / s, h / s);

    position.is_valid().then_some(position)
}
