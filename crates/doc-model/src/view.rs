//! View state of the page host: zoom, rotation and page navigation.
//!
//! Nothing here is persisted. The overlay renderer reads a [`ViewState`] on
//! every frame and the shell mutates it through [`apply_view_action`].

use crate::ModelError;

pub const DEFAULT_SCALE: f64 = 1.2;
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.2;

/// Page rotation in 90-degree clockwise steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Accepts any multiple of 90, normalised into `0..360`.
    pub fn from_degrees(degrees: i64) -> Result<Self, ModelError> {
        if degrees % 90 != 0 {
            return Err(ModelError::InvalidRotation(degrees));
        }

        Ok(match degrees.rem_euclid(360) {
            0 => Self::Deg0,
            90 => Self::Deg90,
            180 => Self::Deg180,
            _ => Self::Deg270,
        })
    }

    pub fn as_degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn clockwise(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    /// Whether the rendered page has width and height exchanged.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl TryFrom<i64> for Rotation {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_degrees(value)
    }
}

/// Size of a page at scale 1, before rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_measured(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Recovers unrotated scale-1 geometry from a measurement of the rendered
    /// page, which is scaled and has its axes swapped at 90/270.
    pub fn from_rendered(width: f64, height: f64, scale: f64, rotation: Rotation) -> Option<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }

        let (width, height) = if rotation.swaps_axes() { (height, width) } else { (width, height) };
        let geometry = Self { width: width / scale, height: height / scale };

        geometry.is_measured().then_some(geometry)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub scale: f64,
    pub rotation: Rotation,
    /// 1-based.
    pub current_page: u32,
    pub page_count: u32,
    /// `None` until the host has measured the current page.
    pub page_geometry: Option<PageGeometry>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            rotation: Rotation::Deg0,
            current_page: 1,
            page_count: 0,
            page_geometry: None,
        }
    }
}

impl ViewState {
    pub fn new(scale: f64, rotation: Rotation, current_page: u32, geometry: PageGeometry) -> Self {
        Self {
            scale,
            rotation,
            current_page,
            page_count: current_page,
            page_geometry: Some(geometry),
        }
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round().max(0.0) as u32
    }

    pub fn can_go_back(&self) -> bool {
        self.current_page > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.current_page < self.page_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewAction {
    ZoomIn,
    ZoomOut,
    RotateClockwise,
    NextPage,
    PreviousPage,
    GoToPage(u32),
    DocumentLoaded { page_count: u32 },
    SetPageGeometry(Option<PageGeometry>),
}

impl ViewAction {
    /// Keyboard shortcuts of the page area.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" => Some(Self::PreviousPage),
            "ArrowRight" => Some(Self::NextPage),
            "+" | "=" => Some(Self::ZoomIn),
            "-" => Some(Self::ZoomOut),
            _ => None,
        }
    }
}

pub fn apply_view_action(state: &mut ViewState, action: ViewAction) {
    match action {
        ViewAction::ZoomIn => {
            state.scale = round_scale((state.scale + ZOOM_STEP).min(MAX_SCALE));
        }
        ViewAction::ZoomOut => {
            state.scale = round_scale((state.scale - ZOOM_STEP).max(MIN_SCALE));
        }
        ViewAction::RotateClockwise => state.rotation = state.rotation.clockwise(),
        ViewAction::NextPage => {
            if state.can_go_forward() {
                set_page(state, state.current_page + 1);
            }
        }
        ViewAction::PreviousPage => {
            if state.can_go_back() {
                set_page(state, state.current_page - 1);
            }
        }
        ViewAction::GoToPage(page) => {
            let page = page.max(1).min(state.page_count.max(1));
            set_page(state, page);
        }
        ViewAction::DocumentLoaded { page_count } => {
            state.page_count = page_count;
            state.current_page = 1;
            state.page_geometry = None;
        }
        ViewAction::SetPageGeometry(geometry) => {
            state.page_geometry = geometry.filter(PageGeometry::is_measured);
        }
    }
}

fn set_page(state: &mut ViewState, page: u32) {
    if state.current_page != page {
        state.current_page = page;
        state.page_geometry = None;
    }
}

fn round_scale(scale: f64) -> f64 {
    (scale * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(page_count: u32) -> ViewState {
        let mut state = ViewState::default();
        apply_view_action(&mut state, ViewAction::DocumentLoaded { page_count });
        state
    }

    #[test]
    fn rotation_accepts_multiples_of_ninety_only() {
        assert_eq!(Rotation::from_degrees(0), Ok(Rotation::Deg0));
        assert_eq!(Rotation::from_degrees(450), Ok(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(-90), Ok(Rotation::Deg270));
        assert_eq!(Rotation::try_from(180), Ok(Rotation::Deg180));
        assert_eq!(Rotation::from_degrees(45), Err(ModelError::InvalidRotation(45)));
    }

    #[test]
    fn rotate_cycles_through_all_quarters() {
        let mut state = ViewState::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            apply_view_action(&mut state, ViewAction::RotateClockwise);
            seen.push(state.rotation.as_degrees());
        }

        assert_eq!(seen, vec![90, 180, 270, 0]);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut state = ViewState::default();
        assert_eq!(state.zoom_percent(), 120);

        for _ in 0..20 {
            apply_view_action(&mut state, ViewAction::ZoomIn);
        }
        assert_eq!(state.scale, MAX_SCALE);

        for _ in 0..20 {
            apply_view_action(&mut state, ViewAction::ZoomOut);
        }
        assert_eq!(state.scale, MIN_SCALE);
        assert_eq!(state.zoom_percent(), 50);
    }

    #[test]
    fn zoom_steps_do_not_drift() {
        let mut state = ViewState::default();
        apply_view_action(&mut state, ViewAction::ZoomIn);
        apply_view_action(&mut state, ViewAction::ZoomIn);
        apply_view_action(&mut state, ViewAction::ZoomOut);

        assert_eq!(state.scale, 1.4);
    }

    #[test]
    fn navigation_is_clamped_to_document_bounds() {
        let mut state = loaded(2);

        apply_view_action(&mut state, ViewAction::PreviousPage);
        assert_eq!(state.current_page, 1);

        apply_view_action(&mut state, ViewAction::NextPage);
        apply_view_action(&mut state, ViewAction::NextPage);
        assert_eq!(state.current_page, 2);

        apply_view_action(&mut state, ViewAction::GoToPage(100));
        assert_eq!(state.current_page, 2);

        apply_view_action(&mut state, ViewAction::GoToPage(0));
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn page_change_invalidates_measured_geometry() {
        let mut state = loaded(3);
        apply_view_action(
            &mut state,
            ViewAction::SetPageGeometry(Some(PageGeometry::new(600.0, 800.0))),
        );
        assert!(state.page_geometry.is_some());

        apply_view_action(&mut state, ViewAction::GoToPage(1));
        assert!(state.page_geometry.is_some());

        apply_view_action(&mut state, ViewAction::NextPage);
        assert_eq!(state.page_geometry, None);
    }

    #[test]
    fn unmeasured_geometry_is_dropped() {
        let mut state = loaded(1);
        apply_view_action(&mut state, ViewAction::SetPageGeometry(Some(PageGeometry::new(0.0, 10.0))));
        assert_eq!(state.page_geometry, None);
    }

    #[test]
    fn document_load_resets_to_first_page() {
        let mut state = loaded(5);
        apply_view_action(&mut state, ViewAction::GoToPage(4));
        apply_view_action(&mut state, ViewAction::DocumentLoaded { page_count: 2 });

        assert_eq!(state.current_page, 1);
        assert_eq!(state.page_count, 2);
    }

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(ViewAction::from_key("ArrowLeft"), Some(ViewAction::PreviousPage));
        assert_eq!(ViewAction::from_key("ArrowRight"), Some(ViewAction::NextPage));
        assert_eq!(ViewAction::from_key("+"), Some(ViewAction::ZoomIn));
        assert_eq!(ViewAction::from_key("="), Some(ViewAction::ZoomIn));
        assert_eq!(ViewAction::from_key("-"), Some(ViewAction::ZoomOut));
        assert_eq!(ViewAction::from_key("r"), None);
    }

    #[test]
    fn rendered_measurement_maps_back_to_unrotated_geometry() {
        let geometry = PageGeometry::from_rendered(1600.0, 1200.0, 2.0, Rotation::Deg90)
            .expect("geometry should be recovered");
        assert_eq!(geometry, PageGeometry::new(600.0, 800.0));

        assert_eq!(PageGeometry::from_rendered(0.0, 1200.0, 2.0, Rotation::Deg0), None);
        assert_eq!(PageGeometry::from_rendered(100.0, 100.0, 0.0, Rotation::Deg0), None);
    }
}
