//! Crop-region controller: the single writer of the crop region.
//! State machine: Hidden → VisibleIdle ↔ VisibleDragging → Hidden
//!
//! The preview timer belongs to the Visible state. It is created when the
//! region becomes visible and dropped (cancelled) when it is hidden again,
//! so no ticker can outlive the state that owns it.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use super::coordinates::{CoordinateMapper, Rect, Size, ViewportPoint};

/// Output aspect ratios offered by the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "9:16")]
    NineSixteen,
    #[serde(rename = "16:9")]
    SixteenNine,
    #[serde(rename = "4:3")]
    FourThree,
    #[serde(rename = "1:1")]
    OneOne,
    #[serde(rename = "4:5")]
    FourFive,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        Self::NineSixteen,
        Self::SixteenNine,
        Self::FourThree,
        Self::OneOne,
        Self::FourFive,
    ];

    /// (width, height) integer pair
    pub fn dims(self) -> (u32, u32) {
        match self {
            Self::NineSixteen => (9, 16),
            Self::SixteenNine => (16, 9),
            Self::FourThree => (4, 3),
            Self::OneOne => (1, 1),
            Self::FourFive => (4, 5),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NineSixteen => "9:16",
            Self::SixteenNine => "16:9",
            Self::FourThree => "4:3",
            Self::OneOne => "1:1",
            Self::FourFive => "4:5",
        }
    }

    /// Width-to-height ratio
    pub fn value(self) -> f64 {
        let (w, h) = self.dims();
        w as f64 / h as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown aspect ratio: {0}")]
pub struct UnknownAspectRatio(pub String);

impl FromStr for AspectRatio {
    type Err = UnknownAspectRatio;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.label() == s.trim())
            .ok_or_else(|| UnknownAspectRatio(s.to_string()))
    }
}

/// How pointer deltas are measured during a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DragAnchor {
    /// Anchor moves to the pointer after every move. Overshooting a bound and
    /// reversing makes the region follow immediately ("sticky edge").
    #[default]
    Rolling,
    /// Anchor stays at the pointer-down position for the whole gesture.
    Fixed,
}

/// Externally visible controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CropPhase {
    Hidden,
    VisibleIdle,
    VisibleDragging,
}

/// Pointer-down → pointer-up interaction state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub anchor_pointer: ViewportPoint,
    pub region_at_anchor: Rect,
    /// Most recent pointer position seen by the gesture
    pub last_pointer: ViewportPoint,
}

impl DragSession {
    /// Restart delta measurement from the latest pointer over `region`
    fn rebase(&mut self, region: Rect) {
        self.anchor_pointer = self.last_pointer;
        self.region_at_anchor = region;
    }
}

/// Repeating preview ticker. Dropping it cancels the schedule.
pub struct PreviewTimer {
    ticks: Receiver<Instant>,
    interval: Duration,
}

impl PreviewTimer {
    pub fn start(interval: Duration) -> Self {
        log::info!("Preview timer started ({}ms)", interval.as_millis());
        Self {
            ticks: crossbeam_channel::tick(interval),
            interval,
        }
    }

    pub fn ticks(&self) -> &Receiver<Instant> {
        &self.ticks
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for PreviewTimer {
    fn drop(&mut self) {
        log::info!("Preview timer cancelled");
    }
}

impl fmt::Debug for PreviewTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewTimer")
            .field("interval", &self.interval)
            .finish()
    }
}

#[derive(Debug)]
enum Visibility {
    Hidden,
    Visible {
        timer: PreviewTimer,
        drag: Option<DragSession>,
    },
}

/// Controller errors
#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Invalid state transition: cannot {action} while {state:?}")]
    InvalidState { state: CropPhase, action: String },
}

/// Crop-region state machine.
pub struct CropRegionController {
    visibility: Visibility,
    region: Rect,
    aspect_ratio: AspectRatio,
    drag_anchor: DragAnchor,
    preview_interval: Duration,
}

impl CropRegionController {
    pub fn new(aspect_ratio: AspectRatio, drag_anchor: DragAnchor, preview_interval: Duration) -> Self {
        Self {
            visibility: Visibility::Hidden,
            region: Rect::ZERO,
            aspect_ratio,
            drag_anchor,
            preview_interval,
        }
    }

    pub fn phase(&self) -> CropPhase {
        match &self.visibility {
            Visibility::Hidden => CropPhase::Hidden,
            Visibility::Visible { drag: None, .. } => CropPhase::VisibleIdle,
            Visibility::Visible { drag: Some(_), .. } => CropPhase::VisibleDragging,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.visibility, Visibility::Visible { .. })
    }

    /// Current region in display space. Retained (but not drawn) while hidden.
    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        match &self.visibility {
            Visibility::Visible { drag, .. } => drag.as_ref(),
            Visibility::Hidden => None,
        }
    }

    /// The active preview timer, present only while visible
    pub fn preview_timer(&self) -> Option<&PreviewTimer> {
        match &self.visibility {
            Visibility::Visible { timer, .. } => Some(timer),
            Visibility::Hidden => None,
        }
    }

    /// Hidden → VisibleIdle. Sizes the region for the current aspect ratio.
    pub fn start(&mut self, display: Size) -> Result<(), CropError> {
        if self.is_visible() {
            return Err(CropError::InvalidState {
                state: self.phase(),
                action: "start".into(),
            });
        }
        self.region = compute_initial_region(self.aspect_ratio, display);
        self.visibility = Visibility::Visible {
            timer: PreviewTimer::start(self.preview_interval),
            drag: None,
        };
        log::info!(
            "Cropper started ({}): {:.1}x{:.1}",
            self.aspect_ratio,
            self.region.width,
            self.region.height
        );
        Ok(())
    }

    /// Visible* → Hidden. Region is kept, any open drag is discarded.
    pub fn remove(&mut self) -> Result<(), CropError> {
        if !self.is_visible() {
            return Err(CropError::InvalidState {
                state: self.phase(),
                action: "remove".into(),
            });
        }
        // Drops the preview timer
        self.visibility = Visibility::Hidden;
        log::info!("Cropper removed");
        Ok(())
    }

    /// Store the ratio; while visible, re-derive the region from the origin.
    /// Returns true when the region changed.
    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio, display: Size) -> bool {
        self.aspect_ratio = ratio;
        let Visibility::Visible { drag, .. } = &mut self.visibility else {
            return false;
        };
        self.region = compute_initial_region(ratio, display);
        if let Some(session) = drag.as_mut() {
            session.rebase(self.region);
        }
        log::debug!("Aspect ratio {ratio}: region reset to {:?}", self.region);
        true
    }

    /// Re-clamp the visible region to a display that may have been resized.
    /// An open drag continues from the clamped region. Returns true when the
    /// region changed.
    pub fn fit_to(&mut self, display: Size) -> bool {
        let Visibility::Visible { drag, .. } = &mut self.visibility else {
            return false;
        };
        let fitted = self.region.clamped_within(display);
        if fitted == self.region {
            return false;
        }
        log::debug!("Display resized to {:.1}x{:.1}: region {:?} -> {:?}", display.width, display.height, self.region, fitted);
        self.region = fitted;
        if let Some(session) = drag.as_mut() {
            session.rebase(fitted);
        }
        true
    }

    /// Test seam: put the idle region at a known spot, clamped to the display.
    #[cfg(test)]
    pub(crate) fn place(&mut self, region: Rect, display: Size) -> bool {
        if self.phase() != CropPhase::VisibleIdle {
            return false;
        }
        self.region = region.clamped_within(display);
        true
    }

    /// Open a drag session if the pointer lands on the crop handle.
    /// `display_box` is the rendered video's viewport bounding box.
    pub fn pointer_down(&mut self, pointer: ViewportPoint, display_box: &Rect) -> bool {
        let region = self.region;
        let Visibility::Visible { drag, .. } = &mut self.visibility else {
            return false;
        };
        if drag.is_some() {
            return false;
        }
        let local = CoordinateMapper::viewport_to_display(&pointer, display_box);
        if !region.contains(local.x, local.y) {
            return false;
        }
        *drag = Some(DragSession {
            anchor_pointer: pointer,
            region_at_anchor: region,
            last_pointer: pointer,
        });
        true
    }

    /// Translate the region by the pointer delta and clamp it to the display.
    /// Returns true when a drag session consumed the move.
    pub fn pointer_move(&mut self, pointer: ViewportPoint, display: Size) -> bool {
        let Visibility::Visible { drag: Some(session), .. } = &mut self.visibility else {
            return false;
        };
        session.last_pointer = pointer;
        let (dx, dy) = pointer.delta_from(&session.anchor_pointer);
        let region = session.region_at_anchor.translated(dx, dy).clamped_within(display);

        if self.drag_anchor == DragAnchor::Rolling {
            session.anchor_pointer = pointer;
            session.region_at_anchor = region;
        }
        self.region = region;
        log::debug!("Drag move: region {:?}", region);
        true
    }

    /// Close the drag session. Returns the final region when a drag ended.
    pub fn pointer_up(&mut self) -> Option<Rect> {
        let Visibility::Visible { drag, .. } = &mut self.visibility else {
            return None;
        };
        drag.take().map(|_| self.region)
    }
}

/// Region for a fresh start or aspect change: full display height at the origin.
/// If that would overflow the display width, fit to the width instead.
pub fn compute_initial_region(ratio: AspectRatio, display: Size) -> Rect {
    if display.is_degenerate() {
        return Rect::ZERO;
    }
    let (rw, rh) = ratio.dims();
    let (rw, rh) = (rw as f64, rh as f64);

    let mut height = display.height;
    let mut width = height * rw / rh;
    if width > display.width {
        width = display.width;
        height = width * rh / rw;
    }
    Rect::new(0.0, 0.0, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAY: Size = Size { width: 1000.0, height: 300.0 };

    fn controller() -> CropRegionController {
        CropRegionController::new(AspectRatio::OneOne, DragAnchor::Rolling, Duration::from_millis(100))
    }

    fn origin_box(size: Size) -> Rect {
        Rect::new(0.0, 0.0, size.width, size.height)
    }

    #[test]
    fn test_initial_region_square() {
        let r = compute_initial_region(AspectRatio::OneOne, DISPLAY);
        assert_eq!(r, Rect::new(0.0, 0.0, 300.0, 300.0));
    }

    #[test]
    fn test_initial_region_widescreen() {
        let r = compute_initial_region(AspectRatio::SixteenNine, DISPLAY);
        assert!((r.width - 533.333).abs() < 1e-2);
        assert!((r.height - 300.0).abs() < 1e-9);
        assert_eq!((r.x, r.y), (0.0, 0.0));
    }

    #[test]
    fn test_initial_region_fits_narrow_display() {
        let r = compute_initial_region(AspectRatio::SixteenNine, Size::new(360.0, 640.0));
        assert!((r.width - 360.0).abs() < 1e-9);
        assert!((r.height - 202.5).abs() < 1e-9);
    }

    #[test]
    fn test_initial_region_zero_display() {
        assert_eq!(compute_initial_region(AspectRatio::OneOne, Size::ZERO), Rect::ZERO);
    }

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::SixteenNine);
        assert_eq!(" 4:5 ".parse::<AspectRatio>().unwrap(), AspectRatio::FourFive);
        assert!("3:2".parse::<AspectRatio>().is_err());
        for r in AspectRatio::ALL {
            assert_eq!(r.label().parse::<AspectRatio>().unwrap(), r);
        }
    }

    #[test]
    fn test_state_machine_happy_path() {
        let mut c = controller();
        assert_eq!(c.phase(), CropPhase::Hidden);
        assert!(c.preview_timer().is_none());

        c.start(DISPLAY).unwrap();
        assert_eq!(c.phase(), CropPhase::VisibleIdle);
        assert!(c.preview_timer().is_some());

        assert!(c.pointer_down(ViewportPoint::new(50.0, 50.0), &origin_box(DISPLAY)));
        assert_eq!(c.phase(), CropPhase::VisibleDragging);

        assert_eq!(c.pointer_up(), Some(c.region()));
        assert_eq!(c.phase(), CropPhase::VisibleIdle);

        c.remove().unwrap();
        assert_eq!(c.phase(), CropPhase::Hidden);
        assert!(c.preview_timer().is_none());
        // Region survives removal
        assert_eq!(c.region(), Rect::new(0.0, 0.0, 300.0, 300.0));
    }

    #[test]
    fn test_invalid_state_transitions() {
        let mut c = controller();
        assert!(c.remove().is_err());
        c.start(DISPLAY).unwrap();
        assert!(matches!(
            c.start(DISPLAY),
            Err(CropError::InvalidState { state: CropPhase::VisibleIdle, .. })
        ));
    }

    #[test]
    fn test_drag_translates_region() {
        let bounds = Size::new(1000.0, 1000.0);
        let mut c = controller();
        c.start(bounds).unwrap();
        assert!(c.place(Rect::new(10.0, 10.0, 100.0, 100.0), bounds));

        assert!(c.pointer_down(ViewportPoint::new(50.0, 50.0), &origin_box(bounds)));
        assert!(c.pointer_move(ViewportPoint::new(60.0, 70.0), bounds));
        assert_eq!(c.region(), Rect::new(20.0, 30.0, 100.0, 100.0));
        assert_eq!(c.pointer_up(), Some(Rect::new(20.0, 30.0, 100.0, 100.0)));
    }

    #[test]
    fn test_pointer_down_outside_region_is_ignored() {
        let mut c = controller();
        c.start(DISPLAY).unwrap();
        assert!(!c.pointer_down(ViewportPoint::new(500.0, 50.0), &origin_box(DISPLAY)));
        assert_eq!(c.phase(), CropPhase::VisibleIdle);
        assert!(!c.pointer_move(ViewportPoint::new(510.0, 50.0), DISPLAY));
        assert_eq!(c.pointer_up(), None);
    }

    #[test]
    fn test_pointer_down_uses_display_box_offset() {
        let mut c = controller();
        c.start(DISPLAY).unwrap();
        let display_box = Rect::new(400.0, 100.0, DISPLAY.width, DISPLAY.height);
        // (50, 50) in viewport space is left of the rendered video
        assert!(!c.pointer_down(ViewportPoint::new(50.0, 50.0), &display_box));
        assert!(c.pointer_down(ViewportPoint::new(450.0, 150.0), &display_box));
    }

    #[test]
    fn test_drag_clamps_and_rolling_anchor_sticks_to_edge() {
        let mut c = controller();
        c.start(DISPLAY).unwrap();
        assert!(c.pointer_down(ViewportPoint::new(100.0, 100.0), &origin_box(DISPLAY)));

        // Overshoot left by 80px past the edge
        c.pointer_move(ViewportPoint::new(20.0, 100.0), DISPLAY);
        assert_eq!(c.region().x, 0.0);

        // Reverse by 30px: rolling anchor moves immediately
        c.pointer_move(ViewportPoint::new(50.0, 100.0), DISPLAY);
        assert_eq!(c.region().x, 30.0);
    }

    #[test]
    fn test_fixed_anchor_absorbs_overshoot() {
        let mut c = CropRegionController::new(AspectRatio::OneOne, DragAnchor::Fixed, Duration::from_millis(100));
        c.start(DISPLAY).unwrap();
        assert!(c.pointer_down(ViewportPoint::new(100.0, 100.0), &origin_box(DISPLAY)));

        c.pointer_move(ViewportPoint::new(20.0, 100.0), DISPLAY);
        assert_eq!(c.region().x, 0.0);

        // Still left of the drag start: region stays at the edge
        c.pointer_move(ViewportPoint::new(50.0, 100.0), DISPLAY);
        assert_eq!(c.region().x, 0.0);

        c.pointer_move(ViewportPoint::new(150.0, 100.0), DISPLAY);
        assert_eq!(c.region().x, 50.0);
    }

    #[test]
    fn test_aspect_change_resets_region_while_visible() {
        let mut c = CropRegionController::new(AspectRatio::NineSixteen, DragAnchor::Rolling, Duration::from_millis(100));
        c.start(DISPLAY).unwrap();
        assert!(c.pointer_down(ViewportPoint::new(10.0, 10.0), &origin_box(DISPLAY)));
        c.pointer_move(ViewportPoint::new(400.0, 10.0), DISPLAY);
        c.pointer_up();
        assert!(c.region().x > 0.0);

        assert!(c.set_aspect_ratio(AspectRatio::OneOne, DISPLAY));
        assert_eq!(c.region(), Rect::new(0.0, 0.0, 300.0, 300.0));
    }

    #[test]
    fn test_aspect_change_while_hidden_applies_on_start() {
        let mut c = controller();
        assert!(!c.set_aspect_ratio(AspectRatio::FourThree, DISPLAY));
        assert_eq!(c.region(), Rect::ZERO);
        c.start(DISPLAY).unwrap();
        assert_eq!(c.region(), Rect::new(0.0, 0.0, 400.0, 300.0));
    }

    #[test]
    fn test_aspect_change_while_dragging_rebases_session() {
        let mut c = controller();
        c.start(DISPLAY).unwrap();
        assert!(c.pointer_down(ViewportPoint::new(10.0, 10.0), &origin_box(DISPLAY)));
        c.pointer_move(ViewportPoint::new(110.0, 10.0), DISPLAY);
        c.set_aspect_ratio(AspectRatio::FourThree, DISPLAY);
        assert_eq!(c.phase(), CropPhase::VisibleDragging);
        assert_eq!(c.drag_session().unwrap().region_at_anchor, c.region());

        c.pointer_move(ViewportPoint::new(120.0, 10.0), DISPLAY);
        assert_eq!(c.region(), Rect::new(10.0, 0.0, 400.0, 300.0));
    }

    #[test]
    fn test_fixed_anchor_aspect_change_mid_drag_continues_from_pointer() {
        let mut c = CropRegionController::new(AspectRatio::OneOne, DragAnchor::Fixed, Duration::from_millis(100));
        c.start(DISPLAY).unwrap();
        assert!(c.pointer_down(ViewportPoint::new(10.0, 10.0), &origin_box(DISPLAY)));
        c.pointer_move(ViewportPoint::new(210.0, 10.0), DISPLAY);
        assert_eq!(c.region().x, 200.0);

        c.set_aspect_ratio(AspectRatio::FourThree, DISPLAY);
        assert_eq!(c.drag_session().unwrap().anchor_pointer, ViewportPoint::new(210.0, 10.0));

        // Only the 10px moved after the reset applies to the new region
        c.pointer_move(ViewportPoint::new(220.0, 10.0), DISPLAY);
        assert_eq!(c.region(), Rect::new(10.0, 0.0, 400.0, 300.0));
    }

    #[test]
    fn test_fit_to_shrunk_display() {
        let mut c = controller();
        assert!(!c.fit_to(Size::new(100.0, 100.0)));

        c.start(DISPLAY).unwrap();
        assert!(c.place(Rect::new(600.0, 0.0, 300.0, 300.0), DISPLAY));
        assert!(!c.fit_to(DISPLAY));

        let small = Size::new(500.0, 200.0);
        assert!(c.fit_to(small));
        assert_eq!(c.region(), Rect::new(200.0, 0.0, 300.0, 200.0));
    }

    #[test]
    fn test_fit_to_rebases_open_drag() {
        let mut c = CropRegionController::new(AspectRatio::OneOne, DragAnchor::Fixed, Duration::from_millis(100));
        c.start(DISPLAY).unwrap();
        assert!(c.pointer_down(ViewportPoint::new(10.0, 10.0), &origin_box(DISPLAY)));
        c.pointer_move(ViewportPoint::new(610.0, 10.0), DISPLAY);
        assert_eq!(c.region().x, 600.0);

        let small = Size::new(700.0, 300.0);
        assert!(c.fit_to(small));
        assert_eq!(c.region(), Rect::new(400.0, 0.0, 300.0, 300.0));
        assert_eq!(c.drag_session().unwrap().region_at_anchor, c.region());

        c.pointer_move(ViewportPoint::new(560.0, 10.0), small);
        assert_eq!(c.region().x, 350.0);
    }

    #[test]
    fn test_place_clamps_and_requires_idle() {
        let mut c = controller();
        assert!(!c.place(Rect::new(10.0, 10.0, 50.0, 50.0), DISPLAY));
        c.start(DISPLAY).unwrap();
        assert!(c.place(Rect::new(990.0, -5.0, 50.0, 50.0), DISPLAY));
        assert_eq!(c.region(), Rect::new(950.0, 0.0, 50.0, 50.0));
        assert!(c.pointer_down(ViewportPoint::new(960.0, 10.0), &origin_box(DISPLAY)));
        assert!(!c.place(Rect::new(0.0, 0.0, 50.0, 50.0), DISPLAY));
    }

    #[test]
    fn test_remove_while_dragging_discards_session() {
        let mut c = controller();
        c.start(DISPLAY).unwrap();
        assert!(c.pointer_down(ViewportPoint::new(10.0, 10.0), &origin_box(DISPLAY)));
        c.remove().unwrap();
        assert_eq!(c.pointer_up(), None);
        assert!(c.drag_session().is_none());
    }

    #[test]
    fn test_timer_restarts_with_each_visibility() {
        let mut c = controller();
        c.start(DISPLAY).unwrap();
        assert_eq!(c.preview_timer().unwrap().interval(), Duration::from_millis(100));
        c.remove().unwrap();
        assert!(c.preview_timer().is_none());
        c.start(DISPLAY).unwrap();
        assert!(c.preview_timer().is_some());
    }
}
