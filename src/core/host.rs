//! Host integration boundary.
//! The host owns video playback and the on-screen layout; the cropper only
//! reads from it through `MediaSurface` and draws into a `PreviewSurface`.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::coordinates::{Rect, Size};
use super::frame::FrameBuffer;

/// Playback state read from the host at sampling time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Seconds from the start of the media
    pub current_time: f64,
    /// 0.0-1.0
    pub volume: f64,
    pub playback_rate: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            volume: 1.0,
            playback_rate: 1.0,
        }
    }
}

impl PlaybackState {
    /// Replace values that cannot be exported as JSON numbers
    pub fn sanitized(&self) -> Self {
        let current_time = if self.current_time.is_finite() { self.current_time.max(0.0) } else { 0.0 };
        let volume = if self.volume.is_finite() { self.volume.clamp(0.0, 1.0) } else { 0.0 };
        let playback_rate = if self.playback_rate.is_finite() && self.playback_rate >= 0.0 {
            self.playback_rate
        } else {
            1.0
        };
        Self { current_time, volume, playback_rate }
    }
}

/// Video element exposed by the host.
pub trait MediaSurface {
    fn playback(&self) -> PlaybackState;
    /// Decoded video resolution in pixels
    fn intrinsic_size(&self) -> Size;
    /// Rendered video bounds in viewport coordinates. Zero-sized until laid out.
    fn display_box(&self) -> Rect;
    /// Most recently decoded frame, if any
    fn current_frame(&self) -> Option<Arc<FrameBuffer>>;

    fn display_size(&self) -> Size {
        self.display_box().size()
    }
}

/// 2D raster target for the live preview.
pub trait PreviewSurface {
    /// False when the drawing context cannot be used (e.g. detached canvas)
    fn is_available(&self) -> bool;
    fn size(&self) -> (u32, u32);
    fn set_size(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    /// Draw the `src` sub-rectangle of `frame` scaled into `dst`
    fn draw_sub_rect(&mut self, frame: &FrameBuffer, src: Rect, dst: Rect);
}

#[derive(Debug)]
struct StubMediaState {
    intrinsic: Size,
    display_box: Rect,
    playback: PlaybackState,
    frame: Option<Arc<FrameBuffer>>,
}

/// In-process media surface for tests and the replay tool.
///
/// Clones share state: the host side keeps one handle to drive playback and
/// layout while the crop session reads through another.
#[derive(Debug, Clone)]
pub struct StubMediaSurface {
    state: Arc<Mutex<StubMediaState>>,
}

impl StubMediaSurface {
    pub fn new(intrinsic: Size, display_box: Rect) -> Self {
        Self {
            state: Arc::new(Mutex::new(StubMediaState {
                intrinsic,
                display_box,
                playback: PlaybackState::default(),
                frame: None,
            })),
        }
    }

    /// Same as `new`, with a gradient frame at intrinsic resolution
    pub fn with_test_pattern(intrinsic: Size, display_box: Rect) -> Self {
        let surface = Self::new(intrinsic, display_box);
        surface.refresh_test_pattern();
        surface
    }

    fn lock(&self) -> MutexGuard<'_, StubMediaState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_playback(&self, playback: PlaybackState) {
        self.lock().playback = playback;
    }

    pub fn set_current_time(&self, seconds: f64) {
        self.lock().playback.current_time = seconds;
    }

    pub fn set_volume(&self, volume: f64) {
        self.lock().playback.volume = volume;
    }

    pub fn set_playback_rate(&self, rate: f64) {
        self.lock().playback.playback_rate = rate;
    }

    /// Advance playback by `wall_seconds` at the current rate.
    /// Returns the new current time.
    pub fn advance(&self, wall_seconds: f64) -> f64 {
        let time = {
            let mut state = self.lock();
            state.playback.current_time += wall_seconds * state.playback.playback_rate;
            state.playback.current_time
        };
        if self.lock().frame.is_some() {
            self.refresh_test_pattern();
        }
        time
    }

    pub fn set_display_box(&self, display_box: Rect) {
        self.lock().display_box = display_box;
    }

    pub fn set_frame(&self, frame: Option<FrameBuffer>) {
        self.lock().frame = frame.map(Arc::new);
    }

    fn refresh_test_pattern(&self) {
        let mut state = self.lock();
        let width = state.intrinsic.width.max(0.0) as u32;
        let height = state.intrinsic.height.max(0.0) as u32;
        let frame = FrameBuffer::test_pattern(width, height, state.playback.current_time);
        state.frame = Some(Arc::new(frame));
    }
}

impl MediaSurface for StubMediaSurface {
    fn playback(&self) -> PlaybackState {
        self.lock().playback
    }

    fn intrinsic_size(&self) -> Size {
        self.lock().intrinsic
    }

    fn display_box(&self) -> Rect {
        self.lock().display_box
    }

    fn current_frame(&self) -> Option<Arc<FrameBuffer>> {
        self.lock().frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_playback() {
        let p = PlaybackState {
            current_time: f64::NAN,
            volume: 1.5,
            playback_rate: f64::INFINITY,
        }
        .sanitized();
        assert_eq!(p.current_time, 0.0);
        assert_eq!(p.volume, 1.0);
        assert_eq!(p.playback_rate, 1.0);
    }

    #[test]
    fn test_stub_clones_share_state() {
        let host = StubMediaSurface::new(Size::new(1920.0, 1080.0), Rect::new(0.0, 0.0, 640.0, 360.0));
        let reader = host.clone();
        host.set_playback_rate(2.0);
        assert!((host.advance(1.5) - 3.0).abs() < 1e-10);
        assert!((reader.playback().current_time - 3.0).abs() < 1e-10);
        assert_eq!(reader.display_size(), Size::new(640.0, 360.0));
    }

    #[test]
    fn test_stub_test_pattern_matches_intrinsic_size() {
        let surface = StubMediaSurface::with_test_pattern(Size::new(64.0, 36.0), Rect::new(0.0, 0.0, 32.0, 18.0));
        let frame = surface.current_frame().unwrap();
        assert_eq!((frame.width, frame.height), (64, 36));

        let plain = StubMediaSurface::new(Size::new(64.0, 36.0), Rect::ZERO);
        assert!(plain.current_frame().is_none());
        plain.advance(1.0);
        assert!(plain.current_frame().is_none());
    }
}
