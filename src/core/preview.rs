//! Live crop preview.
//!
//! On every timer tick the crop region is mapped into source pixels and that
//! sub-rectangle of the current frame is drawn into the preview surface. The
//! surface is kept the same pixel size as the region's display size.
//! Ticks are wall-clock driven, not frame-locked, and continue while paused.

use serde::{Deserialize, Serialize};

use super::coordinates::{CoordinateMapper, Rect};
use super::frame::{FrameBuffer, PreviewFrameData};
use super::host::{MediaSurface, PreviewSurface};

/// Why a preview tick drew nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    Hidden,
    EmptyRegion,
    SurfaceUnavailable,
    NoFrame,
    ZeroDisplay,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Source rectangle that was drawn
    Drawn(Rect),
    Skipped(SkipReason),
}

/// Draws the cropped area of the current video frame into a preview surface.
pub struct PreviewRenderer<P: PreviewSurface> {
    surface: P,
    frames_drawn: u64,
    ticks_skipped: u64,
}

impl<P: PreviewSurface> PreviewRenderer<P> {
    pub fn new(surface: P) -> Self {
        Self {
            surface,
            frames_drawn: 0,
            ticks_skipped: 0,
        }
    }

    pub fn surface(&self) -> &P {
        &self.surface
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped
    }

    /// Match the surface's pixel size to the region's display size.
    /// Returns true when the surface was resized.
    pub fn sync_size(&mut self, region: &Rect) -> bool {
        let target = pixel_size(region);
        if self.surface.size() == target {
            return false;
        }
        self.surface.set_size(target.0, target.1);
        log::debug!("Preview surface resized to {}x{}", target.0, target.1);
        true
    }

    /// One refresh. `region` is in display space; `None` while hidden.
    pub fn render_tick(&mut self, region: Option<Rect>, media: &dyn MediaSurface) -> TickOutcome {
        let outcome = self.draw(region, media);
        match outcome {
            TickOutcome::Drawn(_) => self.frames_drawn += 1,
            TickOutcome::Skipped(reason) => {
                self.ticks_skipped += 1;
                log::trace!("Preview tick skipped: {reason:?}");
            }
        }
        outcome
    }

    fn draw(&mut self, region: Option<Rect>, media: &dyn MediaSurface) -> TickOutcome {
        let Some(region) = region else {
            return TickOutcome::Skipped(SkipReason::Hidden);
        };
        if region.is_empty() {
            return TickOutcome::Skipped(SkipReason::EmptyRegion);
        }
        if !self.surface.is_available() {
            return TickOutcome::Skipped(SkipReason::SurfaceUnavailable);
        }

        let source_rect =
            CoordinateMapper::display_to_source(&region, media.display_size(), media.intrinsic_size());
        if source_rect.is_empty() {
            return TickOutcome::Skipped(SkipReason::ZeroDisplay);
        }
        let Some(frame) = media.current_frame() else {
            return TickOutcome::Skipped(SkipReason::NoFrame);
        };

        self.sync_size(&region);
        let (w, h) = self.surface.size();
        self.surface.clear();
        self.surface
            .draw_sub_rect(&frame, source_rect, Rect::new(0.0, 0.0, w as f64, h as f64));
        TickOutcome::Drawn(source_rect)
    }
}

fn pixel_size(region: &Rect) -> (u32, u32) {
    let px = |v: f64| if v.is_finite() && v > 0.0 { v.round() as u32 } else { 0 };
    (px(region.width), px(region.height))
}

/// Software preview surface backed by a BGRA frame buffer.
#[derive(Debug, Clone)]
pub struct RasterPreview {
    buffer: FrameBuffer,
    available: bool,
}

impl RasterPreview {
    pub fn new() -> Self {
        Self {
            buffer: FrameBuffer::new(0, 0),
            available: true,
        }
    }

    /// Simulate losing (or regaining) the drawing context
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// RGBA payload for a host UI
    pub fn frame_data(&self) -> PreviewFrameData {
        PreviewFrameData::from(&self.buffer)
    }
}

impl Default for RasterPreview {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewSurface for RasterPreview {
    fn is_available(&self) -> bool {
        self.available
    }

    fn size(&self) -> (u32, u32) {
        (self.buffer.width, self.buffer.height)
    }

    fn set_size(&mut self, width: u32, height: u32) {
        // Resizing a canvas also clears it
        self.buffer = FrameBuffer::new(width, height);
    }

    fn clear(&mut self) {
        self.buffer.fill([0, 0, 0, 0]);
    }

    fn draw_sub_rect(&mut self, frame: &FrameBuffer, src: Rect, dst: Rect) {
        self.buffer.blit_scaled(frame, src, dst);
    }
}
