//! BGRA frame buffer shared by the host media surface and the preview raster.

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::coordinates::Rect;

/// BGRA pixel buffer
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes per row (width * 4 for BGRA)
    pub stride: u32,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width * 4;
        Self {
            data: vec![0u8; (stride * height) as usize],
            width,
            height,
            stride,
        }
    }

    /// Create a frame filled with a solid BGRA color
    pub fn solid(width: u32, height: u32, b: u8, g: u8, r: u8, a: u8) -> Self {
        let mut frame = Self::new(width, height);
        frame.fill([b, g, r, a]);
        frame
    }

    /// Gradient test pattern that shifts with `time`, stands in for a decoded frame
    pub fn test_pattern(width: u32, height: u32, time: f64) -> Self {
        let phase = time.fract().abs();
        let mut frame = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let fx = x as f64 / width.max(1) as f64;
                let fy = y as f64 / height.max(1) as f64;
                let r = ((fx + phase) % 1.0 * 200.0 + 30.0) as u8;
                let g = (fy * 200.0 + 20.0) as u8;
                let b = (40.0 + phase * 60.0) as u8;
                frame.set_pixel(x, y, [b, g, r, 255]);
            }
        }
        frame
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn fill(&mut self, pixel: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&pixel);
        }
    }

    /// Get pixel at (x, y) as [B, G, R, A]
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y * self.stride + x * 4) as usize;
        if x < self.width && offset + 3 < self.data.len() {
            [self.data[offset], self.data[offset + 1], self.data[offset + 2], self.data[offset + 3]]
        } else {
            [0, 0, 0, 0]
        }
    }

    /// Set pixel at (x, y) from [B, G, R, A]
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        let offset = (y * self.stride + x * 4) as usize;
        if x < self.width && offset + 3 < self.data.len() {
            self.data[offset..offset + 4].copy_from_slice(&pixel);
        }
    }

    /// Bilinear sample at fractional (fx, fy) coordinates in pixel space
    pub fn sample_bilinear(&self, fx: f64, fy: f64) -> [u8; 4] {
        if self.is_empty() {
            return [0, 0, 0, 0];
        }
        let x0 = fx.floor() as i64;
        let y0 = fy.floor() as i64;
        let tx = (fx - x0 as f64) as f32;
        let ty = (fy - y0 as f64) as f32;

        let clamp_x = |x: i64| x.clamp(0, self.width as i64 - 1) as u32;
        let clamp_y = |y: i64| y.clamp(0, self.height as i64 - 1) as u32;

        let p00 = self.get_pixel(clamp_x(x0), clamp_y(y0));
        let p10 = self.get_pixel(clamp_x(x0 + 1), clamp_y(y0));
        let p01 = self.get_pixel(clamp_x(x0), clamp_y(y0 + 1));
        let p11 = self.get_pixel(clamp_x(x0 + 1), clamp_y(y0 + 1));

        let lerp = |a: u8, b: u8, t: f32| -> u8 {
            (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
        };

        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = lerp(p00[c], p10[c], tx);
            let bot = lerp(p01[c], p11[c], tx);
            out[c] = lerp(top, bot, ty);
        }
        out
    }

    /// Resample the `src` sub-rectangle of `source` into the `dst` rectangle of `self`.
    /// Destination pixels outside `self` are skipped.
    pub fn blit_scaled(&mut self, source: &FrameBuffer, src: Rect, dst: Rect) {
        if dst.is_empty() || src.is_empty() || source.is_empty() {
            return;
        }
        let x_start = dst.x.max(0.0).floor() as u32;
        let y_start = dst.y.max(0.0).floor() as u32;
        let x_end = ((dst.x + dst.width).ceil().max(0.0) as u32).min(self.width);
        let y_end = ((dst.y + dst.height).ceil().max(0.0) as u32).min(self.height);

        let step_x = src.width / dst.width;
        let step_y = src.height / dst.height;

        for oy in y_start..y_end {
            // Sample at pixel centers
            let sy = src.y + (oy as f64 + 0.5 - dst.y) * step_y - 0.5;
            for ox in x_start..x_end {
                let sx = src.x + (ox as f64 + 0.5 - dst.x) * step_x - 0.5;
                let pixel = source.sample_bilinear(sx, sy);
                self.set_pixel(ox, oy, pixel);
            }
        }
    }

    /// Convert BGRA pixel data to RGBA (HTML Canvas ImageData layout)
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = vec![0u8; self.data.len()];
        for (src, dst) in self.data.chunks_exact(4).zip(rgba.chunks_exact_mut(4)) {
            dst[0] = src[2]; // R
            dst[1] = src[1]; // G
            dst[2] = src[0]; // B
            dst[3] = src[3]; // A
        }
        rgba
    }
}

/// Preview pixels handed to a host UI.
/// Contains base64-encoded RGBA pixel data and dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFrameData {
    pub width: u32,
    pub height: u32,
    /// Base64-encoded RGBA pixel data (width * height * 4 bytes)
    pub rgba_base64: String,
}

impl From<&FrameBuffer> for PreviewFrameData {
    fn from(frame: &FrameBuffer) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            rgba_base64: base64::engine::general_purpose::STANDARD.encode(frame.to_rgba()),
        }
    }
}
