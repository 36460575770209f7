use serde::{Deserialize, Serialize};

/// Simple size struct (width/height in pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Self = Self { width: 0.0, height: 0.0 };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero, negative, or not finite
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Axis-aligned rectangle. Used for crop regions (display space),
/// mapped crop rectangles (source space) and the viewport bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        !(self.area() > 0.0)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Edge-inclusive containment test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    /// Clamp into `[0, bounds]` on both axes.
    ///
    /// Position is clipped into `[0, bounds - size]` per axis. A dimension
    /// larger than the bound is first cut down to the bound, so the result
    /// never inverts or goes negative.
    pub fn clamped_within(&self, bounds: Size) -> Self {
        let bw = finite_non_negative(bounds.width);
        let bh = finite_non_negative(bounds.height);

        let width = finite_non_negative(self.width).min(bw);
        let height = finite_non_negative(self.height).min(bh);

        Self {
            x: finite_or_zero(self.x).clamp(0.0, bw - width),
            y: finite_or_zero(self.y).clamp(0.0, bh - height),
            width,
            height,
        }
    }

    /// `[x, y, width, height]`, the layout used by the metadata export
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    pub fn from_array(a: [f64; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn finite_non_negative(v: f64) -> f64 {
    finite_or_zero(v).max(0.0)
}

/// Absolute pointer position in viewport coordinates, as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewportPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset from `origin` to `self`
    pub fn delta_from(&self, origin: &Self) -> (f64, f64) {
        (self.x - origin.x, self.y - origin.y)
    }
}

/// Coordinate conversion between display space and source space.
///
/// Display space: pixels of the video as rendered, origin at its top-left.
/// Source space: pixels of the decoded video at intrinsic resolution.
/// Scale factors are derived from the sizes passed on each call and never
/// stored, since the rendered size can change under a stationary region.
pub struct CoordinateMapper;

impl CoordinateMapper {
    /// Per-axis source/display scale, or `None` when either size is degenerate
    pub fn scale_factors(display: Size, source: Size) -> Option<(f64, f64)> {
        if display.is_degenerate() || !source.width.is_finite() || !source.height.is_finite() {
            return None;
        }
        Some((source.width / display.width, source.height / display.height))
    }

    /// Map a display-space rectangle into source pixels.
    /// A zero-sized display yields `Rect::ZERO`.
    pub fn display_to_source(rect: &Rect, display: Size, source: Size) -> Rect {
        match Self::scale_factors(display, source) {
            Some((sx, sy)) => Rect {
                x: rect.x * sx,
                y: rect.y * sy,
                width: rect.width * sx,
                height: rect.height * sy,
            },
            None => Rect::ZERO,
        }
    }

    /// Inverse of `display_to_source`. A zero-sized source yields `Rect::ZERO`.
    pub fn source_to_display(rect: &Rect, display: Size, source: Size) -> Rect {
        match Self::scale_factors(source, display) {
            Some((sx, sy)) => Rect {
                x: rect.x * sx,
                y: rect.y * sy,
                width: rect.width * sx,
                height: rect.height * sy,
            },
            None => Rect::ZERO,
        }
    }

    /// Convert a viewport pointer position into display space
    /// given the rendered video's viewport bounding box.
    pub fn viewport_to_display(point: &ViewportPoint, display_box: &Rect) -> ViewportPoint {
        ViewportPoint {
            x: point.x - display_box.x,
            y: point.y - display_box.y,
        }
    }
}
