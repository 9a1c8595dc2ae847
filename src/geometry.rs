//! Page-space geometry shared by every pipeline stage.
//!
//! All rectangles live in **top-down page space**: the origin is the
//! top-left corner of the page, `y` grows downwards, and units are PDF
//! points. `top ≤ bottom` and `left ≤ right` hold for every value built
//! through the constructors here. Backends that report native PDF
//! coordinates (origin bottom-left) convert at the boundary; see
//! [`crate::pipeline::pdfium`].

use serde::Serialize;

/// Rectangle of one embedded image placement on a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl BoundingBox {
    /// Build a box from its four edges, swapping inverted edge pairs so that
    /// `left ≤ right` and `top ≤ bottom`.
    ///
    /// NaN edges are kept (not absorbed by `min`/`max`) so that
    /// [`Self::is_finite`] still reports them.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        let (left, right) = ordered(left, right);
        let (top, bottom) = ordered(top, bottom);
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// `true` when every edge is a finite number.
    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
    }

    /// Reading-order key: top edge rounded half-to-even, then left edge.
    ///
    /// Half-to-even keeps `round(2.5) == 2`, matching the layouts produced by
    /// earlier extraction runs.
    pub(crate) fn reading_order_key(&self) -> (f64, f64) {
        (self.top.round_ties_even(), self.left)
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Bounding rectangle enclosing every box of one figure group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MergedRegion {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl MergedRegion {
    /// Smallest rectangle covering all `boxes`; `None` for an empty slice.
    pub fn enclosing(boxes: &[BoundingBox]) -> Option<Self> {
        let (first, rest) = boxes.split_first()?;
        Some(rest.iter().fold(Self::of(first), |acc, b| acc.expanded_to(b)))
    }

    /// Region covering exactly one box.
    pub fn of(b: &BoundingBox) -> Self {
        Self {
            left: b.left,
            top: b.top,
            right: b.right,
            bottom: b.bottom,
        }
    }

    /// Smallest region covering both `self` and `b`.
    pub fn expanded_to(self, b: &BoundingBox) -> Self {
        Self {
            left: self.left.min(b.left),
            top: self.top.min(b.top),
            right: self.right.max(b.right),
            bottom: self.bottom.max(b.bottom),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Pixel rectangle covered by this region on a page bitmap rendered at
    /// `zoom`, clamped to a `image_width × image_height` bitmap.
    ///
    /// The result is never empty: degenerate or off-page regions still map
    /// to at least one pixel so the written PNG is valid.
    pub fn pixel_rect(&self, zoom: f64, image_width: u32, image_height: u32) -> PixelRect {
        let (x, width) = pixel_span(self.left, self.right, zoom, image_width);
        let (y, height) = pixel_span(self.top, self.bottom, zoom, image_height);
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }
}

fn pixel_span(start: f64, end: f64, zoom: f64, limit: u32) -> (u32, u32) {
    let max = f64::from(limit);
    let first = (start * zoom).floor().clamp(0.0, max) as u32;
    let last = (end * zoom).ceil().clamp(0.0, max) as u32;
    let first = first.min(limit.saturating_sub(1));
    (first, last.saturating_sub(first).max(1))
}

/// Crop rectangle in bitmap pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Text-layer query rectangle searched for a figure's caption.
///
/// Extends `margin` points left and right of the merged region and `depth`
/// points downwards from its bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaptionSearchWindow {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CaptionSearchWindow {
    pub fn below(region: &MergedRegion, margin: f64, depth: f64) -> Self {
        Self {
            left: region.left - margin,
            top: region.bottom,
            right: region.right + margin,
            bottom: region.bottom + depth,
        }
    }

    /// `true` when the point lies inside the window (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}
