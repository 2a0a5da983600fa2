//! Normalized `[0,1]` space to pixel space.

use crate::foundation::core::Canvas;
use crate::model::entities::{MosaicRegion, TextOverlay};

/// Rectangle in normalized frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Rectangle in absolute pixels. Signed so that rects lying outside the frame can be represented
/// before [`clamp`] pulls them in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) * self.height.max(0)
    }

    /// `true` when the rect lies fully inside `[0,W]×[0,H]` and has positive area.
    pub fn is_within(&self, canvas: Canvas) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && self.x + self.width <= i64::from(canvas.width)
            && self.y + self.height <= i64::from(canvas.height)
    }
}

impl From<&MosaicRegion> for NormRect {
    fn from(r: &MosaicRegion) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

fn round_px(v: f64) -> i64 {
    if v.is_finite() { v.round() as i64 } else { 0 }
}

/// Scale each dimension independently and round to the nearest integer.
pub fn to_pixels(rect: NormRect, canvas: Canvas) -> PixelRect {
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    PixelRect {
        x: round_px(rect.x * w),
        y: round_px(rect.y * h),
        width: round_px(rect.width * w),
        height: round_px(rect.height * h),
    }
}

/// Inverse of [`to_pixels`] (without rounding).
pub fn normalize(rect: PixelRect, canvas: Canvas) -> NormRect {
    let w = f64::from(canvas.width.max(1));
    let h = f64::from(canvas.height.max(1));
    NormRect {
        x: rect.x as f64 / w,
        y: rect.y as f64 / h,
        width: rect.width as f64 / w,
        height: rect.height as f64 / h,
    }
}

/// Pull `rect` inside the frame.
///
/// Guarantees `0 <= x'`, `0 <= y'`, `x' + width' <= W`, `y' + height' <= H` and
/// `width', height' >= 1`, even when `rect` lies completely outside the frame.
pub fn clamp(rect: PixelRect, canvas: Canvas) -> PixelRect {
    let fw = i64::from(canvas.width.max(1));
    let fh = i64::from(canvas.height.max(1));
    let x = rect.x.clamp(0, fw - 1);
    let y = rect.y.clamp(0, fh - 1);
    PixelRect {
        x,
        y,
        width: rect.width.min(fw - x).max(1),
        height: rect.height.min(fh - y).max(1),
    }
}

/// Map a normalized point to pixels (used for overlay anchors).
pub fn point_to_pixels(x: f64, y: f64, canvas: Canvas) -> (i64, i64) {
    (
        round_px(x * f64::from(canvas.width)),
        round_px(y * f64::from(canvas.height)),
    )
}

/// Pixel rect for a region, before clamping.
pub fn region_to_pixels(region: &MosaicRegion, canvas: Canvas) -> PixelRect {
    to_pixels(NormRect::from(region), canvas)
}

/// Pixel anchor for an overlay.
pub fn overlay_to_pixels(overlay: &TextOverlay, canvas: Canvas) -> (i64, i64) {
    point_to_pixels(overlay.x, overlay.y, canvas)
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/mapper.rs"]
mod tests;
