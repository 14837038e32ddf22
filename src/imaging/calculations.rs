//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::TrimSides;

/// Axis-aligned region inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Calculate the largest size that fits inside a target box while keeping
/// the source aspect ratio.
///
/// One dimension matches the box exactly, the other is smaller or equal.
/// Small sources are scaled up to the box.
///
/// # Examples
/// ```text
/// fit_within((1000, 500), (250, 500)) == (250, 125)
/// fit_within((500, 1000), (250, 500)) == (250, 500)
/// ```
pub fn fit_within(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    if src_w == 0 || src_h == 0 {
        return (tgt_w, tgt_h);
    }

    let scale_w = tgt_w as f64 / src_w as f64;
    let scale_h = tgt_h as f64 / src_h as f64;

    if scale_w <= scale_h {
        let h = (src_h as f64 * scale_w).round().max(1.0) as u32;
        (tgt_w, h.min(tgt_h))
    } else {
        let w = (src_w as f64 * scale_h).round().max(1.0) as u32;
        (w.min(tgt_w), tgt_h)
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    if src_w == 0 || src_h == 0 {
        return (tgt_w, tgt_h);
    }

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Offset that centres `inner` inside `outer`.
///
/// Negative when `inner` is larger: the overflow is split evenly and clipped
/// on both sides.
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
    (
        (outer.0 as i64 - inner.0 as i64) / 2,
        (outer.1 as i64 - inner.1 as i64) / 2,
    )
}

/// Whether `pixel` is within `tolerance` percent of `base` on every channel.
pub fn matches_border(pixel: [u8; 4], base: [u8; 4], tolerance: u8) -> bool {
    let limit = (u32::from(tolerance.min(100)) * 255) / 100;
    pixel
        .iter()
        .zip(base.iter())
        .all(|(p, b)| u32::from(p.abs_diff(*b)) <= limit)
}

/// Whether a pixel counts as transparent border under `tolerance`.
pub fn is_transparent(pixel: [u8; 4], tolerance: u8) -> bool {
    let limit = (u32::from(tolerance.min(100)) * 255) / 100;
    u32::from(pixel[3]) <= limit
}

/// Calculate the region left after trimming border pixels.
///
/// `is_border(x, y)` classifies each pixel. Only sides listed in `away` are
/// cut; the others keep the original edge. `feather` grows the result back
/// out by that many pixels, clamped to the image.
///
/// Returns `None` when every pixel is border (nothing sensible to keep) or
/// the image is empty.
pub fn trim_region(
    width: u32,
    height: u32,
    is_border: impl Fn(u32, u32) -> bool,
    away: TrimSides,
    feather: u32,
) -> Option<Rect> {
    if width == 0 || height == 0 {
        return None;
    }

    let row_has_content = |y: u32| (0..width).any(|x| !is_border(x, y));
    let col_has_content = |x: u32| (0..height).any(|y| !is_border(x, y));

    let top = (0..height).find(|&y| row_has_content(y))?;
    let bottom = (0..height).rev().find(|&y| row_has_content(y))?;
    let left = (0..width).find(|&x| col_has_content(x))?;
    let right = (0..width).rev().find(|&x| col_has_content(x))?;

    let top = if away.top { top.saturating_sub(feather) } else { 0 };
    let left = if away.left { left.saturating_sub(feather) } else { 0 };
    let bottom = if away.bottom {
        bottom.saturating_add(feather).min(height - 1)
    } else {
        height - 1
    };
    let right = if away.right {
        right.saturating_add(feather).min(width - 1)
    } else {
        width - 1
    };

    Some(Rect {
        x: left,
        y: top,
        width: right - left + 1,
        height: bottom - top + 1,
    })
}
