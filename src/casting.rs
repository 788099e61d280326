//! Numeric conversions between continuous image positions and pixel indices.
//!
//! # Design Decisions
//!
//! ## Image Dimensions (`u32` → `f64`)
//! Image widths and heights are `u32`, which `f64` represents exactly, so the
//! widening goes through `f64::from` with no checks.
//!
//! ## Pixel Coordinates (`f64` → `i64`)
//! Continuous positions are truncated toward zero to get a pixel index. A
//! geographic point outside an image footprint yields a negative or oversized
//! index; that is still a valid answer, so the only rejected inputs are NaN,
//! infinities and values beyond the `i64` range.

/// Largest magnitude that survives the `f64` → `i64` cast without saturating.
const MAX_PIXEL_COORD: f64 = 9.007_199_254_740_992e15; // 2^53

/// Truncate a continuous pixel position to an integer pixel index.
///
/// Returns `None` for NaN, infinities and magnitudes above 2^53.
#[inline]
#[must_use]
pub fn f64_to_pixel_coord(value: f64) -> Option<i64> {
    if !value.is_finite() || value.abs() > MAX_PIXEL_COORD {
        return None;
    }
    // Bounded above; the cast truncates toward zero
    #[allow(clippy::cast_possible_truncation)]
    Some(value.trunc() as i64)
}

/// Index of the central pixel along an axis of `len` pixels (integer halving).
#[inline]
#[must_use]
pub fn center_index(len: u32) -> i64 {
    i64::from(len / 2)
}
