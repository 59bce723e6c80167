/// Engine v1 — Scalar Primitives
///
/// Toroidal index arithmetic and unit-interval clipping.
/// Every cell value is an f64; no fixed-point.

/// Wrap `index + offset` onto `0..len` (toroidal lookup).
///
/// `offset` may be negative or larger than `len`; the result is always the
/// Euclidean remainder, so `-1` maps to `len - 1`.
#[inline]
pub fn wrap_index(index: usize, offset: isize, len: usize) -> usize {
    (index as isize + offset).rem_euclid(len as isize) as usize
}

/// Clamp a value to `[0, 1]`.
///
/// NaN is passed through untouched: non-finite values are not sanitised.
#[inline]
pub fn clip_unit(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else if value > 1.0 {
        1.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_index_in_range() {
        assert_eq!(wrap_index(3, 1, 10), 4);
        assert_eq!(wrap_index(0, 0, 10), 0);
    }

    #[test]
    fn test_wrap_index_negative() {
        assert_eq!(wrap_index(0, -1, 10), 9);
        assert_eq!(wrap_index(2, -5, 4), 1);
    }

    #[test]
    fn test_wrap_index_past_end() {
        assert_eq!(wrap_index(9, 1, 10), 0);
        assert_eq!(wrap_index(1, 7, 3), 2);
    }

    #[test]
    fn test_clip_unit_bounds() {
        assert_eq!(clip_unit(-0.5), 0.0);
        assert_eq!(clip_unit(5.0), 1.0);
        assert_eq!(clip_unit(0.25), 0.25);
        assert_eq!(clip_unit(f64::INFINITY), 1.0);
        assert_eq!(clip_unit(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_clip_unit_nan_passes_through() {
        assert!(clip_unit(f64::NAN).is_nan());
    }
}
