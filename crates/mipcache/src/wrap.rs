//! Wrap-mode resolution of filter supports.
//!
//! A footprint near the edge of a texture produces a support that hangs off
//! the raster. Rather than wrapping every pixel coordinate, the support is
//! split into pieces that lie inside the image, each paired with the shift
//! that maps its pixels back to the unwrapped position where the filter
//! weight is evaluated:
//!
//! ```text
//!        -2 -1 | 0  1  2 ...  61 62 63 | 64
//! support  [x  x| x  x]                |          periodic, width 64
//! pieces   [62, 64) shift -64  +  [0, 2) shift 0
//! ```

use mipcache_core::Support;
use smallvec::SmallVec;

use crate::options::WrapMode;

/// One in-image piece of a wrapped support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapPiece {
    /// Pixels to read, inside the wrap region.
    pub support: Support,
    /// Added to a read column to get the unwrapped column.
    pub shift_x: i32,
    /// Added to a read row to get the unwrapped row.
    pub shift_y: i32,
}

/// Result of [`split_support`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrapSplit {
    /// Pieces to read, at most four.
    pub pieces: SmallVec<[WrapPiece; 4]>,
    /// Fraction of the support that maps onto the image. Below one only
    /// for black wrap.
    pub coverage: f32,
}

impl WrapSplit {
    /// Total pixels over all pieces.
    pub fn area(&self) -> u64 {
        self.pieces.iter().map(|p| p.support.area()).sum()
    }
}

type AxisPieces = SmallVec<[(i32, i32, i32); 2]>;

/// Splits one axis `[lo, hi)` against the region `[start, end)`.
///
/// Returns `(lo, hi, shift)` triples and the covered fraction. Spans are
/// measured in `i64` so supports reaching the `i32` limits do not overflow.
fn split_axis(lo: i32, hi: i32, start: i32, end: i32, mode: WrapMode) -> (AxisPieces, f32) {
    let mut pieces = AxisPieces::new();
    let (lo, hi, start, end) = (i64::from(lo), i64::from(hi), i64::from(start), i64::from(end));
    let size = end - start;
    if size <= 0 || hi <= lo {
        return (pieces, 0.0);
    }
    // Every bound and shift pushed below stays within i32 range.
    let mut push = |a: i64, b: i64, shift: i64| {
        pieces.push((a as i32, b as i32, shift.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32));
    };

    let covered = match mode {
        WrapMode::Periodic => {
            // A support wider than one period reads each pixel once,
            // centred on the original support.
            let (lo, hi) = if hi - lo > size {
                let centre = lo + (hi - lo) / 2;
                (centre - size / 2, centre - size / 2 + size)
            } else {
                (lo, hi)
            };
            let first = (lo - start).div_euclid(size);
            let last = (hi - 1 - start).div_euclid(size);
            for k in first..=last {
                let shift = k * size;
                let a = lo.max(start + shift) - shift;
                let b = hi.min(end + shift) - shift;
                if b > a {
                    push(a, b, shift);
                }
            }
            1.0
        }
        WrapMode::Clamp => {
            let a = lo.max(start);
            let b = hi.min(end);
            if b > a {
                push(a, b, 0);
            } else if hi <= start {
                push(start, start + 1, hi - 1 - start);
            } else {
                push(end - 1, end, lo - (end - 1));
            }
            1.0
        }
        WrapMode::Black => {
            let a = lo.max(start);
            let b = hi.min(end);
            if b > a {
                push(a, b, 0);
                (b - a) as f32 / (hi - lo) as f32
            } else {
                0.0
            }
        }
    };
    (pieces, covered)
}

/// Splits `support` into pieces inside `region` according to the wrap modes.
///
/// Periodic axes repeat with the region's period. Clamp axes clip, and a
/// support entirely outside the region collapses onto the nearest edge
/// pixel. Black axes clip and report the uncovered share through
/// [`WrapSplit::coverage`].
pub fn split_support(support: Support, region: Support, s_wrap: WrapMode, t_wrap: WrapMode) -> WrapSplit {
    let (xs, cover_x) = split_axis(support.x0, support.x1, region.x0, region.x1, s_wrap);
    let (ys, cover_y) = split_axis(support.y0, support.y1, region.y0, region.y1, t_wrap);

    let mut pieces = SmallVec::new();
    for &(y0, y1, shift_y) in &ys {
        for &(x0, x1, shift_x) in &xs {
            pieces.push(WrapPiece {
                support: Support::new(x0, x1, y0, y1),
                shift_x,
                shift_y,
            });
        }
    }
    WrapSplit {
        pieces,
        coverage: cover_x * cover_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: Support = Support::from_size(64, 32);

    #[test]
    fn test_inside_is_untouched() {
        let s = Support::new(3, 9, 4, 8);
        for mode in [WrapMode::Periodic, WrapMode::Clamp, WrapMode::Black] {
            let split = split_support(s, IMAGE, mode, mode);
            assert_eq!(split.pieces.len(), 1);
            assert_eq!(split.pieces[0], WrapPiece { support: s, shift_x: 0, shift_y: 0 });
            assert_eq!(split.coverage, 1.0);
        }
    }

    #[test]
    fn test_periodic_corner() {
        let split = split_support(Support::new(-2, 2, 30, 34), IMAGE, WrapMode::Periodic, WrapMode::Periodic);
        assert_eq!(split.pieces.len(), 4);
        assert_eq!(split.area(), 16);
        assert!(split.pieces.contains(&WrapPiece {
            support: Support::new(62, 64, 30, 32),
            shift_x: -64,
            shift_y: 0,
        }));
        assert!(split.pieces.contains(&WrapPiece {
            support: Support::new(0, 2, 0, 2),
            shift_x: 0,
            shift_y: 32,
        }));
    }

    #[test]
    fn test_periodic_wider_than_image() {
        let split = split_support(Support::new(-100, 100, 0, 1), IMAGE, WrapMode::Periodic, WrapMode::Clamp);
        assert_eq!(split.area(), 64);
        assert_eq!(split.coverage, 1.0);
    }

    #[test]
    fn test_black_coverage() {
        let split = split_support(Support::new(-4, 4, 0, 4), IMAGE, WrapMode::Black, WrapMode::Black);
        assert_eq!(split.pieces[0].support, Support::new(0, 4, 0, 4));
        assert!((split.coverage - 0.5).abs() < 1e-6);

        let outside = split_support(Support::new(70, 80, 0, 4), IMAGE, WrapMode::Black, WrapMode::Black);
        assert!(outside.pieces.is_empty());
        assert_eq!(outside.coverage, 0.0);
    }

    #[test]
    fn test_clamp_snaps_to_edge() {
        let split = split_support(Support::new(70, 80, -9, -5), IMAGE, WrapMode::Clamp, WrapMode::Clamp);
        let piece = split.pieces[0];
        assert_eq!(piece.support, Support::new(63, 64, 0, 1));
        assert!((70..80).contains(&(63 + piece.shift_x)));
        assert!((-9..-5).contains(&(piece.shift_y)));
    }

    #[test]
    fn test_extreme_supports() {
        let full = Support::new(i32::MIN, i32::MAX, i32::MAX - 1, i32::MAX);
        let split = split_support(full, IMAGE, WrapMode::Periodic, WrapMode::Periodic);
        assert_eq!(split.area(), 64);
        assert_eq!(split.coverage, 1.0);

        let split = split_support(full, IMAGE, WrapMode::Clamp, WrapMode::Clamp);
        assert_eq!(split.pieces[0].support, Support::new(0, 64, 31, 32));

        let split = split_support(full, IMAGE, WrapMode::Black, WrapMode::Black);
        assert!(split.pieces.is_empty());
        assert_eq!(split.coverage, 0.0);
    }

    #[test]
    fn test_offset_region() {
        let face = Support::new(32, 64, 0, 32);
        let split = split_support(Support::new(60, 70, 2, 4), face, WrapMode::Clamp, WrapMode::Clamp);
        assert_eq!(split.pieces[0].support, Support::new(60, 64, 2, 4));
    }
}
