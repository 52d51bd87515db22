//! Filter kernels over a footprint parallelogram.

use crate::footprint::Parallelogram;
use crate::options::FilterType;

/// Weight function of one lookup, in raster coordinates.
///
/// Positions are first expressed in the parallelogram's own `(u, v)`
/// frame, where the footprint is the square `[-1, 1]^2`.
#[derive(Debug, Clone, Copy)]
pub struct FilterKernel {
    centre: [f32; 2],
    inv: [[f32; 2]; 2],
    filter: FilterType,
}

impl FilterKernel {
    /// Kernel for `pllgram`, which must have a non-zero area.
    pub fn new(pllgram: &Parallelogram, filter: FilterType) -> Self {
        let det = pllgram.det();
        let inv_det = if det.abs() > f32::MIN_POSITIVE { 1.0 / det } else { 0.0 };
        let [a, b] = [pllgram.a, pllgram.b];
        Self {
            centre: pllgram.centre,
            inv: [[b[1] * inv_det, -b[0] * inv_det], [-a[1] * inv_det, a[0] * inv_det]],
            filter,
        }
    }

    /// `(u, v)` of raster position `(x, y)`.
    #[inline]
    pub fn local(&self, x: f32, y: f32) -> (f32, f32) {
        let dx = x - self.centre[0];
        let dy = y - self.centre[1];
        (
            self.inv[0][0] * dx + self.inv[0][1] * dy,
            self.inv[1][0] * dx + self.inv[1][1] * dy,
        )
    }

    /// Weight at local position `(u, v)`.
    #[inline]
    pub fn weight_local(&self, u: f32, v: f32) -> f32 {
        match self.filter {
            FilterType::Box => {
                if u.abs() <= 1.0 && v.abs() <= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            FilterType::Gaussian => (-2.0 * (u * u + v * v)).exp(),
        }
    }

    /// Weight at raster position `(x, y)`.
    #[inline]
    pub fn weight(&self, x: f32, y: f32) -> f32 {
        let (u, v) = self.local(x, y);
        self.weight_local(u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn skewed() -> Parallelogram {
        Parallelogram {
            centre: [5.0, 5.0],
            a: [4.0, 1.0],
            b: [0.0, 2.0],
        }
    }

    #[test]
    fn test_local_frame() {
        let k = FilterKernel::new(&skewed(), FilterType::Box);
        let (u, v) = k.local(9.0, 6.0);
        assert_relative_eq!(u, 1.0, epsilon = 1e-6);
        assert_relative_eq!(v, 0.0, epsilon = 1e-6);
        let (u, v) = k.local(5.0, 7.0);
        assert_relative_eq!(u, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_box_and_gaussian() {
        let b = FilterKernel::new(&skewed(), FilterType::Box);
        assert_eq!(b.weight(5.0, 5.0), 1.0);
        assert_eq!(b.weight(12.0, 5.0), 0.0);

        let g = FilterKernel::new(&skewed(), FilterType::Gaussian);
        assert_eq!(g.weight(5.0, 5.0), 1.0);
        assert_relative_eq!(g.weight(9.0, 6.0), (-2.0f32).exp(), epsilon = 1e-6);
        assert!(g.weight(12.0, 5.0) > 0.0);
    }
}
