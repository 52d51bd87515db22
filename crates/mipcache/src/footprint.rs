//! Lookup footprints and their raster-space parallelogram.
//!
//! Callers describe a lookup by the four corners of the area being shaded,
//! mapped into texture space: a [`SampleQuad`] of `(s, t)` coordinates for
//! plain and shadow lookups, a [`DirectionQuad`] for environment lookups.
//! The samplers reduce a quad to a [`Parallelogram`]
//!
//! ```text
//!   v1 ────────── v2          centre c, half-axes a and b:
//!    │            │             p(u, v) = c + u a + v b,  u, v in [-1, 1]
//!    │     c ──a─►│
//!    │     │      │
//!    │     b      │
//!   v3 ────▼───── v4
//! ```
//!
//! and filter over its bounding support in raster space.

use mipcache_core::Support;

/// Quad in texture coordinates.
///
/// Corners are ordered top-left, top-right, bottom-left, bottom-right in
/// the surface parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleQuad {
    /// Top-left corner.
    pub v1: [f32; 2],
    /// Top-right corner.
    pub v2: [f32; 2],
    /// Bottom-left corner.
    pub v3: [f32; 2],
    /// Bottom-right corner.
    pub v4: [f32; 2],
}

impl SampleQuad {
    /// Creates a quad from its corners.
    pub const fn new(v1: [f32; 2], v2: [f32; 2], v3: [f32; 2], v4: [f32; 2]) -> Self {
        Self { v1, v2, v3, v4 }
    }

    /// Axis-aligned quad `[s0, s1] x [t0, t1]`.
    pub const fn rect(s0: f32, t0: f32, s1: f32, t1: f32) -> Self {
        Self::new([s0, t0], [s1, t0], [s0, t1], [s1, t1])
    }

    /// Square of side `width` centred on `(s, t)`.
    pub fn point(s: f32, t: f32, width: f32) -> Self {
        let h = 0.5 * width;
        Self::rect(s - h, t - h, s + h, t + h)
    }

    /// Corners in declaration order.
    pub fn corners(&self) -> [[f32; 2]; 4] {
        [self.v1, self.v2, self.v3, self.v4]
    }
}

/// Shadow lookup: a quad in shadow-map texture coordinates plus the
/// receiver's depth at each corner, in the units stored by the map.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadowQuad {
    /// Footprint in shadow-map texture coordinates.
    pub quad: SampleQuad,
    /// Receiver depth at `v1..v4`.
    pub depths: [f32; 4],
}

impl ShadowQuad {
    /// Quad with one receiver depth everywhere.
    pub fn flat(quad: SampleQuad, depth: f32) -> Self {
        Self {
            quad,
            depths: [depth; 4],
        }
    }

    /// Receiver depth as `(centre, along a, along b)`, matching the
    /// parameterization of [`Parallelogram::from_quad`].
    pub fn depth_gradient(&self) -> (f32, f32, f32) {
        let [d1, d2, d3, d4] = self.depths;
        (
            0.25 * (d1 + d2 + d3 + d4),
            0.25 * ((d2 - d1) + (d4 - d3)),
            0.25 * ((d3 - d1) + (d4 - d2)),
        )
    }
}

/// Environment lookup: four directions bounding the cone being filtered.
/// Directions need not be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectionQuad {
    /// Top-left direction.
    pub v1: [f32; 3],
    /// Top-right direction.
    pub v2: [f32; 3],
    /// Bottom-left direction.
    pub v3: [f32; 3],
    /// Bottom-right direction.
    pub v4: [f32; 3],
}

impl DirectionQuad {
    /// Creates a quad from its corner directions.
    pub const fn new(v1: [f32; 3], v2: [f32; 3], v3: [f32; 3], v4: [f32; 3]) -> Self {
        Self { v1, v2, v3, v4 }
    }

    /// Cone of half-angle roughly `spread` radians around `dir`.
    pub fn around(dir: [f32; 3], spread: f32) -> Self {
        let d = normalize(dir);
        let helper = if d[1].abs() < 0.9 { [0.0, 1.0, 0.0] } else { [1.0, 0.0, 0.0] };
        let right = normalize(cross(helper, d));
        let up = cross(d, right);
        let k = spread.tan();
        let corner = |su: f32, sv: f32| {
            [
                d[0] + k * (su * right[0] + sv * up[0]),
                d[1] + k * (su * right[1] + sv * up[1]),
                d[2] + k * (su * right[2] + sv * up[2]),
            ]
        };
        Self::new(corner(-1.0, 1.0), corner(1.0, 1.0), corner(-1.0, -1.0), corner(1.0, -1.0))
    }

    /// Corners in declaration order.
    pub fn corners(&self) -> [[f32; 3]; 4] {
        [self.v1, self.v2, self.v3, self.v4]
    }

    /// Normalized mean of the normalized corner directions.
    pub fn centre(&self) -> [f32; 3] {
        let mut sum = [0.0f32; 3];
        for c in self.corners() {
            let n = normalize(c);
            for i in 0..3 {
                sum[i] += n[i];
            }
        }
        normalize(sum)
    }
}

pub(crate) fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len < 1e-20 {
        [0.0, 0.0, 1.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

#[inline]
fn len2(v: [f32; 2]) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

/// Parallelogram `c + u a + v b`, `u, v in [-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parallelogram {
    /// Centre.
    pub centre: [f32; 2],
    /// First half-axis, along the quad's top edge.
    pub a: [f32; 2],
    /// Second half-axis, along the quad's left edge.
    pub b: [f32; 2],
}

impl Parallelogram {
    /// Best-fit parallelogram of a quad: centre at the corner mean, axes
    /// half of the averaged opposite edges.
    pub fn from_quad(q: &SampleQuad) -> Self {
        let [v1, v2, v3, v4] = q.corners();
        let mut centre = [0.0f32; 2];
        let mut a = [0.0f32; 2];
        let mut b = [0.0f32; 2];
        for i in 0..2 {
            centre[i] = 0.25 * (v1[i] + v2[i] + v3[i] + v4[i]);
            a[i] = 0.25 * ((v2[i] - v1[i]) + (v4[i] - v3[i]));
            b[i] = 0.25 * ((v3[i] - v1[i]) + (v4[i] - v2[i]));
        }
        Self { centre, a, b }
    }

    /// Maps texture coordinates to the raster of a `width x height` image,
    /// where pixel centres sit at integer positions: `x = s * width - 0.5`.
    pub fn to_raster(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            centre: [self.centre[0] * w - 0.5, self.centre[1] * h - 0.5],
            a: [self.a[0] * w, self.a[1] * h],
            b: [self.b[0] * w, self.b[1] * h],
        }
    }

    /// Moves the centre by whole periods into `[0, period)` on each axis
    /// that has one. Axes are unchanged.
    pub fn reduce_periods(&self, period_x: Option<f32>, period_y: Option<f32>) -> Self {
        let reduce = |c: f32, period: Option<f32>| match period {
            Some(p) if p > 0.0 && c.is_finite() => c.rem_euclid(p),
            _ => c,
        };
        Self {
            centre: [reduce(self.centre[0], period_x), reduce(self.centre[1], period_y)],
            ..*self
        }
    }

    /// Applies a per-axis scale and offset.
    pub fn scale_offset(&self, x_scale: f32, x_offset: f32, y_scale: f32, y_offset: f32) -> Self {
        Self {
            centre: [self.centre[0] * x_scale + x_offset, self.centre[1] * y_scale + y_offset],
            a: [self.a[0] * x_scale, self.a[1] * y_scale],
            b: [self.b[0] * x_scale, self.b[1] * y_scale],
        }
    }

    /// Scales the axes by the width multipliers, then grows them by
    /// `blur_a` and `blur_b` raster units.
    pub fn widen(&self, s_width: f32, t_width: f32, blur_a: f32, blur_b: f32) -> Self {
        let grow = |v: [f32; 2], mult: f32, extra: f32, fallback: [f32; 2]| {
            let v = [v[0] * mult, v[1] * mult];
            let len = len2(v);
            if extra <= 0.0 {
                v
            } else if len > 0.0 {
                let k = (len + extra) / len;
                [v[0] * k, v[1] * k]
            } else {
                [fallback[0] * extra, fallback[1] * extra]
            }
        };
        Self {
            centre: self.centre,
            a: grow(self.a, s_width, blur_a, [1.0, 0.0]),
            b: grow(self.b, t_width, blur_b, [0.0, 1.0]),
        }
    }

    /// Signed area factor `a x b`.
    #[inline]
    pub fn det(&self) -> f32 {
        self.a[0] * self.b[1] - self.a[1] * self.b[0]
    }

    /// Full length of the longer axis.
    pub fn major_width(&self) -> f32 {
        2.0 * len2(self.a).max(len2(self.b))
    }

    /// Full width across the longer axis.
    pub fn minor_width(&self) -> f32 {
        let major = len2(self.a).max(len2(self.b));
        if major == 0.0 { 0.0 } else { 2.0 * self.det().abs() / major }
    }

    /// Grows a thin or degenerate parallelogram so that its minor width is
    /// at least `2 * radius`, keeping the major axis.
    pub fn with_min_radius(&self, radius: f32) -> Self {
        let la = len2(self.a);
        let lb = len2(self.b);
        if la.max(lb) < radius {
            let ka = if la > 0.0 { radius / la } else { 0.0 };
            let kb = if lb > 0.0 { radius / lb } else { 0.0 };
            let a = if la > 0.0 { [self.a[0] * ka, self.a[1] * ka] } else { [radius, 0.0] };
            let b = if lb > 0.0 { [self.b[0] * kb, self.b[1] * kb] } else { [0.0, radius] };
            let grown = Self { centre: self.centre, a, b };
            if grown.minor_width() >= 2.0 * radius * 0.999 {
                return grown;
            }
            return Self {
                centre: self.centre,
                a: [radius, 0.0],
                b: [0.0, radius],
            };
        }

        let half_minor = 0.5 * self.minor_width();
        if half_minor >= radius {
            return *self;
        }
        let det = self.det();
        let sign = if det < 0.0 { -1.0 } else { 1.0 };
        let mut out = *self;
        if la >= lb {
            let k = sign * (radius - half_minor);
            out.b = [self.b[0] - self.a[1] / la * k, self.b[1] + self.a[0] / la * k];
        } else {
            let k = -sign * (radius - half_minor);
            out.a = [self.a[0] - self.b[1] / lb * k, self.a[1] + self.b[0] / lb * k];
        }
        out
    }

    /// Pixels whose centres lie inside the axis-aligned bounding box.
    pub fn bounding_support(&self) -> Support {
        let ex = self.a[0].abs() + self.b[0].abs();
        let ey = self.a[1].abs() + self.b[1].abs();
        Support::covering(
            self.centre[0] - ex,
            self.centre[0] + ex,
            self.centre[1] - ey,
            self.centre[1] + ey,
        )
    }
}
