//! Integer pixel boxes used as filter supports.
//!
//! A [`Support`] is the half-open box `[x0, x1) x [y0, y1)` of pixel indices
//! that contribute to one filtered lookup. Coordinates are signed because a
//! footprint near an image edge produces a support that hangs off the raster
//! before it is clipped or wrapped.
//!
//! # Coordinate System
//!
//! Pixel `(x, y)` has its center at the integer point `(x, y)` of raster
//! space. Origin is the top-left corner, X to the right, Y downward.
//!
//! ```text
//! (0,0) ────────► X
//!   │
//!   │   ┌──────────┐
//!   │   │ Support  │
//!   │   └──────────┘
//!   ▼
//!   Y
//! ```
//!
//! # Usage
//!
//! ```rust
//! use mipcache_core::Support;
//!
//! let support = Support::new(60, 70, 60, 70);
//! assert_eq!(support.area(), 100);
//!
//! let tile = Support::new(64, 128, 64, 128);
//! assert_eq!(support.intersect(&tile).area(), 36);
//! ```

/// Half-open box of pixel indices `[x0, x1) x [y0, y1)`.
///
/// A support with `x1 <= x0` or `y1 <= y0` is empty; empty supports
/// compare unequal unless their bounds match, but all report zero area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Support {
    /// First column (inclusive).
    pub x0: i32,
    /// Last column (exclusive).
    pub x1: i32,
    /// First row (inclusive).
    pub y0: i32,
    /// Last row (exclusive).
    pub y1: i32,
}

impl Support {
    /// Creates a support from its bounds.
    #[inline]
    pub const fn new(x0: i32, x1: i32, y0: i32, y1: i32) -> Self {
        Self { x0, x1, y0, y1 }
    }

    /// Support covering a whole `width x height` raster.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, width as i32, 0, height as i32)
    }

    /// Smallest support holding every pixel center inside the closed box
    /// `[min_x, max_x] x [min_y, max_y]` of raster space.
    ///
    /// Always holds at least one pixel: a box smaller than a pixel snaps to
    /// the nearest center.
    ///
    /// ```rust
    /// use mipcache_core::Support;
    ///
    /// assert_eq!(Support::covering(1.2, 3.8, 0.0, 0.4), Support::new(2, 4, 0, 1));
    /// assert_eq!(Support::covering(1.2, 1.3, 5.1, 5.2), Support::new(1, 2, 5, 6));
    /// ```
    pub fn covering(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        let (x0, x1) = covering_range(min_x, max_x);
        let (y0, y1) = covering_range(min_y, max_y);
        Self::new(x0, x1, y0, y1)
    }

    /// Width in pixels (zero when empty).
    #[inline]
    pub fn width(&self) -> u32 {
        (i64::from(self.x1) - i64::from(self.x0)).max(0) as u32
    }

    /// Height in pixels (zero when empty).
    #[inline]
    pub fn height(&self) -> u32 {
        (i64::from(self.y1) - i64::from(self.y0)).max(0) as u32
    }

    /// Number of pixels in the support.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Whether the support holds no pixel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Whether pixel `(x, y)` lies inside.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Overlap of two supports; may be empty.
    #[inline]
    pub fn intersect(&self, other: &Support) -> Support {
        Support::new(
            self.x0.max(other.x0),
            self.x1.min(other.x1),
            self.y0.max(other.y0),
            self.y1.min(other.y1),
        )
    }

    /// Support clipped to a `width x height` raster.
    #[inline]
    pub fn clamp_to(&self, width: u32, height: u32) -> Support {
        self.intersect(&Support::from_size(width, height))
    }
}

impl std::fmt::Display for Support {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}) x [{}, {})", self.x0, self.x1, self.y0, self.y1)
    }
}

fn covering_range(min: f32, max: f32) -> (i32, i32) {
    let start = min.ceil();
    let end = max.floor();
    // Float to int casts saturate; keep one pixel even at the i32 limits.
    let first = if end >= start {
        start as i32
    } else {
        (0.5 * (min + max)).round() as i32
    };
    let first = first.min(i32::MAX - 1);
    let last = if end >= start { end as i32 } else { first };
    (first, last.saturating_add(1).max(first + 1))
}
