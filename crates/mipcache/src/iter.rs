//! Pixel iteration contract shared by buffers, tile arrays and mip levels.
//!
//! All texture iterators follow the same protocol:
//!
//! ```rust,ignore
//! while it.valid() {
//!     let value = it.sample().get(0);
//!     let (x, y) = (it.x(), it.y());
//!     it.advance()?;
//! }
//! ```
//!
//! A validity check precedes every dereference; there is no end sentinel.
//! Iterators are finite and not restartable. `advance` is fallible because
//! moving into a new tile may read it from disk.
//!
//! Two strategies exist. Regular iteration visits every pixel of a support
//! in row-major order. Stochastic iteration visits exactly `n` positions
//! drawn from a [`RandomOffsetTable`].

use mipcache_core::{PixelFormat, Support};

use crate::error::TexResult;
use crate::random::RandomOffsetTable;
use crate::sample::SampleVector;

/// Iterator over pixels of a texture region.
pub trait SampleIterator<T: PixelFormat> {
    /// Whether the iterator currently points at a pixel.
    fn valid(&self) -> bool;

    /// Moves to the next pixel.
    ///
    /// # Errors
    ///
    /// Propagates tile read failures when crossing into a new tile.
    fn advance(&mut self) -> TexResult<()>;

    /// Column of the current pixel in the iterated raster.
    fn x(&self) -> i32;

    /// Row of the current pixel in the iterated raster.
    fn y(&self) -> i32;

    /// Channels of the current pixel. Only call while [`valid`](Self::valid).
    fn sample(&self) -> SampleVector<'_, T>;
}

/// Row-major walk over every pixel of a support.
#[derive(Debug, Clone)]
pub(crate) struct RegularCursor {
    support: Support,
    x: i32,
    y: i32,
}

impl RegularCursor {
    pub(crate) fn new(support: Support) -> Self {
        let y = if support.is_empty() { support.y0.max(support.y1) } else { support.y0 };
        Self {
            support,
            x: support.x0,
            y,
        }
    }

    /// A cursor that is already exhausted.
    pub(crate) fn exhausted() -> Self {
        Self::new(Support::default())
    }

    #[inline]
    pub(crate) fn valid(&self) -> bool {
        self.y < self.support.y1
    }

    #[inline]
    pub(crate) fn advance(&mut self) {
        self.x += 1;
        if self.x >= self.support.x1 {
            self.x = self.support.x0;
            self.y += 1;
        }
    }

    #[inline]
    pub(crate) fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub(crate) fn y(&self) -> i32 {
        self.y
    }
}

/// First table index used for a support.
///
/// Hashing the support corner makes neighbouring requests start at
/// different points of the sequence.
pub(crate) fn table_start(support: &Support) -> usize {
    let h = (support.x0 as u32).wrapping_mul(73_856_093) ^ (support.y0 as u32).wrapping_mul(19_349_663);
    h as usize
}

/// Walk over `n` table-driven positions inside a support.
#[derive(Debug, Clone)]
pub(crate) struct StochasticCursor<'a> {
    support: Support,
    table: &'a RandomOffsetTable,
    offset: (f32, f32),
    remaining: u32,
    index: usize,
    x: i32,
    y: i32,
}

impl<'a> StochasticCursor<'a> {
    pub(crate) fn new(
        support: Support,
        samples: u32,
        table: &'a RandomOffsetTable,
        offset: (f32, f32),
        start_index: usize,
    ) -> Self {
        let remaining = if support.is_empty() { 0 } else { samples };
        let mut cursor = Self {
            support,
            table,
            offset,
            remaining,
            index: start_index,
            x: support.x0,
            y: support.y0,
        };
        cursor.place();
        cursor
    }

    pub(crate) fn exhausted(table: &'a RandomOffsetTable) -> Self {
        Self::new(Support::default(), 0, table, (0.0, 0.0), 0)
    }

    fn place(&mut self) {
        if self.remaining == 0 {
            return;
        }
        let (u, v) = self.table.lookup_with(self.index, self.offset);
        let w = self.support.width();
        let h = self.support.height();
        self.x = self.support.x0 + ((u * w as f32) as u32).min(w - 1) as i32;
        self.y = self.support.y0 + ((v * h as f32) as u32).min(h - 1) as i32;
    }

    #[inline]
    pub(crate) fn valid(&self) -> bool {
        self.remaining > 0
    }

    #[inline]
    pub(crate) fn advance(&mut self) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        self.index = self.index.wrapping_add(1);
        self.place();
    }

    /// Table index the next walk should continue from.
    #[inline]
    pub(crate) fn next_index(&self) -> usize {
        self.index.wrapping_add(self.remaining as usize)
    }

    #[inline]
    pub(crate) fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub(crate) fn y(&self) -> i32 {
        self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_cursor_visits_row_major() {
        let mut c = RegularCursor::new(Support::new(2, 4, 5, 7));
        let mut seen = Vec::new();
        while c.valid() {
            seen.push((c.x(), c.y()));
            c.advance();
        }
        assert_eq!(seen, vec![(2, 5), (3, 5), (2, 6), (3, 6)]);
    }

    #[test]
    fn test_regular_cursor_empty() {
        assert!(!RegularCursor::new(Support::new(3, 3, 0, 10)).valid());
        assert!(!RegularCursor::new(Support::new(0, 10, 4, 1)).valid());
        assert!(!RegularCursor::exhausted().valid());
    }

    #[test]
    fn test_stochastic_cursor_count_and_bounds() {
        let table = RandomOffsetTable::new();
        let support = Support::new(-3, 9, 10, 13);
        let mut c = StochasticCursor::new(support, 50, &table, (0.3, 0.7), 11);
        let mut count = 0;
        while c.valid() {
            assert!(support.contains(c.x(), c.y()));
            count += 1;
            c.advance();
        }
        assert_eq!(count, 50);
        assert_eq!(c.next_index(), 61);
    }

    #[test]
    fn test_stochastic_cursor_empty_support() {
        let table = RandomOffsetTable::new();
        let c = StochasticCursor::new(Support::new(0, 0, 0, 4), 8, &table, (0.0, 0.0), 0);
        assert!(!c.valid());
        assert!(!StochasticCursor::exhausted(&table).valid());
    }
}
