//! Sparse, lazily populated grid of tiles backed by a tiled file.
//!
//! A [`TileArray`] covers one subimage of a tiled texture. No pixel data is
//! read at construction: every tile slot starts empty and is filled on the
//! first request that touches it. Filled slots are never replaced.
//!
//! # Access paths
//!
//! - [`TileArray::value`] resolves one pixel through its tile. Fine for
//!   spot checks but it pays a slot lookup per call.
//! - [`TileArray::iter`] and [`TileArray::stochastic_iter`] walk a support
//!   tile by tile and are the intended path for filtering.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mipcache::input::MemoryTexture;
//! use mipcache::{SampleIterator, TileArray};
//! use mipcache_core::Support;
//!
//! let texture = Arc::new(
//!     MemoryTexture::builder("t.tex")
//!         .tiled(64, 64)
//!         .level(256, 256, 1, &vec![0.5; 256 * 256])
//!         .build()
//!         .unwrap(),
//! );
//! let tiles = TileArray::<u8>::new(texture.clone(), 0).unwrap();
//!
//! let mut it = tiles.iter(Support::new(60, 70, 60, 70)).unwrap();
//! let mut count = 0;
//! while it.valid() {
//!     count += 1;
//!     it.advance().unwrap();
//! }
//! assert_eq!(count, 100);
//! assert_eq!(texture.tile_reads(), 4);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mipcache_core::{decode_le, Error, PixelFormat, Support};
use tracing::debug;

use crate::buffer::TextureBuffer;
use crate::error::{TexResult, TextureError};
use crate::input::TextureInput;
use crate::iter::{table_start, RegularCursor, SampleIterator, StochasticCursor};
use crate::partition::AreaPartition;
use crate::random::RandomOffsetTable;
use crate::sample::SampleVector;
use crate::slot::LazySlot;
use crate::tile::TextureTile;

/// Cache counters of a [`TileArray`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileStats {
    /// Requests served from an already populated slot.
    pub hits: u64,
    /// Requests that read a tile from the file.
    pub misses: u64,
    /// Tiles currently held.
    pub resident: usize,
}

impl TileStats {
    /// Fraction of requests served without I/O.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

/// Tiled raster fetched on demand.
pub struct TileArray<T: PixelFormat> {
    input: Arc<dyn TextureInput>,
    subimage: usize,
    width: u32,
    height: u32,
    channels: u32,
    tile_width: u32,
    tile_height: u32,
    tiles_x: u32,
    tiles_y: u32,
    slots: Box<[LazySlot<Arc<TextureTile<T>>>]>,
    requests: AtomicU64,
    misses: AtomicU64,
}

impl<T: PixelFormat> fmt::Debug for TileArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileArray")
            .field("path", &self.input.path())
            .field("subimage", &self.subimage)
            .field("size", &(self.width, self.height))
            .field("channels", &self.channels)
            .field("tile", &(self.tile_width, self.tile_height))
            .field("format", &T::FORMAT)
            .finish_non_exhaustive()
    }
}

impl<T: PixelFormat> TileArray<T> {
    /// Reads the header of `subimage` and allocates an all-empty slot grid.
    ///
    /// # Errors
    ///
    /// [`TextureError::BadTexture`] if the subimage is not tiled or its
    /// storage type is not `T`.
    pub fn new(input: Arc<dyn TextureInput>, subimage: usize) -> TexResult<Self> {
        let header = input.header(subimage)?;
        let (tile_width, tile_height) = header.tile.ok_or_else(|| {
            TextureError::BadTexture(format!("{}: subimage {} is not tiled", input.path().display(), subimage))
        })?;
        if tile_width == 0 || tile_height == 0 {
            return Err(TextureError::BadTexture(format!(
                "{}: zero tile size in subimage {}",
                input.path().display(),
                subimage
            )));
        }
        if header.format != T::FORMAT {
            return Err(TextureError::BadTexture(format!(
                "{}: subimage {} stores {}, expected {}",
                input.path().display(),
                subimage,
                header.format,
                T::FORMAT
            )));
        }

        let tiles_x = header.tiles_x();
        let tiles_y = header.tiles_y();
        let slots = (0..tiles_x as usize * tiles_y as usize).map(|_| LazySlot::new()).collect();
        let (width, height, channels) = (header.width, header.height, header.channels);

        Ok(Self {
            input,
            subimage,
            width,
            height,
            channels,
            tile_width,
            tile_height,
            tiles_x,
            tiles_y,
            slots,
            requests: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channels per pixel.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Tile width in pixels.
    #[inline]
    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Tile height in pixels.
    #[inline]
    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Number of tile columns.
    #[inline]
    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    /// Number of tile rows.
    #[inline]
    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    /// Whole image as a support.
    #[inline]
    pub fn extent(&self) -> Support {
        Support::from_size(self.width, self.height)
    }

    /// Pixels covered by tile `(tx, ty)`, clipped to the image.
    pub fn tile_extent(&self, tx: u32, ty: u32) -> Support {
        let x0 = (tx * self.tile_width) as i32;
        let y0 = (ty * self.tile_height) as i32;
        Support::new(x0, x0 + self.tile_width as i32, y0, y0 + self.tile_height as i32).intersect(&self.extent())
    }

    #[inline]
    fn slot(&self, tx: u32, ty: u32) -> &LazySlot<Arc<TextureTile<T>>> {
        &self.slots[ty as usize * self.tiles_x as usize + tx as usize]
    }

    /// Whether tile `(tx, ty)` has been fetched.
    pub fn is_cached(&self, tx: u32, ty: u32) -> bool {
        tx < self.tiles_x && ty < self.tiles_y && self.slot(tx, ty).get().is_some()
    }

    /// Current cache counters.
    pub fn stats(&self) -> TileStats {
        let requests = self.requests.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        TileStats {
            hits: requests.saturating_sub(misses),
            misses,
            resident: self.slots.iter().filter(|s| s.get().is_some()).count(),
        }
    }

    /// Returns tile `(tx, ty)`, reading it from the file on first access.
    ///
    /// Concurrent first requests for the same tile read it once; all
    /// callers receive the same `Arc`.
    ///
    /// # Errors
    ///
    /// Tile coordinates outside the grid, or any read/decode failure.
    pub fn get_tile(&self, tx: u32, ty: u32) -> TexResult<Arc<TextureTile<T>>> {
        if tx >= self.tiles_x || ty >= self.tiles_y {
            return Err(Error::out_of_bounds(tx.into(), ty.into(), self.tiles_x, self.tiles_y).into());
        }
        self.requests.fetch_add(1, Ordering::Relaxed);
        let tile = self.slot(tx, ty).get_or_try_init(|| {
            self.misses.fetch_add(1, Ordering::Relaxed);
            self.fetch(tx, ty).map(Arc::new)
        })?;
        Ok(Arc::clone(tile))
    }

    fn fetch(&self, tx: u32, ty: u32) -> TexResult<TextureTile<T>> {
        let bytes = self.input.read_tile(self.subimage, tx, ty)?;
        let channels = self.channels as usize;
        let tw = self.tile_width as usize;
        let expected = tw * self.tile_height as usize * channels * T::BYTES;
        if bytes.len() != expected {
            return Err(TextureError::Format(format!(
                "{}: tile ({}, {}) of subimage {} has {} bytes, expected {}",
                self.input.path().display(),
                tx,
                ty,
                self.subimage,
                bytes.len(),
                expected
            )));
        }

        let extent = self.tile_extent(tx, ty);
        let (w, h) = (extent.width(), extent.height());
        let padded: Vec<T> = decode_le(&bytes);
        let data = if w as usize == tw && h == self.tile_height {
            padded
        } else {
            let row_len = w as usize * channels;
            let mut data = Vec::with_capacity(row_len * h as usize);
            for row in padded.chunks_exact(tw * channels).take(h as usize) {
                data.extend_from_slice(&row[..row_len]);
            }
            data
        };

        debug!(
            path = %self.input.path().display(),
            subimage = self.subimage,
            tile_x = tx,
            tile_y = ty,
            "fetched tile"
        );
        let buffer = TextureBuffer::from_vec(data, w, h, self.channels)?;
        Ok(TextureTile::new(buffer, extent.x0, extent.y0))
    }

    /// Logical value of channel `c` of pixel `(x, y)`.
    ///
    /// Fetches the containing tile if needed.
    ///
    /// # Errors
    ///
    /// Out-of-bounds pixel or channel, or a tile read failure.
    pub fn value(&self, x: i32, y: i32, c: u32) -> TexResult<f32> {
        if !self.extent().contains(x, y) || c >= self.channels {
            return Err(Error::out_of_bounds(x.into(), y.into(), self.width, self.height).into());
        }
        let tile = self.get_tile(x as u32 / self.tile_width, y as u32 / self.tile_height)?;
        Ok(tile.value(x, y, c))
    }

    /// Inclusive tile range overlapping `support`, which must be non-empty
    /// and inside the image.
    fn tile_range(&self, support: &Support) -> TileRange {
        TileRange::new(
            support.x0 as u32 / self.tile_width,
            (support.x1 - 1) as u32 / self.tile_width,
            support.y0 as u32 / self.tile_height,
            (support.y1 - 1) as u32 / self.tile_height,
        )
    }

    /// Iterates over every pixel of `support` inside the image, one tile
    /// at a time in row-major tile order.
    ///
    /// # Errors
    ///
    /// Failure to read the first tile.
    pub fn iter(&self, support: Support) -> TexResult<TileArrayIter<'_, T>> {
        let support = support.intersect(&self.extent());
        let mut it = TileArrayIter {
            array: self,
            support,
            range: if support.is_empty() { TileRange::empty() } else { self.tile_range(&support) },
            tile: None,
            cursor: RegularCursor::exhausted(),
        };
        it.next_tile()?;
        Ok(it)
    }

    /// Iterates over exactly `samples` table-driven positions of `support`
    /// clipped to the image.
    ///
    /// The budget is split across the overlapped tiles in proportion to
    /// each tile's share of the support area. Tiles that receive no samples
    /// are not read.
    ///
    /// # Errors
    ///
    /// Failure to read the first sampled tile.
    pub fn stochastic_iter<'a>(
        &'a self,
        support: Support,
        samples: u32,
        table: &'a RandomOffsetTable,
    ) -> TexResult<StochasticTileArrayIter<'a, T>> {
        let support = support.intersect(&self.extent());
        let mut it = StochasticTileArrayIter {
            array: self,
            support,
            range: if support.is_empty() { TileRange::empty() } else { self.tile_range(&support) },
            partition: AreaPartition::new(samples, support.area()),
            table,
            offset: table.offset(),
            index: table_start(&support),
            tile: None,
            cursor: StochasticCursor::exhausted(table),
        };
        it.next_tile()?;
        Ok(it)
    }
}

/// Row-major walk over an inclusive tile range.
#[derive(Debug, Clone, Copy)]
struct TileRange {
    tx0: u32,
    tx1: u32,
    ty1: u32,
    tx: u32,
    ty: u32,
    done: bool,
}

impl TileRange {
    fn new(tx0: u32, tx1: u32, ty0: u32, ty1: u32) -> Self {
        Self {
            tx0,
            tx1,
            ty1,
            tx: tx0,
            ty: ty0,
            done: false,
        }
    }

    fn empty() -> Self {
        Self {
            done: true,
            ..Self::new(0, 0, 0, 0)
        }
    }
}

impl Iterator for TileRange {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        if self.done {
            return None;
        }
        let current = (self.tx, self.ty);
        if self.tx < self.tx1 {
            self.tx += 1;
        } else if self.ty < self.ty1 {
            self.tx = self.tx0;
            self.ty += 1;
        } else {
            self.done = true;
        }
        Some(current)
    }
}

#[inline]
fn tile_sample<'t, T: PixelFormat>(tile: &'t Option<Arc<TextureTile<T>>>, x: i32, y: i32) -> SampleVector<'t, T> {
    match tile {
        Some(tile) => tile.sample(x, y),
        None => panic!("sample() called on an exhausted tile iterator"),
    }
}

/// Regular iterator over a [`TileArray`].
///
/// Holds a reference to the tile it is positioned on.
pub struct TileArrayIter<'a, T: PixelFormat> {
    array: &'a TileArray<T>,
    support: Support,
    range: TileRange,
    tile: Option<Arc<TextureTile<T>>>,
    cursor: RegularCursor,
}

impl<T: PixelFormat> TileArrayIter<'_, T> {
    fn next_tile(&mut self) -> TexResult<()> {
        self.tile = None;
        for (tx, ty) in self.range.by_ref() {
            let piece = self.support.intersect(&self.array.tile_extent(tx, ty));
            if piece.is_empty() {
                continue;
            }
            self.tile = Some(self.array.get_tile(tx, ty)?);
            self.cursor = RegularCursor::new(piece);
            return Ok(());
        }
        self.cursor = RegularCursor::exhausted();
        Ok(())
    }
}

impl<T: PixelFormat> SampleIterator<T> for TileArrayIter<'_, T> {
    #[inline]
    fn valid(&self) -> bool {
        self.cursor.valid()
    }

    fn advance(&mut self) -> TexResult<()> {
        self.cursor.advance();
        if !self.cursor.valid() {
            self.next_tile()?;
        }
        Ok(())
    }

    #[inline]
    fn x(&self) -> i32 {
        self.cursor.x()
    }

    #[inline]
    fn y(&self) -> i32 {
        self.cursor.y()
    }

    #[inline]
    fn sample(&self) -> SampleVector<'_, T> {
        tile_sample(&self.tile, self.cursor.x(), self.cursor.y())
    }
}

/// Stochastic iterator over a [`TileArray`].
pub struct StochasticTileArrayIter<'a, T: PixelFormat> {
    array: &'a TileArray<T>,
    support: Support,
    range: TileRange,
    partition: AreaPartition,
    table: &'a RandomOffsetTable,
    offset: (f32, f32),
    index: usize,
    tile: Option<Arc<TextureTile<T>>>,
    cursor: StochasticCursor<'a>,
}

impl<T: PixelFormat> StochasticTileArrayIter<'_, T> {
    fn next_tile(&mut self) -> TexResult<()> {
        if self.tile.take().is_some() {
            self.index = self.cursor.next_index();
        }
        while let Some((tx, ty)) = self.range.next() {
            let piece = self.support.intersect(&self.array.tile_extent(tx, ty));
            let samples = self.partition.take(piece.area());
            if samples == 0 {
                continue;
            }
            self.tile = Some(self.array.get_tile(tx, ty)?);
            self.cursor = StochasticCursor::new(piece, samples, self.table, self.offset, self.index);
            return Ok(());
        }
        self.cursor = StochasticCursor::exhausted(self.table);
        Ok(())
    }
}

impl<T: PixelFormat> SampleIterator<T> for StochasticTileArrayIter<'_, T> {
    #[inline]
    fn valid(&self) -> bool {
        self.cursor.valid()
    }

    fn advance(&mut self) -> TexResult<()> {
        self.cursor.advance();
        if !self.cursor.valid() {
            self.next_tile()?;
        }
        Ok(())
    }

    #[inline]
    fn x(&self) -> i32 {
        self.cursor.x()
    }

    #[inline]
    fn y(&self) -> i32 {
        self.cursor.y()
    }

    #[inline]
    fn sample(&self) -> SampleVector<'_, T> {
        tile_sample(&self.tile, self.cursor.x(), self.cursor.y())
    }
}
