//! A buffer placed inside a larger raster.

use mipcache_core::{PixelFormat, Support};

use crate::buffer::TextureBuffer;
use crate::sample::SampleVector;

/// One tile of a [`TileArray`](crate::TileArray).
///
/// Accessors take coordinates in the parent raster; the tile subtracts its
/// own offset. Tiles are handed out as `Arc<TextureTile<T>>`: the owning
/// slot keeps one reference and every iterator positioned on the tile
/// holds another, so a tile outlives all of its readers.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureTile<T: PixelFormat> {
    buffer: TextureBuffer<T>,
    top_left_x: i32,
    top_left_y: i32,
}

impl<T: PixelFormat> TextureTile<T> {
    /// Places `buffer` with its first pixel at `(top_left_x, top_left_y)`.
    pub fn new(buffer: TextureBuffer<T>, top_left_x: i32, top_left_y: i32) -> Self {
        Self {
            buffer,
            top_left_x,
            top_left_y,
        }
    }

    /// Width of the stored block.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Height of the stored block.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Parent-raster column of the first pixel.
    #[inline]
    pub fn top_left_x(&self) -> i32 {
        self.top_left_x
    }

    /// Parent-raster row of the first pixel.
    #[inline]
    pub fn top_left_y(&self) -> i32 {
        self.top_left_y
    }

    /// Channels per pixel.
    #[inline]
    pub fn samples_per_pixel(&self) -> u32 {
        self.buffer.channels()
    }

    /// Pixels covered, in parent coordinates.
    #[inline]
    pub fn extent(&self) -> Support {
        Support::new(
            self.top_left_x,
            self.top_left_x + self.width() as i32,
            self.top_left_y,
            self.top_left_y + self.height() as i32,
        )
    }

    /// Whether parent pixel `(x, y)` is stored in this tile.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.extent().contains(x, y)
    }

    /// Channels of parent pixel `(x, y)`.
    ///
    /// The pixel must lie inside [`extent`](Self::extent); anything else is
    /// a contract violation and panics.
    #[inline]
    pub fn sample(&self, x: i32, y: i32) -> SampleVector<'_, T> {
        assert!(self.contains(x, y), "pixel ({x}, {y}) outside tile {}", self.extent());
        self.buffer.sample_unchecked(x - self.top_left_x, y - self.top_left_y)
    }

    /// Logical value of channel `c` of parent pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics outside the tile or past the last channel.
    #[inline]
    pub fn value(&self, x: i32, y: i32, c: u32) -> f32 {
        self.sample(x, y).get(c as usize)
    }

    /// Underlying buffer in tile-local coordinates.
    #[inline]
    pub fn buffer(&self) -> &TextureBuffer<T> {
        &self.buffer
    }
}
