//! Flat in-memory texture raster.
//!
//! [`TextureBuffer`] stores a `width x height` raster of interleaved
//! channels in its native storage type. Channel `c` of pixel `(x, y)` lives
//! at `(y * width + x) * channels + c`.
//!
//! Buffers are written once while a texture is populated (either decoded
//! from file bytes or filled with [`set_pixel`](TextureBuffer::set_pixel))
//! and read-only afterwards.
//!
//! # Example
//!
//! ```rust
//! use mipcache::{SampleIterator, TextureBuffer};
//! use mipcache_core::Support;
//!
//! let mut buf = TextureBuffer::<u8>::new(4, 4, 3);
//! buf.set_pixel(1, 2, &[1.0, 0.5, 0.0]).unwrap();
//!
//! let mut it = buf.iter(Support::new(1, 2, 2, 3));
//! assert!(it.valid());
//! assert_eq!(it.sample().get(0), 1.0);
//! it.advance().unwrap();
//! assert!(!it.valid());
//! ```

use mipcache_core::{decode_le, ChannelLayout, Error, PixelFormat, Result, Support};

use crate::error::TexResult;
use crate::iter::{table_start, RegularCursor, SampleIterator, StochasticCursor};
use crate::random::RandomOffsetTable;
use crate::sample::SampleVector;

/// Flat 2D pixel array generic over channel storage.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBuffer<T: PixelFormat> {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<T>,
}

fn checked_len(width: u32, height: u32, channels: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels as usize))
        .ok_or_else(|| Error::invalid_dimensions(width, height, channels, "size overflows usize"))
}

impl<T: PixelFormat> TextureBuffer<T> {
    /// Creates a zero-filled buffer.
    ///
    /// # Panics
    ///
    /// Panics if `width * height * channels` overflows `usize`.
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            width,
            height,
            channels,
            data: vec![T::default(); len],
        }
    }

    /// Adopts already-decoded storage without copying.
    ///
    /// # Errors
    ///
    /// [`Error::DataSize`] if `data.len() != width * height * channels`.
    pub fn from_vec(data: Vec<T>, width: u32, height: u32, channels: u32) -> Result<Self> {
        let expected = checked_len(width, height, channels)?;
        if data.len() != expected {
            return Err(Error::DataSize {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Decodes a little-endian byte block in this buffer's storage type.
    ///
    /// # Errors
    ///
    /// [`Error::DataSize`] if the block does not hold exactly
    /// `width * height * channels` values.
    pub fn from_le_bytes(bytes: &[u8], width: u32, height: u32, channels: u32) -> Result<Self> {
        let expected = checked_len(width, height, channels)?;
        if bytes.len() != expected * T::BYTES {
            return Err(Error::DataSize {
                expected,
                got: bytes.len() / T::BYTES,
            });
        }
        Self::from_vec(decode_le(bytes), width, height, channels)
    }

    /// Reallocates the buffer with new dimensions and channel layout.
    ///
    /// Contents are reset to zero.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if `layout.format` is not this buffer's
    /// storage type.
    pub fn resize(&mut self, width: u32, height: u32, layout: ChannelLayout) -> Result<()> {
        if layout.format != T::FORMAT {
            return Err(Error::type_mismatch(T::FORMAT, layout));
        }
        let len = checked_len(width, height, layout.channels)?;
        self.width = width;
        self.height = height;
        self.channels = layout.channels;
        self.data.clear();
        self.data.resize(len, T::default());
        Ok(())
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channels per pixel.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Channel count and storage type.
    #[inline]
    pub fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(self.channels, T::FORMAT)
    }

    /// Whole raster as a support.
    #[inline]
    pub fn extent(&self) -> Support {
        Support::from_size(self.width, self.height)
    }

    /// Raw storage in row-major interleaved order.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    fn check(&self, x: i32, y: i32) -> Result<()> {
        if self.extent().contains(x, y) {
            Ok(())
        } else {
            Err(Error::out_of_bounds(x.into(), y.into(), self.width, self.height))
        }
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }

    /// Writes logical values into pixel `(x, y)`, clamping for integer storage.
    ///
    /// Extra values beyond the channel count are ignored; missing ones leave
    /// the channel untouched.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] outside `[0, width) x [0, height)`.
    pub fn set_pixel(&mut self, x: i32, y: i32, values: &[f32]) -> Result<()> {
        self.check(x, y)?;
        let start = self.offset(x, y);
        let pixel = &mut self.data[start..start + self.channels as usize];
        for (dst, &v) in pixel.iter_mut().zip(values) {
            *dst = T::from_f32(v);
        }
        Ok(())
    }

    /// Stored channels of pixel `(x, y)`, for decode loops that already
    /// produce the storage type.
    ///
    /// # Panics
    ///
    /// Panics outside the raster.
    #[inline]
    pub fn raw(&self, x: i32, y: i32) -> &[T] {
        assert!(self.extent().contains(x, y), "pixel ({x}, {y}) outside {}x{}", self.width, self.height);
        let start = self.offset(x, y);
        &self.data[start..start + self.channels as usize]
    }

    /// Mutable stored channels of pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics outside the raster.
    #[inline]
    pub fn raw_mut(&mut self, x: i32, y: i32) -> &mut [T] {
        assert!(self.extent().contains(x, y), "pixel ({x}, {y}) outside {}x{}", self.width, self.height);
        let start = self.offset(x, y);
        let channels = self.channels as usize;
        &mut self.data[start..start + channels]
    }

    /// Channels of pixel `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] outside the raster.
    pub fn sample(&self, x: i32, y: i32) -> Result<SampleVector<'_, T>> {
        self.check(x, y)?;
        Ok(self.sample_unchecked(x, y))
    }

    /// Logical value of channel `c` of pixel `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] outside the raster or past the last channel.
    pub fn value(&self, x: i32, y: i32, c: u32) -> Result<f32> {
        self.check(x, y)?;
        if c >= self.channels {
            return Err(Error::out_of_bounds(x.into(), y.into(), self.width, self.height));
        }
        Ok(self.data[self.offset(x, y) + c as usize].to_f32())
    }

    /// Channels of a pixel already known to be inside the raster.
    #[inline]
    pub(crate) fn sample_unchecked(&self, x: i32, y: i32) -> SampleVector<'_, T> {
        debug_assert!(self.extent().contains(x, y));
        let start = self.offset(x, y);
        SampleVector::new(&self.data[start..start + self.channels as usize])
    }

    /// Iterates over every pixel of `support` that lies inside the raster.
    pub fn iter(&self, support: Support) -> BufferIter<'_, T> {
        BufferIter {
            buffer: self,
            cursor: RegularCursor::new(support.intersect(&self.extent())),
        }
    }

    /// Iterates over `samples` table-driven positions of `support`
    /// clipped to the raster.
    ///
    /// Yields exactly `samples` pixels unless the clipped support is empty,
    /// in which case it yields none.
    pub fn stochastic_iter<'a>(
        &'a self,
        support: Support,
        samples: u32,
        table: &'a RandomOffsetTable,
    ) -> StochasticBufferIter<'a, T> {
        let clipped = support.intersect(&self.extent());
        StochasticBufferIter {
            buffer: self,
            cursor: StochasticCursor::new(clipped, samples, table, table.offset(), table_start(&clipped)),
        }
    }
}

/// Regular iterator over a [`TextureBuffer`].
#[derive(Debug)]
pub struct BufferIter<'a, T: PixelFormat> {
    buffer: &'a TextureBuffer<T>,
    cursor: RegularCursor,
}

impl<T: PixelFormat> SampleIterator<T> for BufferIter<'_, T> {
    #[inline]
    fn valid(&self) -> bool {
        self.cursor.valid()
    }

    #[inline]
    fn advance(&mut self) -> TexResult<()> {
        self.cursor.advance();
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
        self.buffer.sample_unchecked(self.cursor.x(), self.cursor.y())
    }
}

/// Stochastic iterator over a [`TextureBuffer`].
#[derive(Debug)]
pub struct StochasticBufferIter<'a, T: PixelFormat> {
    buffer: &'a TextureBuffer<T>,
    cursor: StochasticCursor<'a>,
}

impl<T: PixelFormat> SampleIterator<T> for StochasticBufferIter<'_, T> {
    #[inline]
    fn valid(&self) -> bool {
        self.cursor.valid()
    }

    #[inline]
    fn advance(&mut self) -> TexResult<()> {
        self.cursor.advance();
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
        self.buffer.sample_unchecked(self.cursor.x(), self.cursor.y())
    }
}
