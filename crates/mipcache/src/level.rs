//! One mip level, tiled or flat.

use mipcache_core::{PixelFormat, Support};

use crate::buffer::{BufferIter, StochasticBufferIter, TextureBuffer};
use crate::error::TexResult;
use crate::iter::SampleIterator;
use crate::random::RandomOffsetTable;
use crate::sample::SampleVector;
use crate::tile_array::{StochasticTileArrayIter, TileArray, TileArrayIter};

/// Storage of one mip level.
///
/// Tiled subimages stay on disk until touched; scanline subimages are read
/// whole into a [`TextureBuffer`] when the level is built.
#[derive(Debug)]
pub enum MipLevel<T: PixelFormat> {
    /// Lazily fetched tiles.
    Tiled(TileArray<T>),
    /// Fully resident raster.
    Flat(TextureBuffer<T>),
}

impl<T: PixelFormat> MipLevel<T> {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        match self {
            Self::Tiled(t) => t.width(),
            Self::Flat(b) => b.width(),
        }
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            Self::Tiled(t) => t.height(),
            Self::Flat(b) => b.height(),
        }
    }

    /// Channels per pixel.
    pub fn channels(&self) -> u32 {
        match self {
            Self::Tiled(t) => t.channels(),
            Self::Flat(b) => b.channels(),
        }
    }

    /// Whole level as a support.
    pub fn extent(&self) -> Support {
        Support::from_size(self.width(), self.height())
    }

    /// Logical value of channel `c` of pixel `(x, y)`.
    pub fn value(&self, x: i32, y: i32, c: u32) -> TexResult<f32> {
        match self {
            Self::Tiled(t) => t.value(x, y, c),
            Self::Flat(b) => Ok(b.value(x, y, c)?),
        }
    }

    /// Regular iterator over `support` clipped to the level.
    pub fn iter(&self, support: Support) -> TexResult<LevelIter<'_, T>> {
        Ok(match self {
            Self::Tiled(t) => LevelIter::Tiles(t.iter(support)?),
            Self::Flat(b) => LevelIter::Buffer(b.iter(support)),
        })
    }

    /// Stochastic iterator of `samples` positions over `support` clipped
    /// to the level.
    pub fn stochastic_iter<'a>(
        &'a self,
        support: Support,
        samples: u32,
        table: &'a RandomOffsetTable,
    ) -> TexResult<LevelIter<'a, T>> {
        Ok(match self {
            Self::Tiled(t) => LevelIter::StochasticTiles(t.stochastic_iter(support, samples, table)?),
            Self::Flat(b) => LevelIter::StochasticBuffer(b.stochastic_iter(support, samples, table)),
        })
    }
}

/// Any of the four iterator kinds of a [`MipLevel`].
pub enum LevelIter<'a, T: PixelFormat> {
    /// Regular walk over a flat level.
    Buffer(BufferIter<'a, T>),
    /// Stochastic walk over a flat level.
    StochasticBuffer(StochasticBufferIter<'a, T>),
    /// Regular walk over a tiled level.
    Tiles(TileArrayIter<'a, T>),
    /// Stochastic walk over a tiled level.
    StochasticTiles(StochasticTileArrayIter<'a, T>),
}

macro_rules! dispatch {
    ($self:expr, $it:ident => $body:expr) => {
        match $self {
            LevelIter::Buffer($it) => $body,
            LevelIter::StochasticBuffer($it) => $body,
            LevelIter::Tiles($it) => $body,
            LevelIter::StochasticTiles($it) => $body,
        }
    };
}

impl<T: PixelFormat> SampleIterator<T> for LevelIter<'_, T> {
    #[inline]
    fn valid(&self) -> bool {
        dispatch!(self, it => it.valid())
    }

    #[inline]
    fn advance(&mut self) -> TexResult<()> {
        dispatch!(self, it => it.advance())
    }

    #[inline]
    fn x(&self) -> i32 {
        dispatch!(self, it => it.x())
    }

    #[inline]
    fn y(&self) -> i32 {
        dispatch!(self, it => it.y())
    }

    #[inline]
    fn sample(&self) -> SampleVector<'_, T> {
        dispatch!(self, it => it.sample())
    }
}
