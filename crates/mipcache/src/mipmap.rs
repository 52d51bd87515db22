//! Lazily built mip pyramid of one texture file.
//!
//! Every subimage of the file is one level, level 0 at full resolution.
//! Level sizes come from the file headers rather than assumed halving, so
//! odd-sized pyramids map correctly. Headers are read eagerly at
//! construction (cheap); pixel storage for a level is only created the
//! first time [`MipmapLevelCache::level`] asks for it.
//!
//! # Level transforms
//!
//! Crop windows and footprints are expressed in level-0 raster space. With
//! pixel centres at integer positions, level-0 column `x` maps to column
//! `x * x_scale + x_offset` of level `i`, where
//! `x_scale = width_i / width_0` and `x_offset = 0.5 * x_scale - 0.5`.
//!
//! ```rust
//! use std::sync::Arc;
//! use mipcache::input::MemoryTexture;
//! use mipcache::MipmapLevelCache;
//!
//! let texture = MemoryTexture::builder("pyramid.tex")
//!     .level(8, 8, 1, &[0.0; 64])
//!     .level(4, 4, 1, &[0.0; 16])
//!     .build()
//!     .unwrap();
//! let cache = MipmapLevelCache::<u8>::new(Arc::new(texture)).unwrap();
//!
//! let t = cache.level_transform(1).unwrap();
//! assert_eq!((t.x_scale, t.x_offset), (0.5, -0.25));
//! assert!(cache.level(2).is_err());
//! ```

use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use mipcache_core::PixelFormat;
use tracing::debug;

use crate::attrs::Attrs;
use crate::buffer::TextureBuffer;
use crate::error::{TexResult, TextureError};
use crate::input::TextureInput;
use crate::level::MipLevel;
use crate::options::SampleOptions;
use crate::slot::LazySlot;
use crate::tile_array::TileArray;

/// Maps level-0 raster coordinates into one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelTransform {
    /// Horizontal scale.
    pub x_scale: f32,
    /// Horizontal offset.
    pub x_offset: f32,
    /// Vertical scale.
    pub y_scale: f32,
    /// Vertical offset.
    pub y_offset: f32,
}

impl LevelTransform {
    fn new(level_width: u32, level_height: u32, base_width: u32, base_height: u32) -> Self {
        let x_scale = level_width as f32 / base_width as f32;
        let y_scale = level_height as f32 / base_height as f32;
        Self {
            x_scale,
            x_offset: 0.5 * x_scale - 0.5,
            y_scale,
            y_offset: 0.5 * y_scale - 0.5,
        }
    }

    /// Level-0 position mapped into the level.
    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.x_scale + self.x_offset, y * self.y_scale + self.y_offset)
    }
}

struct LevelEntry<T: PixelFormat> {
    width: u32,
    height: u32,
    transform: LevelTransform,
    slot: LazySlot<MipLevel<T>>,
}

/// Ordered set of lazily built mip levels.
pub struct MipmapLevelCache<T: PixelFormat> {
    input: Arc<dyn TextureInput>,
    channels: u32,
    attrs: Attrs,
    levels: Box<[LevelEntry<T>]>,
    default_options: OnceLock<SampleOptions>,
}

impl<T: PixelFormat> fmt::Debug for MipmapLevelCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: Vec<(u32, u32)> = self.levels.iter().map(|l| (l.width, l.height)).collect();
        f.debug_struct("MipmapLevelCache")
            .field("path", &self.input.path())
            .field("format", &T::FORMAT)
            .field("channels", &self.channels)
            .field("levels", &sizes)
            .finish_non_exhaustive()
    }
}

impl<T: PixelFormat> MipmapLevelCache<T> {
    /// Reads the level headers of `input`.
    ///
    /// Trailing subimages whose channel count or storage type differ from
    /// level 0 are not treated as levels.
    ///
    /// # Errors
    ///
    /// [`TextureError::BadTexture`] if the file has no subimage, level 0
    /// is empty, or level 0 does not store `T`.
    pub fn new(input: Arc<dyn TextureInput>) -> TexResult<Self> {
        let path = input.path().display().to_string();
        if input.num_subimages() == 0 {
            return Err(TextureError::BadTexture(format!("{path}: no subimages")));
        }
        let base = input.header(0)?;
        if base.format != T::FORMAT {
            return Err(TextureError::BadTexture(format!(
                "{path}: stores {}, expected {}",
                base.format,
                T::FORMAT
            )));
        }
        if base.width == 0 || base.height == 0 || base.channels == 0 {
            return Err(TextureError::BadTexture(format!(
                "{path}: empty image {}x{}x{}",
                base.width, base.height, base.channels
            )));
        }

        let (base_width, base_height, channels) = (base.width, base.height, base.channels);
        let attrs = base.attrs.clone();
        let mut levels = Vec::new();
        for i in 0..input.num_subimages() {
            let h = input.header(i)?;
            if h.channels != channels || h.format != T::FORMAT || h.width == 0 || h.height == 0 {
                break;
            }
            levels.push(LevelEntry {
                width: h.width,
                height: h.height,
                transform: LevelTransform::new(h.width, h.height, base_width, base_height),
                slot: LazySlot::new(),
            });
        }

        Ok(Self {
            input,
            channels,
            attrs,
            levels: levels.into_boxed_slice(),
            default_options: OnceLock::new(),
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        self.input.path()
    }

    /// Number of levels.
    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Level-0 width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.levels[0].width
    }

    /// Level-0 height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.levels[0].height
    }

    /// Channels per pixel.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Level-0 attributes.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    fn entry(&self, level: usize) -> TexResult<&LevelEntry<T>> {
        self.levels.get(level).ok_or(TextureError::InvalidLevel {
            level,
            num_levels: self.levels.len(),
        })
    }

    /// Size of a level.
    pub fn level_size(&self, level: usize) -> TexResult<(u32, u32)> {
        self.entry(level).map(|e| (e.width, e.height))
    }

    /// Transform from level-0 raster space into `level`.
    pub fn level_transform(&self, level: usize) -> TexResult<LevelTransform> {
        self.entry(level).map(|e| e.transform)
    }

    /// Returns level `level`, building it on first access.
    ///
    /// Repeated calls return the same object.
    ///
    /// # Errors
    ///
    /// [`TextureError::InvalidLevel`] outside `[0, num_levels)`, or any
    /// failure reading a flat level.
    pub fn level(&self, level: usize) -> TexResult<&MipLevel<T>> {
        let entry = self.entry(level)?;
        entry.slot.get_or_try_init(|| self.build(level))
    }

    fn build(&self, level: usize) -> TexResult<MipLevel<T>> {
        let header = self.input.header(level)?;
        let built = if header.is_tiled() {
            MipLevel::Tiled(TileArray::new(Arc::clone(&self.input), level)?)
        } else {
            let bytes = self.input.read_image(level)?;
            MipLevel::Flat(TextureBuffer::from_le_bytes(&bytes, header.width, header.height, header.channels)?)
        };
        debug!(
            path = %self.input.path().display(),
            level,
            width = header.width,
            height = header.height,
            tiled = header.is_tiled(),
            "built mip level"
        );
        Ok(built)
    }

    /// Default lookup options from the file's attributes, parsed once.
    pub fn default_sample_options(&self) -> SampleOptions {
        *self
            .default_options
            .get_or_init(|| SampleOptions::from_attrs(&self.attrs, self.channels))
    }

    /// Single level for a footprint whose minor axis spans `width` level-0
    /// pixels: `clamp(floor(log2(width)), 0, num_levels - 1)`.
    pub fn select_level(&self, width: f32) -> usize {
        if width.is_nan() || width <= 1.0 {
            return 0;
        }
        let level = width.log2().floor();
        if level.is_finite() {
            (level as usize).min(self.levels.len() - 1)
        } else {
            self.levels.len() - 1
        }
    }
}
