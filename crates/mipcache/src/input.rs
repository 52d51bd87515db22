//! File-input contract consumed by the texture engine.
//!
//! The on-disk codec lives outside this crate. The engine only needs to
//! open a texture, read per-subimage headers and pull raw tiles or
//! scanline ranges out of it; [`TextureInput`] and [`TextureOpener`] are that
//! narrow surface.
//!
//! Each subimage of a texture is one mip level. Tile and scanline data are
//! little-endian, interleaved, `channels * bytes_per_channel` bytes per pixel.
//!
//! [`MemoryTexture`] is an in-memory implementation with read counters,
//! and [`MemoryOpener`] a path-keyed registry of them.
//!
//! # Example
//!
//! ```rust
//! use mipcache::input::{MemoryTexture, TextureInput};
//! use mipcache_core::DataFormat;
//!
//! let texture = MemoryTexture::builder("grey.tex")
//!     .format(DataFormat::U8)
//!     .tiled(2, 2)
//!     .level(4, 4, 1, &[0.5; 16])
//!     .build()
//!     .unwrap();
//!
//! let header = texture.header(0).unwrap();
//! assert_eq!((header.tiles_x(), header.tiles_y()), (2, 2));
//! assert_eq!(texture.read_tile(0, 1, 1).unwrap(), vec![128; 4]);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use mipcache_core::{encode_le, f16, ChannelLayout, DataFormat, PixelFormat};

use crate::attrs::{AttrValue, Attrs};
use crate::error::{TexResult, TextureError};

/// Header of one subimage.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureHeader {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel.
    pub channels: u32,
    /// Channel storage type.
    pub format: DataFormat,
    /// Tile dimensions, `None` for scanline storage.
    pub tile: Option<(u32, u32)>,
    /// Free-form attributes.
    pub attrs: Attrs,
}

impl TextureHeader {
    /// Whether the subimage is stored in tiles.
    #[inline]
    pub fn is_tiled(&self) -> bool {
        self.tile.is_some()
    }

    /// Channel count and storage type.
    #[inline]
    pub fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(self.channels, self.format)
    }

    /// Bytes per pixel.
    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.layout().bytes_per_pixel()
    }

    /// Number of tile columns (one for scanline storage).
    #[inline]
    pub fn tiles_x(&self) -> u32 {
        match self.tile {
            Some((tw, _)) => self.width.div_ceil(tw),
            None => 1,
        }
    }

    /// Number of tile rows (one for scanline storage).
    #[inline]
    pub fn tiles_y(&self) -> u32 {
        match self.tile {
            Some((_, th)) => self.height.div_ceil(th),
            None => 1,
        }
    }

    /// Size in bytes of one raw tile as returned by [`TextureInput::read_tile`].
    #[inline]
    pub fn tile_bytes(&self) -> usize {
        match self.tile {
            Some((tw, th)) => tw as usize * th as usize * self.bytes_per_pixel(),
            None => 0,
        }
    }
}

/// An open texture file.
///
/// Implementations must be shareable between render threads; reads may be
/// issued concurrently for different tiles.
pub trait TextureInput: Send + Sync {
    /// Path the texture was opened from.
    fn path(&self) -> &Path;

    /// Number of subimages (mip levels).
    fn num_subimages(&self) -> usize;

    /// Header of a subimage.
    fn header(&self, subimage: usize) -> TexResult<&TextureHeader>;

    /// Reads one tile of a tiled subimage.
    ///
    /// Returns exactly [`TextureHeader::tile_bytes`] bytes; the part of an
    /// edge tile hanging off the image is padding.
    fn read_tile(&self, subimage: usize, tile_x: u32, tile_y: u32) -> TexResult<Vec<u8>>;

    /// Reads rows `[y_begin, y_end)` of a subimage.
    fn read_scanlines(&self, subimage: usize, y_begin: u32, y_end: u32) -> TexResult<Vec<u8>>;

    /// Reads a whole subimage.
    fn read_image(&self, subimage: usize) -> TexResult<Vec<u8>> {
        let height = self.header(subimage)?.height;
        self.read_scanlines(subimage, 0, height)
    }
}

/// Opens textures by path.
pub trait TextureOpener: Send + Sync {
    /// Opens the texture at `path`.
    ///
    /// # Errors
    ///
    /// [`TextureError::NotFound`] if nothing exists at the path, or a format
    /// error if the file cannot be parsed.
    fn open(&self, path: &Path) -> TexResult<Arc<dyn TextureInput>>;
}

#[derive(Debug)]
struct MemorySubimage {
    header: TextureHeader,
    data: Vec<u8>,
}

/// In-memory texture.
///
/// Holds every subimage as a packed little-endian raster and serves tiles
/// by copying out of it. Counts reads so tests can observe lazy fetching.
#[derive(Debug)]
pub struct MemoryTexture {
    path: PathBuf,
    subimages: Vec<MemorySubimage>,
    tile_reads: AtomicUsize,
    scanline_reads: AtomicUsize,
}

impl MemoryTexture {
    /// Starts building a texture that reports `path`.
    pub fn builder(path: impl Into<PathBuf>) -> MemoryTextureBuilder {
        MemoryTextureBuilder::new(path)
    }

    /// Number of [`read_tile`](TextureInput::read_tile) calls served.
    pub fn tile_reads(&self) -> usize {
        self.tile_reads.load(Ordering::Relaxed)
    }

    /// Number of [`read_scanlines`](TextureInput::read_scanlines) calls served.
    pub fn scanline_reads(&self) -> usize {
        self.scanline_reads.load(Ordering::Relaxed)
    }

    fn subimage(&self, subimage: usize) -> TexResult<&MemorySubimage> {
        self.subimages.get(subimage).ok_or_else(|| {
            TextureError::Format(format!(
                "{}: subimage {} of {}",
                self.path.display(),
                subimage,
                self.subimages.len()
            ))
        })
    }
}

impl TextureInput for MemoryTexture {
    fn path(&self) -> &Path {
        &self.path
    }

    fn num_subimages(&self) -> usize {
        self.subimages.len()
    }

    fn header(&self, subimage: usize) -> TexResult<&TextureHeader> {
        Ok(&self.subimage(subimage)?.header)
    }

    fn read_tile(&self, subimage: usize, tile_x: u32, tile_y: u32) -> TexResult<Vec<u8>> {
        let sub = self.subimage(subimage)?;
        let header = &sub.header;
        let (tw, th) = header
            .tile
            .ok_or_else(|| TextureError::Format(format!("{}: subimage {} is not tiled", self.path.display(), subimage)))?;
        if tile_x >= header.tiles_x() || tile_y >= header.tiles_y() {
            return Err(TextureError::Format(format!(
                "{}: tile ({}, {}) outside {}x{} tile grid",
                self.path.display(),
                tile_x,
                tile_y,
                header.tiles_x(),
                header.tiles_y()
            )));
        }
        self.tile_reads.fetch_add(1, Ordering::Relaxed);

        let bpp = header.bytes_per_pixel();
        let x0 = tile_x * tw;
        let y0 = tile_y * th;
        let copy_w = tw.min(header.width - x0) as usize;
        let copy_h = th.min(header.height - y0);
        let src_stride = header.width as usize * bpp;
        let dst_stride = tw as usize * bpp;

        let mut out = vec![0u8; header.tile_bytes()];
        for row in 0..copy_h {
            let src = (y0 + row) as usize * src_stride + x0 as usize * bpp;
            let dst = row as usize * dst_stride;
            out[dst..dst + copy_w * bpp].copy_from_slice(&sub.data[src..src + copy_w * bpp]);
        }
        Ok(out)
    }

    fn read_scanlines(&self, subimage: usize, y_begin: u32, y_end: u32) -> TexResult<Vec<u8>> {
        let sub = self.subimage(subimage)?;
        let header = &sub.header;
        if y_begin > y_end || y_end > header.height {
            return Err(TextureError::Format(format!(
                "{}: scanlines [{}, {}) outside height {}",
                self.path.display(),
                y_begin,
                y_end,
                header.height
            )));
        }
        self.scanline_reads.fetch_add(1, Ordering::Relaxed);
        let stride = header.width as usize * header.bytes_per_pixel();
        Ok(sub.data[y_begin as usize * stride..y_end as usize * stride].to_vec())
    }
}

/// Builder for [`MemoryTexture`].
///
/// Storage format, tiling and attributes apply to every level added after
/// they are set; attributes end up on every subimage header.
#[derive(Debug)]
pub struct MemoryTextureBuilder {
    path: PathBuf,
    format: DataFormat,
    tile: Option<(u32, u32)>,
    attrs: Attrs,
    levels: Vec<(TextureHeader, Vec<u8>)>,
    error: Option<String>,
}

impl MemoryTextureBuilder {
    /// Creates a builder; defaults to untiled `u8` storage.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: DataFormat::U8,
            tile: None,
            attrs: Attrs::new(),
            levels: Vec::new(),
            error: None,
        }
    }

    /// Storage format of subsequent levels.
    pub fn format(mut self, format: DataFormat) -> Self {
        self.format = format;
        self
    }

    /// Tile size of subsequent levels.
    pub fn tiled(mut self, tile_width: u32, tile_height: u32) -> Self {
        self.tile = Some((tile_width, tile_height));
        self
    }

    /// Scanline storage for subsequent levels.
    pub fn scanline(mut self) -> Self {
        self.tile = None;
        self
    }

    /// Adds a texture attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.set(key, value);
        self
    }

    /// Appends a level from logical float values, converted to the current
    /// storage format.
    pub fn level(self, width: u32, height: u32, channels: u32, values: &[f32]) -> Self {
        let bytes = match self.format {
            DataFormat::U8 => encode_f32::<u8>(values),
            DataFormat::U16 => encode_f32::<u16>(values),
            DataFormat::U32 => encode_f32::<u32>(values),
            DataFormat::F16 => encode_f32::<f16>(values),
            DataFormat::F32 => encode_f32::<f32>(values),
        };
        self.level_raw(width, height, channels, bytes)
    }

    /// Appends a level from raw little-endian bytes in the current format.
    pub fn level_raw(mut self, width: u32, height: u32, channels: u32, bytes: Vec<u8>) -> Self {
        let header = TextureHeader {
            width,
            height,
            channels,
            format: self.format,
            tile: self.tile,
            attrs: Attrs::new(),
        };
        let expected = width as usize * height as usize * header.bytes_per_pixel();
        if bytes.len() != expected && self.error.is_none() {
            self.error = Some(format!(
                "level {}: {} bytes supplied, {}x{}x{} {} needs {}",
                self.levels.len(),
                bytes.len(),
                width,
                height,
                channels,
                self.format,
                expected
            ));
        }
        if matches!(self.tile, Some((0, _)) | Some((_, 0))) && self.error.is_none() {
            self.error = Some(format!("level {}: zero tile size", self.levels.len()));
        }
        self.levels.push((header, bytes));
        self
    }

    /// Finishes the texture.
    ///
    /// # Errors
    ///
    /// [`TextureError::Format`] if any level's data does not match its size.
    pub fn build(self) -> TexResult<MemoryTexture> {
        if let Some(msg) = self.error {
            return Err(TextureError::Format(format!("{}: {}", self.path.display(), msg)));
        }
        let attrs = self.attrs;
        let subimages = self
            .levels
            .into_iter()
            .map(|(mut header, data)| {
                header.attrs = attrs.clone();
                MemorySubimage { header, data }
            })
            .collect();
        Ok(MemoryTexture {
            path: self.path,
            subimages,
            tile_reads: AtomicUsize::new(0),
            scanline_reads: AtomicUsize::new(0),
        })
    }
}

fn encode_f32<T: PixelFormat>(values: &[f32]) -> Vec<u8> {
    let stored: Vec<T> = values.iter().map(|&v| T::from_f32(v)).collect();
    encode_le(&stored)
}

/// Path-keyed registry of in-memory textures.
#[derive(Default)]
pub struct MemoryOpener {
    textures: RwLock<HashMap<PathBuf, Arc<MemoryTexture>>>,
    opens: AtomicUsize,
}

impl MemoryOpener {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a texture under its own path, returning the shared handle.
    pub fn insert(&self, texture: MemoryTexture) -> Arc<MemoryTexture> {
        let texture = Arc::new(texture);
        self.textures
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(texture.path().to_path_buf(), Arc::clone(&texture));
        texture
    }

    /// Number of successful or failed [`open`](TextureOpener::open) calls.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }
}

impl TextureOpener for MemoryOpener {
    fn open(&self, path: &Path) -> TexResult<Arc<dyn TextureInput>> {
        self.opens.fetch_add(1, Ordering::Relaxed);
        let textures = self.textures.read().unwrap_or_else(|e| e.into_inner());
        match textures.get(path) {
            Some(texture) => Ok(Arc::clone(texture) as Arc<dyn TextureInput>),
            None => Err(TextureError::NotFound(path.to_path_buf())),
        }
    }
}
