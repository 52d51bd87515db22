//! Error types for texture sampling.
//!
//! Construction-time failures (missing file, wrong data for the requested
//! sampler) are meant to be caught by the caller, which usually swaps in a
//! dummy sampler. Failures on an already-open texture, such as a tile that
//! cannot be read mid-render, propagate out of `sample()`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Texture engine error.
#[derive(Debug, Error)]
pub enum TextureError {
    /// The texture exists but cannot serve the requested kind of lookup,
    /// e.g. integer data opened as a shadow map.
    #[error("bad texture: {0}")]
    BadTexture(String),

    /// No texture is registered or present at the path.
    #[error("texture not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Tile or scanline data is malformed.
    #[error("format error: {0}")]
    Format(String),

    /// Mip level outside `[0, num_levels)`.
    #[error("mip level {level} out of range (texture has {num_levels} levels)")]
    InvalidLevel {
        /// Requested level
        level: usize,
        /// Number of levels in the texture
        num_levels: usize,
    },

    /// Buffer contract violation.
    #[error(transparent)]
    Core(#[from] mipcache_core::Error),
}

impl TextureError {
    /// Returns `true` for errors a caller should answer with a dummy sampler.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BadTexture(_) | Self::NotFound(_) | Self::Io(_))
    }
}

/// Result type for texture operations.
pub type TexResult<T> = Result<T, TextureError>;
