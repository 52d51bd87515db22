//! Error types for mipcache-core operations.
//!
//! These cover caller-contract violations on in-memory buffers: indexing
//! outside a raster, re-laying-out a buffer with an incompatible storage
//! type, and adopting raw data of the wrong length.
//!
//! ```rust
//! use mipcache_core::{Error, Result};
//!
//! fn check(x: u32, y: u32, width: u32, height: u32) -> Result<()> {
//!     if x >= width || y >= height {
//!         return Err(Error::out_of_bounds(x as i64, y as i64, width, height));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(3, 9, 4, 4).unwrap_err().is_bounds_error());
//! ```

use thiserror::Error;

use crate::format::{ChannelLayout, DataFormat};

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by texture buffers.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel coordinates are outside the raster.
    #[error("pixel ({x}, {y}) out of bounds for raster {width}x{height}")]
    OutOfBounds {
        /// X coordinate that was out of bounds
        x: i64,
        /// Y coordinate that was out of bounds
        y: i64,
        /// Raster width
        width: u32,
        /// Raster height
        height: u32,
    },

    /// A channel layout does not match the buffer's storage type.
    #[error("type mismatch: buffer stores {expected}, layout requests {got}")]
    TypeMismatch {
        /// Storage type of the buffer
        expected: DataFormat,
        /// Layout that was requested
        got: ChannelLayout,
    },

    /// Raw data length does not match the declared dimensions.
    #[error("data size mismatch: expected {expected} values, got {got}")]
    DataSize {
        /// Values required by width * height * channels
        expected: usize,
        /// Values supplied
        got: usize,
    },

    /// Dimensions cannot be represented.
    #[error("invalid dimensions: {width}x{height}x{channels} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Requested channel count
        channels: u32,
        /// Why the dimensions are rejected
        reason: String,
    },
}

impl Error {
    /// Creates an [`Error::OutOfBounds`] error.
    #[inline]
    pub fn out_of_bounds(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an [`Error::TypeMismatch`] error.
    #[inline]
    pub fn type_mismatch(expected: DataFormat, got: ChannelLayout) -> Self {
        Self::TypeMismatch { expected, got }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, channels: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            channels,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a bounds error.
    #[inline]
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }

    /// Returns `true` if this is a type mismatch.
    #[inline]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds() {
        let err = Error::out_of_bounds(100, -1, 80, 60);
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("-1"));
        assert!(msg.contains("80x60"));
        assert!(err.is_bounds_error());
    }

    #[test]
    fn test_type_mismatch() {
        let err = Error::type_mismatch(DataFormat::U8, ChannelLayout::new(3, DataFormat::F32));
        assert!(err.is_type_mismatch());
        assert!(err.to_string().contains("3xf32"));
    }
}
