//! Runtime channel storage formats.
//!
//! Texture files carry one of a closed set of channel storage types. The
//! header of a file reports it as a [`DataFormat`]; in-memory buffers are
//! parameterized over the matching Rust type through
//! [`PixelFormat`](crate::pixel::PixelFormat).
//!
//! # Usage
//!
//! ```rust
//! use mipcache_core::format::{ChannelLayout, DataFormat};
//!
//! let layout = ChannelLayout::new(3, DataFormat::U8);
//! assert_eq!(layout.bytes_per_pixel(), 3);
//! assert!(DataFormat::F16.is_float());
//! ```

/// Channel storage type of texture data.
///
/// Integer formats hold normalized values (`raw / MAX`), float formats hold
/// their value unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    /// 8-bit unsigned integer.
    #[default]
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float.
    F32,
}

impl DataFormat {
    /// Number of bytes per channel.
    #[inline]
    pub const fn bytes_per_channel(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::F16 => 2,
            Self::F32 => 4,
        }
    }

    /// Whether this is a floating-point format.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    /// Short name for display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::F16 => "f16",
            Self::F32 => "f32",
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Channel count plus storage type of one pixel.
///
/// Used when re-laying-out a buffer: the storage type of a
/// [`TextureBuffer`](https://docs.rs/mipcache) is fixed at compile time, so only
/// the channel count may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelLayout {
    /// Number of channels per pixel.
    pub channels: u32,
    /// Storage type of each channel.
    pub format: DataFormat,
}

impl ChannelLayout {
    /// Creates a layout.
    #[inline]
    pub const fn new(channels: u32, format: DataFormat) -> Self {
        Self { channels, format }
    }

    /// Bytes occupied by one pixel.
    #[inline]
    pub const fn bytes_per_pixel(&self) -> usize {
        self.channels as usize * self.format.bytes_per_channel()
    }
}

impl std::fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.channels, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_channel() {
        assert_eq!(DataFormat::U8.bytes_per_channel(), 1);
        assert_eq!(DataFormat::U16.bytes_per_channel(), 2);
        assert_eq!(DataFormat::U32.bytes_per_channel(), 4);
        assert_eq!(DataFormat::F16.bytes_per_channel(), 2);
        assert_eq!(DataFormat::F32.bytes_per_channel(), 4);
    }

    #[test]
    fn test_is_float() {
        assert!(!DataFormat::U8.is_float());
        assert!(!DataFormat::U32.is_float());
        assert!(DataFormat::F16.is_float());
        assert!(DataFormat::F32.is_float());
    }

    #[test]
    fn test_layout_display() {
        let layout = ChannelLayout::new(4, DataFormat::F16);
        assert_eq!(layout.to_string(), "4xf16");
        assert_eq!(layout.bytes_per_pixel(), 8);
    }
}
