//! Channel storage types.
//!
//! [`PixelFormat`] is the capability every in-memory texture buffer is
//! parameterized over: read a stored channel as a float, write a float into
//! storage, and decode the little-endian bytes a texture file hands back.
//!
//! # Normalization
//!
//! - Integer types: logical value = `raw / MAX`. Writes clamp to `[0, 1]`
//!   and round to the nearest step, so a write-then-read round trip is off
//!   by at most `1 / (2 * MAX)`.
//! - Float types: the logical value is the raw value.
//!
//! ```
//! use mipcache_core::PixelFormat;
//!
//! let byte: u8 = PixelFormat::from_f32(0.5);
//! assert_eq!(byte, 128);
//! assert!((byte.to_f32() - 0.50196).abs() < 1e-4);
//!
//! // Out-of-range writes clamp.
//! let clamped: u16 = PixelFormat::from_f32(1.7);
//! assert_eq!(clamped, u16::MAX);
//! ```
//!
//! # Dependencies
//!
//! - `half` for `f16`
//! - `byteorder` for little-endian decoding

use byteorder::{ByteOrder, LittleEndian};
use half::f16;

use crate::format::DataFormat;

/// Storage type of a texture channel.
///
/// Implemented for `u8`, `u16`, `u32`, `f16` and `f32`. The set is closed:
/// texture headers report one of the [`DataFormat`] variants and each maps
/// to exactly one implementor.
pub trait PixelFormat: Copy + Default + Send + Sync + PartialOrd + std::fmt::Debug + 'static {
    /// Runtime tag for this storage type.
    const FORMAT: DataFormat;

    /// Whether this is a floating-point format.
    const IS_FLOAT: bool;

    /// Maximum raw value, as the normalization divisor for integers.
    ///
    /// Float formats report their largest finite value.
    const MAX_VALUE: f64;

    /// Size of one stored channel in bytes.
    const BYTES: usize;

    /// Converts a stored value to its logical float value.
    fn to_f32(self) -> f32;

    /// Converts a logical float into storage, clamping integers to `[0, 1]`.
    fn from_f32(v: f32) -> Self;

    /// Decodes one little-endian value from the front of `bytes`.
    ///
    /// `bytes` must hold at least [`Self::BYTES`](PixelFormat::BYTES) bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encodes the value little-endian into the front of `out`.
    fn write_le(self, out: &mut [u8]);
}

impl PixelFormat for u8 {
    const FORMAT: DataFormat = DataFormat::U8;
    const IS_FLOAT: bool = false;
    const MAX_VALUE: f64 = u8::MAX as f64;
    const BYTES: usize = 1;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 255.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out[0] = self;
    }
}

impl PixelFormat for u16 {
    const FORMAT: DataFormat = DataFormat::U16;
    const IS_FLOAT: bool = false;
    const MAX_VALUE: f64 = u16::MAX as f64;
    const BYTES: usize = 2;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 65535.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 65535.0).round() as u16
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_u16(bytes)
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        LittleEndian::write_u16(out, self);
    }
}

impl PixelFormat for u32 {
    const FORMAT: DataFormat = DataFormat::U32;
    const IS_FLOAT: bool = false;
    const MAX_VALUE: f64 = u32::MAX as f64;
    const BYTES: usize = 4;

    // f32 has 24 bits of mantissa; go through f64 so neither direction
    // loses more than the final f32 rounding.
    #[inline]
    fn to_f32(self) -> f32 {
        (self as f64 / Self::MAX_VALUE) as f32
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (f64::from(v.clamp(0.0, 1.0)) * Self::MAX_VALUE).round() as u32
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_u32(bytes)
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        LittleEndian::write_u32(out, self);
    }
}

impl PixelFormat for f16 {
    const FORMAT: DataFormat = DataFormat::F16;
    const IS_FLOAT: bool = true;
    const MAX_VALUE: f64 = 65504.0;
    const BYTES: usize = 2;

    #[inline]
    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        f16::from_f32(v)
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        f16::from_bits(LittleEndian::read_u16(bytes))
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        LittleEndian::write_u16(out, self.to_bits());
    }
}

impl PixelFormat for f32 {
    const FORMAT: DataFormat = DataFormat::F32;
    const IS_FLOAT: bool = true;
    const MAX_VALUE: f64 = f32::MAX as f64;
    const BYTES: usize = 4;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_f32(bytes)
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        LittleEndian::write_f32(out, self);
    }
}

/// Float storage types, the only ones a depth map may use.
pub trait FloatFormat: PixelFormat {}

impl FloatFormat for f16 {}
impl FloatFormat for f32 {}

/// Decodes a little-endian byte block into storage values.
///
/// Trailing bytes that do not form a whole value are ignored.
pub fn decode_le<T: PixelFormat>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::BYTES).map(T::read_le).collect()
}

/// Encodes storage values as a little-endian byte block.
pub fn encode_le<T: PixelFormat>(values: &[T]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * T::BYTES];
    for (chunk, v) in bytes.chunks_exact_mut(T::BYTES).zip(values) {
        (*v).write_le(chunk);
    }
    bytes
}
