//! # mipcache-core
//!
//! Storage-type layer for the mipcache texture engine.
//!
//! - [`DataFormat`], [`ChannelLayout`] - runtime description of channel storage
//! - [`PixelFormat`] - compile-time storage capability (u8, u16, u32, f16, f32)
//! - [`Support`] - half-open pixel box used as a filter support
//! - [`Error`], [`Result`] - buffer contract violations
//!
//! ## Crate Structure
//!
//! ```text
//! mipcache-core (this crate)
//!    ^
//!    |
//!    +-- mipcache (buffers, tiles, mip levels, samplers)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod format;
pub mod pixel;
pub mod rect;

pub use error::{Error, Result};
pub use format::{ChannelLayout, DataFormat};
pub use pixel::{decode_le, encode_le, FloatFormat, PixelFormat};
pub use rect::Support;

/// Re-export of the half-precision float type.
pub use half::f16;
