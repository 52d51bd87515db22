//! # mipcache
//!
//! Texture sampling and tile caching for offline rendering.
//!
//! Render threads filter mipmapped textures, shadow maps and environment
//! maps over arbitrary footprints. Tiles are read from the file the first
//! time a lookup touches them and are then shared, read-only, by every
//! thread for the rest of the session.
//!
//! # Architecture
//!
//! ```text
//! TextureSystem            path -> sampler registry, dummy fallback
//!   |
//!   +-- sampler::{texture, shadow, environment}
//!   |     footprint -> level selection -> wrap split -> filtered iteration
//!   |
//!   +-- MipmapLevelCache   levels built on first use
//!         |
//!         +-- MipLevel::Tiled(TileArray)    tiles fetched on first use
//!         +-- MipLevel::Flat(TextureBuffer) whole level read at once
//! ```
//!
//! Storage is monomorphized over the channel type ([`PixelFormat`]: u8,
//! u16, u32, f16, f32); the sampler factories pick the instantiation from
//! the file header and hand back trait objects.
//!
//! # Iteration
//!
//! Filtering walks a rectangular [`Support`] through a [`SampleIterator`],
//! either every pixel or a fixed number of low-discrepancy picks drawn from
//! the shared [`RandomOffsetTable`]. The same protocol runs over a plain
//! buffer, a tile array, or a mip level.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use mipcache::footprint::SampleQuad;
//! use mipcache::input::{MemoryOpener, MemoryTexture};
//! use mipcache::TextureSystem;
//!
//! let opener = Arc::new(MemoryOpener::new());
//! opener.insert(
//!     MemoryTexture::builder("grey.tex")
//!         .tiled(16, 16)
//!         .level(32, 32, 1, &vec![0.5; 32 * 32])
//!         .build()
//!         .unwrap(),
//! );
//!
//! let system = TextureSystem::new(opener);
//! let sampler = system.texture_sampler("grey.tex");
//! let opts = sampler.default_sample_options();
//! let mut out = [0.0f32; 1];
//! sampler.sample(&SampleQuad::point(0.5, 0.5, 0.1), &opts, &mut out).unwrap();
//! assert!((out[0] - 0.5).abs() < 0.01);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attrs;
pub mod buffer;
pub mod error;
pub mod filter;
pub mod footprint;
pub mod input;
pub mod iter;
pub mod level;
pub mod mipmap;
pub mod options;
pub mod partition;
pub mod random;
pub mod sample;
pub mod sampler;
pub mod slot;
pub mod system;
pub mod tile;
pub mod tile_array;
pub mod wrap;

pub use attrs::{AttrValue, Attrs};
pub use buffer::TextureBuffer;
pub use error::{TexResult, TextureError};
pub use footprint::{DirectionQuad, Parallelogram, SampleQuad, ShadowQuad};
pub use input::{TextureHeader, TextureInput, TextureOpener};
pub use iter::SampleIterator;
pub use level::{LevelIter, MipLevel};
pub use mipmap::{LevelTransform, MipmapLevelCache};
pub use options::{FilterType, SampleOptions, WrapMode};
pub use partition::AreaPartition;
pub use random::RandomOffsetTable;
pub use sample::SampleVector;
pub use sampler::{EnvironmentSampler, ShadowSampler, TextureSampler};
pub use slot::{LazySlot, SlotState};
pub use system::TextureSystem;
pub use tile::TextureTile;
pub use tile_array::{TileArray, TileStats};

pub use mipcache_core::{ChannelLayout, DataFormat, FloatFormat, PixelFormat, Support};
