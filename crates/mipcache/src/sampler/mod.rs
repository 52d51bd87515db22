//! Public sampling surface.
//!
//! Each capability is a trait object shared across render threads:
//!
//! - [`TextureSampler`] - filtered colour lookups over a [`SampleQuad`]
//! - [`ShadowSampler`] - percentage-closer occlusion over a [`ShadowQuad`]
//! - [`EnvironmentSampler`] - lat-long or cube-face lookups over a
//!   [`DirectionQuad`]
//!
//! Every module has a `create` factory that inspects the file's storage
//! type and instantiates the matching monomorphized sampler, plus a
//! `create_dummy` that returns a neutral value without touching any file.
//!
//! [`SampleQuad`]: crate::footprint::SampleQuad
//! [`ShadowQuad`]: crate::footprint::ShadowQuad
//! [`DirectionQuad`]: crate::footprint::DirectionQuad

use mipcache_core::DataFormat;

use crate::error::{TexResult, TextureError};
use crate::input::TextureInput;
use crate::options::SampleOptions;

/// Instantiates `$body` with `$t` bound to the storage type of `$format`.
macro_rules! with_format {
    ($format:expr, $t:ident => $body:expr) => {
        match $format {
            mipcache_core::DataFormat::U8 => {
                type $t = u8;
                $body
            }
            mipcache_core::DataFormat::U16 => {
                type $t = u16;
                $body
            }
            mipcache_core::DataFormat::U32 => {
                type $t = u32;
                $body
            }
            mipcache_core::DataFormat::F16 => {
                type $t = mipcache_core::f16;
                $body
            }
            mipcache_core::DataFormat::F32 => {
                type $t = f32;
                $body
            }
        }
    };
}

pub mod environment;
pub(crate) mod lookup;
pub mod shadow;
pub mod texture;

pub use environment::EnvironmentSampler;
pub use shadow::ShadowSampler;
pub use texture::TextureSampler;

/// Storage type of level 0 of `input`.
pub(crate) fn base_format(input: &dyn TextureInput) -> TexResult<DataFormat> {
    if input.num_subimages() == 0 {
        return Err(TextureError::BadTexture(format!("{}: no subimages", input.path().display())));
    }
    Ok(input.header(0)?.format)
}

/// Number of output channels a lookup writes.
#[inline]
pub(crate) fn output_len(opts: &SampleOptions, out: &[f32]) -> usize {
    (opts.num_channels as usize).min(out.len())
}
