//! Shadow-map lookups.
//!
//! A shadow map stores, per pixel, the depth of the nearest occluder as
//! seen from the light. A lookup compares the receiver's depth against the
//! stored depths over the footprint and returns the weighted fraction that
//! is occluded: 0 is fully lit, 1 fully in shadow, values in between give
//! soft edges.

use std::sync::Arc;

use mipcache_core::{DataFormat, FloatFormat};
use tracing::info;

use super::base_format;
use super::lookup::{filtered_lookup, DepthAccumulator, Domain};
use crate::error::{TexResult, TextureError};
use crate::footprint::{Parallelogram, ShadowQuad};
use crate::input::TextureInput;
use crate::mipmap::MipmapLevelCache;
use crate::options::SampleOptions;
use crate::random::RandomOffsetTable;

/// Percentage-closer shadow lookups.
pub trait ShadowSampler: Send + Sync {
    /// Writes the occlusion over `quad` into `out[0]`.
    ///
    /// Depth comparisons use `opts.bias`. Nothing is written if `out` is
    /// empty.
    ///
    /// # Errors
    ///
    /// Tile read failures on the open file.
    fn sample(&self, quad: &ShadowQuad, opts: &SampleOptions, out: &mut [f32]) -> TexResult<()>;

    /// Options derived from the map's attributes.
    fn default_sample_options(&self) -> SampleOptions;

    /// Whether this sampler stands in for a missing map.
    fn is_dummy(&self) -> bool {
        false
    }
}

struct MipmapShadowSampler<T: FloatFormat> {
    cache: MipmapLevelCache<T>,
    table: Arc<RandomOffsetTable>,
}

impl<T: FloatFormat> ShadowSampler for MipmapShadowSampler<T> {
    fn sample(&self, quad: &ShadowQuad, opts: &SampleOptions, out: &mut [f32]) -> TexResult<()> {
        let footprint = Parallelogram::from_quad(&quad.quad)
            .reduce_periods(opts.s_wrap.period(1.0), opts.t_wrap.period(1.0))
            .to_raster(self.cache.width(), self.cache.height());
        let mut acc = DepthAccumulator::new(quad.depth_gradient(), opts.bias);
        let domain = Domain::Image {
            s_wrap: opts.s_wrap,
            t_wrap: opts.t_wrap,
        };
        let coverage = filtered_lookup(&self.cache, &self.table, &footprint, opts, domain, &mut acc)?;
        if let Some(slot) = out.first_mut() {
            *slot = acc.finish(coverage);
        }
        Ok(())
    }

    fn default_sample_options(&self) -> SampleOptions {
        SampleOptions {
            num_channels: 1,
            ..self.cache.default_sample_options()
        }
    }
}

fn open<T: FloatFormat>(input: Arc<dyn TextureInput>, table: Arc<RandomOffsetTable>) -> TexResult<Arc<dyn ShadowSampler>> {
    let cache = MipmapLevelCache::<T>::new(input)?;
    info!(
        path = %cache.path().display(),
        format = %T::FORMAT,
        levels = cache.num_levels(),
        "created shadow sampler"
    );
    Ok(Arc::new(MipmapShadowSampler { cache, table }))
}

/// Opens a shadow sampler over `input`.
///
/// # Errors
///
/// [`TextureError::BadTexture`] unless level 0 stores floating-point
/// depth.
pub fn create(input: Arc<dyn TextureInput>, table: Arc<RandomOffsetTable>) -> TexResult<Arc<dyn ShadowSampler>> {
    match base_format(input.as_ref())? {
        DataFormat::F16 => open::<mipcache_core::f16>(input, table),
        DataFormat::F32 => open::<f32>(input, table),
        other => Err(TextureError::BadTexture(format!(
            "{}: shadow maps need floating-point depth, found {}",
            input.path().display(),
            other
        ))),
    }
}

struct DummyShadowSampler;

impl ShadowSampler for DummyShadowSampler {
    fn sample(&self, _quad: &ShadowQuad, _opts: &SampleOptions, out: &mut [f32]) -> TexResult<()> {
        if let Some(slot) = out.first_mut() {
            *slot = 0.0;
        }
        Ok(())
    }

    fn default_sample_options(&self) -> SampleOptions {
        SampleOptions::default()
    }

    fn is_dummy(&self) -> bool {
        true
    }
}

/// Sampler that reports every point as fully lit.
pub fn create_dummy() -> Arc<dyn ShadowSampler> {
    Arc::new(DummyShadowSampler)
}
