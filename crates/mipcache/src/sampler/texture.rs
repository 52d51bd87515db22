//! Plain filtered texture lookups.

use std::sync::Arc;

use mipcache_core::PixelFormat;
use tracing::info;

use super::lookup::{filtered_lookup, ColorAccumulator, Domain};
use super::{base_format, output_len};
use crate::error::TexResult;
use crate::footprint::{Parallelogram, SampleQuad};
use crate::input::TextureInput;
use crate::mipmap::MipmapLevelCache;
use crate::options::SampleOptions;
use crate::random::RandomOffsetTable;

/// Filtered colour lookups.
pub trait TextureSampler: Send + Sync {
    /// Filters the texture over `quad` (texture coordinates) and writes
    /// `opts.num_channels` values, or as many as fit, into `out`.
    ///
    /// # Errors
    ///
    /// Tile read failures on the open file.
    fn sample(&self, quad: &SampleQuad, opts: &SampleOptions, out: &mut [f32]) -> TexResult<()>;

    /// Options derived from the texture's attributes.
    fn default_sample_options(&self) -> SampleOptions;

    /// Whether this sampler stands in for a missing texture.
    fn is_dummy(&self) -> bool {
        false
    }
}

struct MipmapTextureSampler<T: PixelFormat> {
    cache: MipmapLevelCache<T>,
    table: Arc<RandomOffsetTable>,
}

impl<T: PixelFormat> TextureSampler for MipmapTextureSampler<T> {
    fn sample(&self, quad: &SampleQuad, opts: &SampleOptions, out: &mut [f32]) -> TexResult<()> {
        let n = output_len(opts, out);
        let footprint = Parallelogram::from_quad(quad)
            .reduce_periods(opts.s_wrap.period(1.0), opts.t_wrap.period(1.0))
            .to_raster(self.cache.width(), self.cache.height());
        let mut acc = ColorAccumulator::new(opts.start_channel, opts.num_channels, self.cache.channels());
        let domain = Domain::Image {
            s_wrap: opts.s_wrap,
            t_wrap: opts.t_wrap,
        };
        let coverage = filtered_lookup(&self.cache, &self.table, &footprint, opts, domain, &mut acc)?;
        acc.finish(coverage, opts.fill, &mut out[..n]);
        Ok(())
    }

    fn default_sample_options(&self) -> SampleOptions {
        self.cache.default_sample_options()
    }
}

/// Opens a texture sampler over `input`.
///
/// # Errors
///
/// [`TextureError::BadTexture`](crate::TextureError::BadTexture) if the
/// file has no usable level 0.
pub fn create(input: Arc<dyn TextureInput>, table: Arc<RandomOffsetTable>) -> TexResult<Arc<dyn TextureSampler>> {
    let format = base_format(input.as_ref())?;
    let sampler: Arc<dyn TextureSampler> = with_format!(format, T => {
        let cache = MipmapLevelCache::<T>::new(input)?;
        info!(
            path = %cache.path().display(),
            format = %format,
            levels = cache.num_levels(),
            "created texture sampler"
        );
        Arc::new(MipmapTextureSampler { cache, table })
    });
    Ok(sampler)
}

struct DummyTextureSampler;

impl TextureSampler for DummyTextureSampler {
    fn sample(&self, _quad: &SampleQuad, opts: &SampleOptions, out: &mut [f32]) -> TexResult<()> {
        let n = output_len(opts, out);
        out[..n].fill(opts.fill);
        Ok(())
    }

    fn default_sample_options(&self) -> SampleOptions {
        SampleOptions::default()
    }

    fn is_dummy(&self) -> bool {
        true
    }
}

/// Sampler that writes `opts.fill` without reading anything.
pub fn create_dummy() -> Arc<dyn TextureSampler> {
    Arc::new(DummyTextureSampler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MemoryTexture;
    use crate::options::WrapMode;
    use approx::assert_abs_diff_eq;
    use mipcache_core::DataFormat;

    fn gradient(format: DataFormat) -> Arc<dyn TextureInput> {
        let values: Vec<f32> = (0..16 * 16).flat_map(|i| [(i % 16) as f32 / 15.0, 0.5]).collect();
        Arc::new(MemoryTexture::builder("g.tex").format(format).tiled(8, 8).level(16, 16, 2, &values).build().unwrap())
    }

    #[test]
    fn test_sample_every_format() {
        let table = Arc::new(RandomOffsetTable::new());
        for format in [DataFormat::U8, DataFormat::U16, DataFormat::U32, DataFormat::F16, DataFormat::F32] {
            let sampler = create(gradient(format), table.clone()).unwrap();
            let opts = sampler.default_sample_options();
            assert_eq!(opts.num_channels, 2);
            let mut out = [0.0; 2];
            sampler.sample(&SampleQuad::point(15.5 / 16.0, 0.5, 0.0), &opts, &mut out).unwrap();
            assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-2);
            assert_abs_diff_eq!(out[1], 0.5, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_channel_window() {
        let sampler = create(gradient(DataFormat::F32), Arc::new(RandomOffsetTable::new())).unwrap();
        let opts = SampleOptions {
            fill: -1.0,
            ..SampleOptions::default().with_channels(1, 3)
        };
        let mut out = [0.0; 3];
        sampler.sample(&SampleQuad::point(0.5, 0.5, 0.0), &opts, &mut out).unwrap();
        assert_eq!(out, [0.5, -1.0, -1.0]);
    }

    #[test]
    fn test_periodic_wrap_reaches_other_side() {
        let sampler = create(gradient(DataFormat::F32), Arc::new(RandomOffsetTable::new())).unwrap();
        let opts = SampleOptions::default().with_wrap(WrapMode::Periodic, WrapMode::Periodic);
        let mut out = [0.0; 1];
        // s = 1 + half a pixel wraps onto column 0.
        sampler.sample(&SampleQuad::point(1.0 + 0.5 / 16.0, 0.5, 0.0), &opts, &mut out).unwrap();
        assert_abs_diff_eq!(out[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_periodic_far_from_origin() {
        // Each texel stores its column.
        let values: Vec<f32> = (0..4096 * 2).map(|i| (i % 4096) as f32).collect();
        let tex = MemoryTexture::builder("wide.tex")
            .format(DataFormat::F32)
            .tiled(256, 2)
            .level(4096, 2, 1, &values)
            .build()
            .unwrap();
        let sampler = create(Arc::new(tex), Arc::new(RandomOffsetTable::new())).unwrap();
        let opts = SampleOptions::default().with_wrap(WrapMode::Periodic, WrapMode::Periodic);
        let mut out = [0.0];

        // s = 0.25 lands between columns 1023 and 1024 in every repeat.
        for s in [600_000.25f32, -600_000.75, 0.25] {
            sampler.sample(&SampleQuad::point(s, 0.25, 0.0), &opts, &mut out).unwrap();
            assert_abs_diff_eq!(out[0], 1023.5, epsilon = 1e-3);
        }

        // A footprint wider than the i32 raster range still resolves.
        sampler.sample(&SampleQuad::point(0.5, 0.5, 1.0e7), &opts, &mut out).unwrap();
        assert!(out[0].is_finite());
    }

    #[test]
    fn test_dummy() {
        let dummy = create_dummy();
        assert!(dummy.is_dummy());
        let opts = SampleOptions {
            fill: 0.25,
            ..SampleOptions::default().with_channels(0, 3)
        };
        let mut out = [9.0; 4];
        dummy.sample(&SampleQuad::point(0.5, 0.5, 0.1), &opts, &mut out).unwrap();
        assert_eq!(out, [0.25, 0.25, 0.25, 9.0]);
    }
}
