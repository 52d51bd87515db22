//! Filtered lookup shared by all samplers.
//!
//! A lookup takes a footprint in level-0 raster space and:
//!
//! 1. widens it by the option multipliers and blur, and to at least one
//!    pixel across,
//! 2. picks a single mip level from the footprint's minor width,
//! 3. maps the footprint into that level and splits its bounding support
//!    by the wrap modes,
//! 4. walks every pixel of the pieces, or a stochastic subset once the
//!    support is larger than the sample budget,
//! 5. hands each pixel and its kernel weight to an [`Accumulator`].

use mipcache_core::{PixelFormat, Support};
use smallvec::{smallvec, SmallVec};

use crate::error::TexResult;
use crate::filter::FilterKernel;
use crate::footprint::Parallelogram;
use crate::iter::SampleIterator;
use crate::mipmap::MipmapLevelCache;
use crate::options::{SampleOptions, WrapMode};
use crate::partition::AreaPartition;
use crate::random::RandomOffsetTable;
use crate::sample::SampleVector;
use crate::wrap::split_support;

/// Smallest footprint half-width, in pixels of the sampled level.
const MIN_RADIUS: f32 = 0.5;

/// Where a lookup is allowed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Domain {
    /// The whole image, wrapped per axis.
    Image {
        s_wrap: WrapMode,
        t_wrap: WrapMode,
    },
    /// One cell of a `columns x rows` grid of faces, clamped at its edges.
    /// Only levels up to `max_level` split evenly into the grid.
    Face {
        column: u32,
        row: u32,
        columns: u32,
        rows: u32,
        max_level: usize,
    },
}

impl Domain {
    fn max_level(&self) -> usize {
        match *self {
            Domain::Image { .. } => usize::MAX,
            Domain::Face { max_level, .. } => max_level,
        }
    }

    fn resolve(&self, width: u32, height: u32) -> (Support, WrapMode, WrapMode) {
        match *self {
            Domain::Image { s_wrap, t_wrap } => (Support::from_size(width, height), s_wrap, t_wrap),
            Domain::Face {
                column,
                row,
                columns,
                rows,
                ..
            } => {
                let x0 = (column * width / columns) as i32;
                let x1 = ((column + 1) * width / columns) as i32;
                let y0 = (row * height / rows) as i32;
                let y1 = ((row + 1) * height / rows) as i32;
                (Support::new(x0, x1, y0, y1), WrapMode::Clamp, WrapMode::Clamp)
            }
        }
    }
}

/// Receives weighted pixels of one lookup.
pub(crate) trait Accumulator<T: PixelFormat> {
    /// Adds a pixel at footprint-local position `(u, v)`.
    fn add(&mut self, weight: f32, u: f32, v: f32, sample: SampleVector<'_, T>);
}

/// Runs one filtered lookup of `footprint` (level-0 raster space).
///
/// Returns the fraction of the footprint that fell on the image.
pub(crate) fn filtered_lookup<T, A>(
    cache: &MipmapLevelCache<T>,
    table: &RandomOffsetTable,
    footprint: &Parallelogram,
    opts: &SampleOptions,
    domain: Domain,
    acc: &mut A,
) -> TexResult<f32>
where
    T: PixelFormat,
    A: Accumulator<T>,
{
    let base = footprint
        .widen(
            opts.s_width,
            opts.t_width,
            0.5 * opts.blur * cache.width() as f32,
            0.5 * opts.blur * cache.height() as f32,
        )
        .with_min_radius(MIN_RADIUS);

    let level_index = cache.select_level(base.minor_width()).min(domain.max_level());
    let t = cache.level_transform(level_index)?;
    let level = cache.level(level_index)?;
    let (region, s_wrap, t_wrap) = domain.resolve(level.width(), level.height());
    let pllgram = base
        .scale_offset(t.x_scale, t.x_offset, t.y_scale, t.y_offset)
        .with_min_radius(MIN_RADIUS)
        .reduce_periods(
            s_wrap.period(region.width() as f32),
            t_wrap.period(region.height() as f32),
        );
    let split = split_support(pllgram.bounding_support(), region, s_wrap, t_wrap);
    let total_area = split.area();
    if total_area == 0 {
        return Ok(split.coverage);
    }

    let kernel = FilterKernel::new(&pllgram, opts.filter);
    let stochastic = opts.num_samples > 0 && total_area > u64::from(opts.num_samples);
    let mut partition = AreaPartition::new(opts.num_samples, total_area);

    for piece in &split.pieces {
        let mut it = if stochastic {
            let n = partition.take(piece.support.area());
            if n == 0 {
                continue;
            }
            level.stochastic_iter(piece.support, n, table)?
        } else {
            level.iter(piece.support)?
        };
        while it.valid() {
            let x = i64::from(it.x()) + i64::from(piece.shift_x);
            let y = i64::from(it.y()) + i64::from(piece.shift_y);
            let (u, v) = kernel.local(x as f32, y as f32);
            acc.add(kernel.weight_local(u, v), u, v, it.sample());
            it.advance()?;
        }
    }
    Ok(split.coverage)
}

/// Weighted mean of a channel window.
#[derive(Debug)]
pub(crate) struct ColorAccumulator {
    start: usize,
    available: usize,
    weighted: SmallVec<[f64; 4]>,
    plain: SmallVec<[f64; 4]>,
    weight: f64,
    count: u64,
}

impl ColorAccumulator {
    /// Accumulates channels `[start, start + count)` of a texture with
    /// `channels` channels.
    pub(crate) fn new(start: u32, count: u32, channels: u32) -> Self {
        let available = channels.saturating_sub(start).min(count) as usize;
        Self {
            start: start as usize,
            available,
            weighted: smallvec![0.0; available],
            plain: smallvec![0.0; available],
            weight: 0.0,
            count: 0,
        }
    }

    /// Writes the filtered values into `out`.
    ///
    /// Channels past the texture's last one, and the uncovered share of the
    /// footprint, take `fill`. When every weight was zero the plain mean of
    /// the visited pixels is used.
    pub(crate) fn finish(&self, coverage: f32, fill: f32, out: &mut [f32]) {
        for (c, slot) in out.iter_mut().enumerate() {
            *slot = if c < self.available && self.count > 0 {
                let mean = if self.weight > 0.0 {
                    self.weighted[c] / self.weight
                } else {
                    self.plain[c] / self.count as f64
                };
                (mean as f32) * coverage + fill * (1.0 - coverage)
            } else {
                fill
            };
        }
    }
}

impl<T: PixelFormat> Accumulator<T> for ColorAccumulator {
    fn add(&mut self, weight: f32, _u: f32, _v: f32, sample: SampleVector<'_, T>) {
        let w = f64::from(weight);
        for c in 0..self.available {
            let value = f64::from(sample.get(self.start + c));
            self.weighted[c] += w * value;
            self.plain[c] += value;
        }
        self.weight += w;
        self.count += 1;
    }
}

/// Weighted fraction of occluded depth samples.
#[derive(Debug)]
pub(crate) struct DepthAccumulator {
    depth: (f32, f32, f32),
    bias: f32,
    occluded_weight: f64,
    weight: f64,
    occluded: u64,
    count: u64,
}

impl DepthAccumulator {
    /// Compares against a receiver depth `centre + u * along_a + v * along_b`.
    pub(crate) fn new(depth: (f32, f32, f32), bias: f32) -> Self {
        Self {
            depth,
            bias,
            occluded_weight: 0.0,
            weight: 0.0,
            occluded: 0,
            count: 0,
        }
    }

    /// Occlusion in `[0, 1]`; the uncovered share of the footprint is lit.
    pub(crate) fn finish(&self, coverage: f32) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let fraction = if self.weight > 0.0 {
            self.occluded_weight / self.weight
        } else {
            self.occluded as f64 / self.count as f64
        };
        fraction as f32 * coverage
    }
}

impl<T: PixelFormat> Accumulator<T> for DepthAccumulator {
    fn add(&mut self, weight: f32, u: f32, v: f32, sample: SampleVector<'_, T>) {
        let (centre, along_a, along_b) = self.depth;
        let receiver = centre + u * along_a + v * along_b;
        let is_occluded = receiver > sample.get(0) + self.bias;
        let w = f64::from(weight);
        self.weight += w;
        self.count += 1;
        if is_occluded {
            self.occluded_weight += w;
            self.occluded += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::SampleQuad;
    use crate::input::MemoryTexture;
    use mipcache_core::DataFormat;
    use std::sync::Arc;

    fn checker(size: u32) -> MipmapLevelCache<f32> {
        let values: Vec<f32> = (0..size * size)
            .map(|i| if (i % size + i / size) % 2 == 0 { 1.0 } else { 0.0 })
            .collect();
        let tex = MemoryTexture::builder("checker.tex")
            .format(DataFormat::F32)
            .tiled(8, 8)
            .level(size, size, 1, &values)
            .level(size / 2, size / 2, 1, &vec![0.5; (size * size / 4) as usize])
            .build()
            .unwrap();
        MipmapLevelCache::new(Arc::new(tex)).unwrap()
    }

    fn lookup(cache: &MipmapLevelCache<f32>, quad: SampleQuad, opts: &SampleOptions) -> f32 {
        let table = RandomOffsetTable::new();
        let footprint = Parallelogram::from_quad(&quad).to_raster(cache.width(), cache.height());
        let domain = Domain::Image {
            s_wrap: opts.s_wrap,
            t_wrap: opts.t_wrap,
        };
        let mut acc = ColorAccumulator::new(0, 1, 1);
        let coverage = filtered_lookup(cache, &table, &footprint, opts, domain, &mut acc).unwrap();
        let mut out = [0.0];
        acc.finish(coverage, opts.fill, &mut out);
        out[0]
    }

    #[test]
    fn test_point_lookup_hits_pixel() {
        let cache = checker(32);
        let opts = SampleOptions::default();
        // Centre of pixel (0, 0) is white, (1, 0) is black.
        assert_eq!(lookup(&cache, SampleQuad::point(0.5 / 32.0, 0.5 / 32.0, 0.0), &opts), 1.0);
        assert_eq!(lookup(&cache, SampleQuad::point(1.5 / 32.0, 0.5 / 32.0, 0.0), &opts), 0.0);
    }

    #[test]
    fn test_wide_footprint_uses_coarser_level() {
        let cache = checker(32);
        let opts = SampleOptions::default();
        let v = lookup(&cache, SampleQuad::point(0.5, 0.5, 4.0 / 32.0), &opts);
        assert!((v - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_black_wrap_blends_fill() {
        let cache = checker(32);
        let opts = SampleOptions {
            fill: 1.0,
            filter: crate::options::FilterType::Box,
            ..SampleOptions::default()
        };
        let v = lookup(&cache, SampleQuad::point(1.0, 0.5, 1.0 / 32.0), &opts);
        assert!(v > 0.0 && v < 1.0, "edge lookup blends texture and fill: {v}");
        let outside = lookup(&cache, SampleQuad::point(2.0, 0.5, 1.0 / 32.0), &opts);
        assert_eq!(outside, 1.0);
    }

    #[test]
    fn test_color_accumulator_fill_channels() {
        let mut acc = ColorAccumulator::new(1, 3, 2);
        let raw = [0.25f32, 0.75];
        Accumulator::<f32>::add(&mut acc, 1.0, 0.0, 0.0, SampleVector::new(&raw));
        let mut out = [0.0; 3];
        acc.finish(1.0, 0.5, &mut out);
        assert_eq!(out, [0.75, 0.5, 0.5]);
    }

    #[test]
    fn test_zero_weight_falls_back_to_mean() {
        let mut acc = ColorAccumulator::new(0, 1, 1);
        Accumulator::<f32>::add(&mut acc, 0.0, 5.0, 5.0, SampleVector::new(&[0.2f32]));
        Accumulator::<f32>::add(&mut acc, 0.0, 5.0, 5.0, SampleVector::new(&[0.4f32]));
        let mut out = [0.0];
        acc.finish(1.0, 0.0, &mut out);
        assert!((out[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_depth_accumulator() {
        let mut acc = DepthAccumulator::new((0.5, 0.0, 0.0), 0.0);
        Accumulator::<f32>::add(&mut acc, 1.0, 0.0, 0.0, SampleVector::new(&[0.2f32]));
        Accumulator::<f32>::add(&mut acc, 1.0, 0.0, 0.0, SampleVector::new(&[0.9f32]));
        assert_eq!(acc.finish(1.0), 0.5);
        assert_eq!(acc.finish(0.5), 0.25);
        assert_eq!(DepthAccumulator::new((0.0, 0.0, 0.0), 0.0).finish(1.0), 0.0);
    }
}
