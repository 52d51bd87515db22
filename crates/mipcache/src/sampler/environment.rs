//! Environment-map lookups by direction.
//!
//! Two layouts are supported:
//!
//! - **Lat-long** (equirectangular): azimuth `atan2(z, x)` across the
//!   width, polar angle from `+y` down the height. Wraps periodically in s
//!   and clamps at the poles.
//! - **Cube faces**: six faces packed 3 x 2,
//!
//!   ```text
//!   +----+----+----+
//!   | +x | +y | +z |
//!   +----+----+----+
//!   | -x | -y | -z |
//!   +----+----+----+
//!   ```
//!
//!   each covering a field of view read from the `fov` attribute (90
//!   degrees by default). A lookup is filtered on the face of its centre
//!   direction and clamped to that face.

use std::f32::consts::PI;
use std::sync::Arc;

use mipcache_core::PixelFormat;
use tracing::info;

use super::lookup::{filtered_lookup, ColorAccumulator, Domain};
use super::{base_format, output_len};
use crate::error::{TexResult, TextureError};
use crate::footprint::{normalize, DirectionQuad, Parallelogram, SampleQuad};
use crate::input::TextureInput;
use crate::mipmap::MipmapLevelCache;
use crate::options::{SampleOptions, WrapMode, ATTR_ENV_LAYOUT, ATTR_FOV};
use crate::random::RandomOffsetTable;

/// Default cube-face field of view in degrees.
pub const DEFAULT_FOV: f32 = 90.0;

/// Filtered lookups by direction.
pub trait EnvironmentSampler: Send + Sync {
    /// Filters the map over the cone bounded by `dirs` and writes
    /// `opts.num_channels` values, or as many as fit, into `out`.
    ///
    /// Wrap modes in `opts` are ignored; the layout decides them.
    ///
    /// # Errors
    ///
    /// Tile read failures on the open file.
    fn sample(&self, dirs: &DirectionQuad, opts: &SampleOptions, out: &mut [f32]) -> TexResult<()>;

    /// Options derived from the map's attributes.
    fn default_sample_options(&self) -> SampleOptions;

    /// Whether this sampler stands in for a missing map.
    fn is_dummy(&self) -> bool {
        false
    }
}

/// Lat-long texture coordinates of a unit direction.
pub fn latlong_coords(d: [f32; 3]) -> (f32, f32) {
    let phi = d[2].atan2(d[0]);
    let theta = d[1].clamp(-1.0, 1.0).acos();
    ((phi / PI + 1.0) * 0.5, theta / PI)
}

/// Cube face of a direction: index into `+x, +y, +z, -x, -y, -z`.
pub fn cube_face(d: [f32; 3]) -> usize {
    let (ax, ay, az) = (d[0].abs(), d[1].abs(), d[2].abs());
    let (axis, positive) = if ax >= ay && ax >= az {
        (0, d[0] >= 0.0)
    } else if ay >= az {
        (1, d[1] >= 0.0)
    } else {
        (2, d[2] >= 0.0)
    };
    if positive { axis } else { axis + 3 }
}

/// Face-local `(sc, tc, ma)`: in-plane coordinates and the distance along
/// the face axis.
fn face_frame(face: usize, d: [f32; 3]) -> (f32, f32, f32) {
    let [x, y, z] = d;
    match face {
        0 => (-z, -y, x),
        1 => (x, z, y),
        2 => (x, -y, z),
        3 => (z, -y, -x),
        4 => (x, -z, -y),
        _ => (-x, -y, -z),
    }
}

/// Texture coordinates of `d` projected onto `face` of a 3 x 2 layout.
///
/// Directions at or behind the face plane project far outside the face
/// and end up clamped to its edge.
pub fn cube_face_coords(face: usize, d: [f32; 3], cot_half_fov: f32) -> (f32, f32) {
    let d = normalize(d);
    let (sc, tc, ma) = face_frame(face, d);
    let ma = ma.max(1e-4);
    let fs = 0.5 * (sc / ma * cot_half_fov + 1.0);
    let ft = 0.5 * (tc / ma * cot_half_fov + 1.0);
    let column = (face % 3) as f32;
    let row = (face / 3) as f32;
    ((column + fs) / 3.0, (row + ft) / 2.0)
}

struct LatLongSampler<T: PixelFormat> {
    cache: MipmapLevelCache<T>,
    table: Arc<RandomOffsetTable>,
}

impl<T: PixelFormat> EnvironmentSampler for LatLongSampler<T> {
    fn sample(&self, dirs: &DirectionQuad, opts: &SampleOptions, out: &mut [f32]) -> TexResult<()> {
        let n = output_len(opts, out);
        let (sc, _) = latlong_coords(dirs.centre());
        let corners = dirs.corners().map(|d| {
            let (mut s, t) = latlong_coords(normalize(d));
            if s - sc > 0.5 {
                s -= 1.0;
            } else if sc - s > 0.5 {
                s += 1.0;
            }
            [s, t]
        });
        let quad = SampleQuad::new(corners[0], corners[1], corners[2], corners[3]);
        let footprint = Parallelogram::from_quad(&quad).to_raster(self.cache.width(), self.cache.height());

        let mut acc = ColorAccumulator::new(opts.start_channel, opts.num_channels, self.cache.channels());
        let domain = Domain::Image {
            s_wrap: WrapMode::Periodic,
            t_wrap: WrapMode::Clamp,
        };
        let coverage = filtered_lookup(&self.cache, &self.table, &footprint, opts, domain, &mut acc)?;
        acc.finish(coverage, opts.fill, &mut out[..n]);
        Ok(())
    }

    fn default_sample_options(&self) -> SampleOptions {
        self.cache
            .default_sample_options()
            .with_wrap(WrapMode::Periodic, WrapMode::Clamp)
    }
}

struct CubeFaceSampler<T: PixelFormat> {
    cache: MipmapLevelCache<T>,
    table: Arc<RandomOffsetTable>,
    cot_half_fov: f32,
    face_levels: usize,
}

impl<T: PixelFormat> EnvironmentSampler for CubeFaceSampler<T> {
    fn sample(&self, dirs: &DirectionQuad, opts: &SampleOptions, out: &mut [f32]) -> TexResult<()> {
        let n = output_len(opts, out);
        let face = cube_face(dirs.centre());
        let corners = dirs.corners().map(|d| {
            let (s, t) = cube_face_coords(face, d, self.cot_half_fov);
            [s, t]
        });
        let quad = SampleQuad::new(corners[0], corners[1], corners[2], corners[3]);
        let footprint = Parallelogram::from_quad(&quad).to_raster(self.cache.width(), self.cache.height());

        let mut acc = ColorAccumulator::new(opts.start_channel, opts.num_channels, self.cache.channels());
        let domain = Domain::Face {
            column: (face % 3) as u32,
            row: (face / 3) as u32,
            columns: 3,
            rows: 2,
            max_level: self.face_levels - 1,
        };
        let coverage = filtered_lookup(&self.cache, &self.table, &footprint, opts, domain, &mut acc)?;
        acc.finish(coverage, opts.fill, &mut out[..n]);
        Ok(())
    }

    fn default_sample_options(&self) -> SampleOptions {
        self.cache
            .default_sample_options()
            .with_wrap(WrapMode::Clamp, WrapMode::Clamp)
    }
}

/// Opens a lat-long environment sampler over `input`.
pub fn create_latlong(input: Arc<dyn TextureInput>, table: Arc<RandomOffsetTable>) -> TexResult<Arc<dyn EnvironmentSampler>> {
    let format = base_format(input.as_ref())?;
    let sampler: Arc<dyn EnvironmentSampler> = with_format!(format, T => {
        let cache = MipmapLevelCache::<T>::new(input)?;
        info!(
            path = %cache.path().display(),
            format = %format,
            levels = cache.num_levels(),
            "created lat-long environment sampler"
        );
        Arc::new(LatLongSampler { cache, table })
    });
    Ok(sampler)
}

/// Opens a cube-face environment sampler over `input`.
///
/// # Errors
///
/// [`TextureError::BadTexture`] unless level 0 splits evenly into a
/// 3 x 2 grid of faces.
pub fn create_cube_face(input: Arc<dyn TextureInput>, table: Arc<RandomOffsetTable>) -> TexResult<Arc<dyn EnvironmentSampler>> {
    let format = base_format(input.as_ref())?;
    let sampler: Arc<dyn EnvironmentSampler> = with_format!(format, T => {
        let cache = MipmapLevelCache::<T>::new(input)?;
        if cache.width() % 3 != 0 || cache.height() % 2 != 0 {
            return Err(TextureError::BadTexture(format!(
                "{}: {}x{} does not split into 3x2 cube faces",
                cache.path().display(),
                cache.width(),
                cache.height()
            )));
        }
        // Coarser levels no longer split into whole faces.
        let face_levels = (0..cache.num_levels())
            .take_while(|&i| cache.level_size(i).is_ok_and(|(w, h)| w % 3 == 0 && h % 2 == 0))
            .count();
        let fov = cache
            .attrs()
            .get_f32(ATTR_FOV)
            .filter(|f| *f > 0.0 && *f < 180.0)
            .unwrap_or(DEFAULT_FOV);
        info!(
            path = %cache.path().display(),
            format = %format,
            levels = cache.num_levels(),
            face_levels,
            fov,
            "created cube-face environment sampler"
        );
        Arc::new(CubeFaceSampler {
            cache,
            table,
            cot_half_fov: 1.0 / (0.5 * fov.to_radians()).tan(),
            face_levels,
        })
    });
    Ok(sampler)
}

/// Opens an environment sampler, choosing the layout from the
/// `env_layout` attribute (`latlong` or `cubeface`).
///
/// Without the attribute a 3:2 image is taken as cube faces and anything
/// else as lat-long.
pub fn create(input: Arc<dyn TextureInput>, table: Arc<RandomOffsetTable>) -> TexResult<Arc<dyn EnvironmentSampler>> {
    base_format(input.as_ref())?;
    let header = input.header(0)?;
    let layout = header.attrs.get_str(ATTR_ENV_LAYOUT).map(|s| s.trim().to_ascii_lowercase());
    let three_by_two = header.width * 2 == header.height * 3;
    match layout.as_deref() {
        Some("latlong") => create_latlong(input, table),
        Some("cubeface") => create_cube_face(input, table),
        Some(other) => Err(TextureError::BadTexture(format!(
            "{}: unknown environment layout '{}'",
            input.path().display(),
            other
        ))),
        None if three_by_two => create_cube_face(input, table),
        None => create_latlong(input, table),
    }
}

struct DummyEnvironmentSampler;

impl EnvironmentSampler for DummyEnvironmentSampler {
    fn sample(&self, _dirs: &DirectionQuad, opts: &SampleOptions, out: &mut [f32]) -> TexResult<()> {
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
pub fn create_dummy() -> Arc<dyn EnvironmentSampler> {
    Arc::new(DummyEnvironmentSampler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MemoryTexture;
    use approx::assert_abs_diff_eq;
    use mipcache_core::DataFormat;

    #[test]
    fn test_latlong_coords() {
        let (s, t) = latlong_coords([1.0, 0.0, 0.0]);
        assert_abs_diff_eq!(s, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(t, 0.5, epsilon = 1e-6);
        let (_, t) = latlong_coords([0.0, 1.0, 0.0]);
        assert_abs_diff_eq!(t, 0.0, epsilon = 1e-6);
        let (s, _) = latlong_coords([0.0, 0.0, 1.0]);
        assert_abs_diff_eq!(s, 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_cube_face_selection() {
        assert_eq!(cube_face([2.0, 1.0, -1.0]), 0);
        assert_eq!(cube_face([0.0, 3.0, 1.0]), 1);
        assert_eq!(cube_face([0.1, 0.1, 1.0]), 2);
        assert_eq!(cube_face([-2.0, 1.0, 1.0]), 3);
        assert_eq!(cube_face([0.0, -1.0, 0.5]), 4);
        assert_eq!(cube_face([0.0, 0.0, -1.0]), 5);
    }

    #[test]
    fn test_cube_face_centres() {
        // Face axes land at the centre of their cell.
        let axes = [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [-1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, -1.0],
        ];
        for (face, d) in axes.into_iter().enumerate() {
            let (s, t) = cube_face_coords(face, d, 1.0);
            assert_abs_diff_eq!(s, ((face % 3) as f32 + 0.5) / 3.0, epsilon = 1e-6);
            assert_abs_diff_eq!(t, ((face / 3) as f32 + 0.5) / 2.0, epsilon = 1e-6);
        }
    }

    fn face_colours() -> Arc<dyn TextureInput> {
        // Each face holds its index / 10.
        let (w, h) = (24u32, 16u32);
        let values: Vec<f32> = (0..w * h)
            .map(|i| {
                let (x, y) = (i % w, i / w);
                (y / 8 * 3 + x / 8) as f32 / 10.0
            })
            .collect();
        Arc::new(
            MemoryTexture::builder("cube.tex")
                .format(DataFormat::F32)
                .tiled(8, 8)
                .attr(ATTR_ENV_LAYOUT, "cubeface")
                .level(w, h, 1, &values)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_cube_face_lookup_stays_on_face() {
        let sampler = create(face_colours(), Arc::new(RandomOffsetTable::new())).unwrap();
        let opts = sampler.default_sample_options();
        let mut out = [0.0];
        for d in [[0.0, 0.0, -1.0], [1.0, 0.2, 0.1], [0.0, -1.0, 0.3]] {
            sampler.sample(&DirectionQuad::around(d, 0.6), &opts, &mut out).unwrap();
            let expected = cube_face(normalize(d)) as f32 / 10.0;
            assert_abs_diff_eq!(out[0], expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cube_face_blur_stays_on_split_levels() {
        // Face-coded levels down to 3x2, then levels that no longer split
        // into faces and hold a value no lookup may return.
        let face_level = |w: u32, h: u32| -> Vec<f32> {
            (0..w * h)
                .map(|i| ((i / w) / (h / 2) * 3 + (i % w) / (w / 3)) as f32 / 10.0)
                .collect()
        };
        let mut builder = MemoryTexture::builder("pyramid.tex")
            .format(DataFormat::F32)
            .attr(ATTR_ENV_LAYOUT, "cubeface");
        for (w, h) in [(24, 16), (12, 8), (6, 4), (3, 2)] {
            builder = builder.level(w, h, 1, &face_level(w, h));
        }
        let tex = builder.level(2, 1, 1, &[9.0; 2]).level(1, 1, 1, &[9.0]).build().unwrap();
        let sampler = create(Arc::new(tex), Arc::new(RandomOffsetTable::new())).unwrap();

        let opts = SampleOptions {
            blur: 1.0,
            ..sampler.default_sample_options()
        };
        let mut out = [0.0];
        for d in [[0.0, 0.0, 1.0], [0.0, -1.0, 0.3], [-1.0, 0.1, 0.2]] {
            sampler.sample(&DirectionQuad::around(d, 0.3), &opts, &mut out).unwrap();
            assert_abs_diff_eq!(out[0], cube_face(normalize(d)) as f32 / 10.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cube_face_rejects_bad_size() {
        let tex = MemoryTexture::builder("c.tex")
            .attr(ATTR_ENV_LAYOUT, "cubeface")
            .level(10, 4, 1, &[0.0; 40])
            .build()
            .unwrap();
        let result = create(Arc::new(tex), Arc::new(RandomOffsetTable::new()));
        assert!(matches!(result, Err(TextureError::BadTexture(_))));
    }

    #[test]
    fn test_latlong_lookup() {
        // Top half bright sky, bottom half dark ground.
        let (w, h) = (32u32, 16u32);
        let values: Vec<f32> = (0..w * h).map(|i| if i / w < h / 2 { 1.0 } else { 0.0 }).collect();
        let tex = MemoryTexture::builder("sky.tex")
            .format(DataFormat::F32)
            .level(w, h, 1, &values)
            .build()
            .unwrap();
        let sampler = create(Arc::new(tex), Arc::new(RandomOffsetTable::new())).unwrap();
        let opts = sampler.default_sample_options();
        assert_eq!(opts.s_wrap, WrapMode::Periodic);

        let mut out = [0.0];
        sampler.sample(&DirectionQuad::around([0.3, 1.0, 0.2], 0.05), &opts, &mut out).unwrap();
        assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-6);
        sampler.sample(&DirectionQuad::around([-0.5, -1.0, 0.1], 0.05), &opts, &mut out).unwrap();
        assert_abs_diff_eq!(out[0], 0.0, epsilon = 1e-6);

        // Across the s seam the lookup still sees only sky.
        sampler.sample(&DirectionQuad::around([-1.0, 0.6, 0.001], 0.2), &opts, &mut out).unwrap();
        assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_unknown_layout() {
        let tex = MemoryTexture::builder("e.tex").attr(ATTR_ENV_LAYOUT, "octahedral").level(2, 2, 1, &[0.0; 4]).build().unwrap();
        assert!(create(Arc::new(tex), Arc::new(RandomOffsetTable::new())).is_err());
    }

    #[test]
    fn test_dummy() {
        let dummy = create_dummy();
        let opts = SampleOptions {
            fill: 0.3,
            ..SampleOptions::default()
        };
        let mut out = [0.0; 2];
        dummy.sample(&DirectionQuad::around([0.0, 0.0, 1.0], 0.1), &opts, &mut out).unwrap();
        assert_eq!(out, [0.3, 0.0]);
    }
}
