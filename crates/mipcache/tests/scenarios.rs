//! End-to-end lookups over in-memory textures.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use mipcache::footprint::SampleQuad;
use mipcache::input::{MemoryOpener, MemoryTexture, TextureInput};
use mipcache::sampler::{environment, shadow, texture};
use mipcache::{
    DataFormat, DirectionQuad, FilterType, MipmapLevelCache, RandomOffsetTable, SampleIterator, SampleOptions,
    ShadowQuad, Support, TextureBuffer, TextureError, TextureSystem, TileArray,
};
use mipcache_core::f16;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn constant_rgb_bytes(width: u32, height: u32) -> Vec<u8> {
    [128u8, 64, 32].repeat((width * height) as usize)
}

fn count<T: mipcache::PixelFormat, I: SampleIterator<T>>(mut it: I) -> usize {
    let mut n = 0;
    while it.valid() {
        n += 1;
        it.advance().unwrap();
    }
    n
}

#[test]
fn constant_rgb_buffer_full_iteration() {
    let buffer = TextureBuffer::<u8>::from_vec(constant_rgb_bytes(64, 64), 64, 64, 3).unwrap();
    let mut it = buffer.iter(buffer.extent());
    let mut n = 0;
    while it.valid() {
        let s = it.sample();
        assert_eq!(s.len(), 3);
        assert_abs_diff_eq!(s.get(0), 0.502, epsilon = 1e-3);
        assert_abs_diff_eq!(s.get(1), 0.251, epsilon = 1e-3);
        assert_abs_diff_eq!(s.get(2), 0.125, epsilon = 1e-3);
        n += 1;
        it.advance().unwrap();
    }
    assert_eq!(n, 4096);
}

#[test]
fn constant_rgb_single_tile() {
    let texture = Arc::new(
        MemoryTexture::builder("const.tex")
            .tiled(64, 64)
            .level_raw(64, 64, 3, constant_rgb_bytes(64, 64))
            .build()
            .unwrap(),
    );
    let tiles = TileArray::<u8>::new(texture.clone(), 0).unwrap();
    assert_eq!((tiles.tiles_x(), tiles.tiles_y()), (1, 1));

    let mut it = tiles.iter(tiles.extent()).unwrap();
    let mut n = 0;
    while it.valid() {
        let s = it.sample();
        assert_abs_diff_eq!(s.get(0), 128.0 / 255.0, epsilon = 1e-6);
        assert_abs_diff_eq!(s.get(1), 64.0 / 255.0, epsilon = 1e-6);
        assert_abs_diff_eq!(s.get(2), 32.0 / 255.0, epsilon = 1e-6);
        n += 1;
        it.advance().unwrap();
    }
    assert_eq!(n, 4096);
    assert_eq!(texture.tile_reads(), 1);
}

#[test]
fn support_across_tile_corner() {
    let values: Vec<f32> = (0..256 * 256).map(|i| (i % 256) as f32).collect();
    let texture = Arc::new(
        MemoryTexture::builder("grid.tex")
            .format(DataFormat::F32)
            .tiled(64, 64)
            .level(256, 256, 1, &values)
            .build()
            .unwrap(),
    );
    let tiles = TileArray::<f32>::new(texture.clone(), 0).unwrap();
    let support = Support::new(60, 70, 60, 70);

    let mut seen = Vec::new();
    let mut it = tiles.iter(support).unwrap();
    while it.valid() {
        assert!(support.contains(it.x(), it.y()));
        assert_eq!(it.sample().get(0), it.x() as f32);
        seen.push((it.x(), it.y()));
        it.advance().unwrap();
    }
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 100);
    assert_eq!(texture.tile_reads(), 4);
    for (tx, ty) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        assert!(tiles.is_cached(tx, ty));
    }
    assert!(!tiles.is_cached(2, 2));
}

#[test]
fn buffer_and_tile_array_agree() {
    let values: Vec<f32> = (0..40 * 24 * 2).map(|i| (i % 97) as f32 * 0.01).collect();
    let texture = Arc::new(
        MemoryTexture::builder("agree.tex")
            .format(DataFormat::F16)
            .tiled(16, 16)
            .level(40, 24, 2, &values)
            .build()
            .unwrap(),
    );
    let tiles = TileArray::<f16>::new(texture.clone(), 0).unwrap();
    let bytes = texture.read_scanlines(0, 0, 24).unwrap();
    let buffer = TextureBuffer::<f16>::from_le_bytes(&bytes, 40, 24, 2).unwrap();

    let collect_tiles = |support: Support| {
        let mut out = Vec::new();
        let mut it = tiles.iter(support).unwrap();
        while it.valid() {
            out.push((it.x(), it.y(), it.sample().get(0), it.sample().get(1)));
            it.advance().unwrap();
        }
        out.sort_by_key(|&(x, y, _, _)| (y, x));
        out
    };
    let collect_buffer = |support: Support| {
        let mut out = Vec::new();
        let mut it = buffer.iter(support);
        while it.valid() {
            out.push((it.x(), it.y(), it.sample().get(0), it.sample().get(1)));
            it.advance().unwrap();
        }
        out.sort_by_key(|&(x, y, _, _)| (y, x));
        out
    };

    for support in [Support::new(0, 40, 0, 24), Support::new(14, 35, 3, 20), Support::new(-5, 3, 20, 30)] {
        let a = collect_tiles(support);
        assert_eq!(a.len() as u64, support.intersect(&buffer.extent()).area());
        assert_eq!(a, collect_buffer(support));
    }
}

#[test]
fn stochastic_counts_are_exact() {
    let table = RandomOffsetTable::new();
    let texture = Arc::new(
        MemoryTexture::builder("stoch.tex")
            .tiled(32, 32)
            .level(128, 128, 1, &vec![0.25; 128 * 128])
            .build()
            .unwrap(),
    );
    let tiles = TileArray::<u8>::new(texture, 0).unwrap();
    let buffer = TextureBuffer::<u8>::new(128, 128, 1);

    let mut rng = StdRng::seed_from_u64(42);
    for (support, n) in [
        (Support::new(0, 128, 0, 128), 64),
        (Support::new(10, 90, 30, 31), 7),
        (Support::new(-20, 40, -20, 40), 33),
        (Support::new(31, 33, 31, 33), 1),
    ] {
        table.randomize(&mut rng);
        assert_eq!(count::<u8, _>(tiles.stochastic_iter(support, n, &table).unwrap()), n as usize);
        assert_eq!(count::<u8, _>(buffer.stochastic_iter(support, n, &table)), n as usize);
    }
    assert_eq!(count::<u8, _>(tiles.stochastic_iter(Support::new(200, 300, 0, 10), 16, &table).unwrap()), 0);
}

fn half_occluded_map() -> Arc<MemoryTexture> {
    // Occluder at depth 1 over x < 32, open sky (depth 1000) elsewhere.
    let values: Vec<f32> = (0..64 * 64).map(|i| if i % 64 < 32 { 1.0 } else { 1000.0 }).collect();
    Arc::new(
        MemoryTexture::builder("half.shd")
            .format(DataFormat::F32)
            .level(64, 64, 1, &values)
            .build()
            .unwrap(),
    )
}

#[test]
fn shadow_half_occluded() {
    init_tracing();
    let table = Arc::new(RandomOffsetTable::new());
    let sampler = shadow::create(half_occluded_map(), table.clone()).unwrap();
    let quad = ShadowQuad::flat(SampleQuad::rect(0.25, 0.25, 0.75, 0.75), 10.0);
    let mut out = [0.0];

    for filter in [FilterType::Gaussian, FilterType::Box] {
        let opts = SampleOptions {
            num_samples: 64,
            filter,
            ..sampler.default_sample_options()
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..8 {
            table.randomize(&mut rng);
            sampler.sample(&quad, &opts, &mut out).unwrap();
            assert_abs_diff_eq!(out[0], 0.5, epsilon = 0.1);
        }
    }
}

#[test]
fn dummy_samplers_touch_nothing() {
    let opener = Arc::new(MemoryOpener::new());
    let texture = opener.insert(
        MemoryTexture::builder("present.tex")
            .tiled(8, 8)
            .level(16, 16, 1, &[0.5; 256])
            .build()
            .unwrap(),
    );

    let opts = SampleOptions {
        fill: 0.75,
        ..SampleOptions::default()
    };
    let mut out = [0.0];

    texture::create_dummy().sample(&SampleQuad::point(0.5, 0.5, 0.0), &opts, &mut out).unwrap();
    assert_eq!(out[0], 0.75);
    shadow::create_dummy().sample(&ShadowQuad::default(), &opts, &mut out).unwrap();
    assert_eq!(out[0], 0.0);
    environment::create_dummy()
        .sample(&DirectionQuad::around([0.0, 0.0, 1.0], 0.1), &opts, &mut out)
        .unwrap();
    assert_eq!(out[0], 0.75);

    assert_eq!(texture.tile_reads(), 0);
    assert_eq!(texture.scanline_reads(), 0);
    assert_eq!(opener.opens(), 0);
}

#[test]
fn system_falls_back_to_dummy() {
    init_tracing();
    let opener = Arc::new(MemoryOpener::new());
    let system = TextureSystem::new(opener.clone());

    for _ in 0..3 {
        let sampler = system.texture_sampler("nowhere.tex");
        assert!(sampler.is_dummy());
        let mut out = [1.0; 2];
        let opts = SampleOptions::default().with_channels(0, 2);
        sampler.sample(&SampleQuad::point(0.1, 0.1, 0.0), &opts, &mut out).unwrap();
        assert_eq!(out, [0.0, 0.0]);
    }
    assert_eq!(opener.opens(), 1);
}

#[test]
fn environment_by_attribute() {
    let opener = Arc::new(MemoryOpener::new());
    opener.insert(
        MemoryTexture::builder("sky.env")
            .attr("env_layout", "latlong")
            .tiled(16, 16)
            .level(64, 32, 3, &[0.2; 64 * 32 * 3])
            .build()
            .unwrap(),
    );
    let system = TextureSystem::new(opener);
    let sampler = system.environment_sampler("sky.env");
    assert!(!sampler.is_dummy());

    let opts = sampler.default_sample_options();
    let mut out = [0.0; 3];
    sampler.sample(&DirectionQuad::around([0.3, 0.2, -1.0], 0.05), &opts, &mut out).unwrap();
    for v in out {
        assert_abs_diff_eq!(v, 0.2, epsilon = 1e-2);
    }
}

#[test]
fn level_access() {
    let texture = Arc::new(
        MemoryTexture::builder("mip.tex")
            .format(DataFormat::F32)
            .tiled(8, 8)
            .level(16, 16, 1, &[1.0; 256])
            .level(8, 8, 1, &[2.0; 64])
            .scanline()
            .level(4, 4, 1, &[3.0; 16])
            .build()
            .unwrap(),
    );
    let cache = MipmapLevelCache::<f32>::new(texture.clone()).unwrap();
    assert_eq!(cache.num_levels(), 3);
    assert_eq!(texture.tile_reads() + texture.scanline_reads(), 0);

    assert!(std::ptr::eq(cache.level(2).unwrap(), cache.level(2).unwrap()));
    assert_eq!(texture.scanline_reads(), 1);
    assert_eq!(cache.level(2).unwrap().value(3, 3, 0).unwrap(), 3.0);

    assert!(matches!(
        cache.level(3),
        Err(TextureError::InvalidLevel { level: 3, num_levels: 3 })
    ));
}
