//! Shared samplers under concurrent render threads.

use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use mipcache::footprint::SampleQuad;
use mipcache::input::{MemoryOpener, MemoryTexture, TextureInput, TextureOpener};
use mipcache::{DataFormat, TexResult, MipmapLevelCache, SampleIterator, SampleOptions, TextureSystem, TileArray};
use rayon::prelude::*;

fn ramp_texture(path: &str, size: u32, tile: u32) -> MemoryTexture {
    let values: Vec<f32> = (0..size * size)
        .flat_map(|i| [(i % size) as f32 / size as f32, (i / size) as f32 / size as f32])
        .collect();
    MemoryTexture::builder(path)
        .format(DataFormat::F32)
        .tiled(tile, tile)
        .level(size, size, 2, &values)
        .build()
        .unwrap()
}

#[test]
fn each_tile_read_once() {
    let texture = Arc::new(ramp_texture("once.tex", 256, 32));
    let tiles = TileArray::<f32>::new(texture.clone(), 0).unwrap();

    let totals: Vec<f64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let mut it = tiles.iter(tiles.extent()).unwrap();
                    let mut sum = 0.0f64;
                    while it.valid() {
                        sum += f64::from(it.sample().get(0));
                        it.advance().unwrap();
                    }
                    sum
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(totals.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(texture.tile_reads(), 64);
    let stats = tiles.stats();
    assert_eq!(stats.resident, 64);
    assert_eq!(stats.misses, 64);
}

#[test]
fn levels_built_once() {
    let texture = Arc::new(
        MemoryTexture::builder("flat.tex")
            .format(DataFormat::F32)
            .level(64, 64, 1, &[0.5; 64 * 64])
            .level(32, 32, 1, &[0.25; 32 * 32])
            .build()
            .unwrap(),
    );
    let cache = MipmapLevelCache::<f32>::new(texture.clone()).unwrap();

    thread::scope(|scope| {
        for i in 0..16 {
            let cache = &cache;
            scope.spawn(move || {
                let level = cache.level(i % 2).unwrap();
                assert_eq!(level.width(), 64 >> (i % 2));
            });
        }
    });
    assert_eq!(texture.scanline_reads(), 2);
}

#[test]
fn parallel_matches_serial() {
    let opener = Arc::new(MemoryOpener::new());
    let texture = opener.insert(ramp_texture("ramp.tex", 128, 16));
    let system = TextureSystem::new(opener);
    let opts = SampleOptions {
        num_samples: 32,
        ..SampleOptions::default().with_channels(0, 2)
    };

    let lookup = |i: usize| {
        let sampler = system.texture_sampler("ramp.tex");
        let s = (i % 16) as f32 / 16.0 + 0.03;
        let t = (i / 16) as f32 / 16.0 + 0.03;
        let mut out = [0.0f32; 2];
        sampler.sample(&SampleQuad::rect(s, t, s + 0.05, t + 0.05), &opts, &mut out).unwrap();
        out
    };

    let parallel: Vec<[f32; 2]> = (0..256).into_par_iter().map(lookup).collect();
    let serial: Vec<[f32; 2]> = (0..256).map(lookup).collect();
    assert_eq!(parallel, serial);
    assert_eq!(system.len(), 1);
    assert_eq!(texture.tile_reads(), 64);
}

/// Opener that parks inside `open` for one path until released.
struct GatedOpener {
    inner: MemoryOpener,
    gated: &'static str,
    entered: Barrier,
    release: Barrier,
}

impl TextureOpener for GatedOpener {
    fn open(&self, path: &Path) -> TexResult<Arc<dyn TextureInput>> {
        if path == Path::new(self.gated) {
            self.entered.wait();
            self.release.wait();
        }
        self.inner.open(path)
    }
}

#[test]
fn slow_open_does_not_block_other_paths() {
    let inner = MemoryOpener::new();
    inner.insert(ramp_texture("slow.tex", 16, 8));
    inner.insert(ramp_texture("warm.tex", 16, 8));
    inner.insert(ramp_texture("cold.tex", 16, 8));
    let opener = Arc::new(GatedOpener {
        inner,
        gated: "slow.tex",
        entered: Barrier::new(2),
        release: Barrier::new(2),
    });
    let system = Arc::new(TextureSystem::new(opener.clone()));
    assert!(!system.texture_sampler("warm.tex").is_dummy());

    let slow = {
        let system = Arc::clone(&system);
        thread::spawn(move || system.texture_sampler("slow.tex").is_dummy())
    };
    opener.entered.wait();

    // While slow.tex is mid-open, both a registered and a new path resolve.
    let (tx, rx) = mpsc::channel();
    {
        let system = Arc::clone(&system);
        thread::spawn(move || {
            let warm = system.texture_sampler("warm.tex").is_dummy();
            let cold = system.texture_sampler("cold.tex").is_dummy();
            let _ = tx.send((warm, cold));
        });
    }
    let other = rx.recv_timeout(Duration::from_secs(10));
    opener.release.wait();

    assert_eq!(other, Ok((false, false)));
    assert!(!slow.join().unwrap());
    assert_eq!(system.len(), 3);
}

#[test]
fn concurrent_first_requests_open_once() {
    let opener = Arc::new(MemoryOpener::new());
    opener.insert(ramp_texture("shared.tex", 32, 8));
    let system = TextureSystem::new(opener.clone());

    thread::scope(|scope| {
        for i in 0..16 {
            let system = &system;
            scope.spawn(move || {
                let path = if i % 2 == 0 { "shared.tex" } else { "absent.tex" };
                assert_eq!(system.texture_sampler(path).is_dummy(), i % 2 == 1);
            });
        }
    });
    assert_eq!(opener.opens(), 2);
    assert_eq!(system.len(), 2);
}
