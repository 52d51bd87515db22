//! Path-keyed sampler registry.
//!
//! [`TextureSystem`] opens samplers through a [`TextureOpener`], keeps one
//! shared instance per path and kind, and owns the session's
//! [`RandomOffsetTable`]. A path that cannot be opened, or opens to data the
//! requested kind cannot use, is logged once and answered with the kind's
//! dummy sampler from then on, so a render never stops on a missing map.
//! Each path is opened outside the registry lock, so a slow open holds up
//! only the threads asking for that path.
//!
//! ```rust
//! use std::sync::Arc;
//! use mipcache::input::{MemoryOpener, MemoryTexture};
//! use mipcache::TextureSystem;
//!
//! let opener = Arc::new(MemoryOpener::new());
//! opener.insert(MemoryTexture::builder("wood.tex").level(4, 4, 3, &[0.5; 48]).build().unwrap());
//!
//! let system = TextureSystem::new(opener.clone());
//! assert!(!system.texture_sampler("wood.tex").is_dummy());
//! assert!(system.texture_sampler("missing.tex").is_dummy());
//! assert_eq!(opener.opens(), 2);
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rand::Rng;
use tracing::warn;

use crate::error::TexResult;
use crate::input::{TextureInput, TextureOpener};
use crate::random::RandomOffsetTable;
use crate::sampler::{environment, shadow, texture, EnvironmentSampler, ShadowSampler, TextureSampler};
use crate::slot::LazySlot;

type Registry<S> = RwLock<HashMap<PathBuf, Arc<LazySlot<Arc<S>>>>>;

/// Opens and memoizes samplers by path.
pub struct TextureSystem {
    opener: Arc<dyn TextureOpener>,
    table: Arc<RandomOffsetTable>,
    textures: Registry<dyn TextureSampler>,
    shadows: Registry<dyn ShadowSampler>,
    environments: Registry<dyn EnvironmentSampler>,
}

impl TextureSystem {
    /// Creates a registry with a fresh offset table.
    pub fn new(opener: Arc<dyn TextureOpener>) -> Self {
        Self::with_table(opener, Arc::new(RandomOffsetTable::new()))
    }

    /// Creates a registry that shares an existing offset table.
    pub fn with_table(opener: Arc<dyn TextureOpener>, table: Arc<RandomOffsetTable>) -> Self {
        Self {
            opener,
            table,
            textures: RwLock::new(HashMap::new()),
            shadows: RwLock::new(HashMap::new()),
            environments: RwLock::new(HashMap::new()),
        }
    }

    /// The offset table every sampler of this system draws from.
    pub fn table(&self) -> &Arc<RandomOffsetTable> {
        &self.table
    }

    /// Redraws the stochastic offset. Call at bucket boundaries.
    pub fn randomize<R: Rng + ?Sized>(&self, rng: &mut R) {
        self.table.randomize(rng);
    }

    /// Colour sampler for `path`, or a dummy writing `fill`.
    pub fn texture_sampler(&self, path: impl AsRef<Path>) -> Arc<dyn TextureSampler> {
        self.get_or_open(&self.textures, path.as_ref(), "texture", texture::create, texture::create_dummy)
    }

    /// Shadow sampler for `path`, or a dummy that is always lit.
    pub fn shadow_sampler(&self, path: impl AsRef<Path>) -> Arc<dyn ShadowSampler> {
        self.get_or_open(&self.shadows, path.as_ref(), "shadow", shadow::create, shadow::create_dummy)
    }

    /// Environment sampler for `path`, or a dummy writing `fill`.
    ///
    /// The layout comes from the file's `env_layout` attribute, or from its
    /// aspect ratio when the attribute is missing.
    pub fn environment_sampler(&self, path: impl AsRef<Path>) -> Arc<dyn EnvironmentSampler> {
        self.get_or_open(
            &self.environments,
            path.as_ref(),
            "environment",
            environment::create,
            environment::create_dummy,
        )
    }

    /// Number of samplers registered, dummies included.
    pub fn len(&self) -> usize {
        read_len(&self.textures) + read_len(&self.shadows) + read_len(&self.environments)
    }

    /// Returns `true` if nothing has been opened yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every registered sampler. Samplers already handed out stay
    /// valid; the next request for a path opens it again.
    pub fn clear(&self) {
        self.textures.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.shadows.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.environments.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn get_or_open<S: ?Sized>(
        &self,
        registry: &Registry<S>,
        path: &Path,
        kind: &'static str,
        create: fn(Arc<dyn TextureInput>, Arc<RandomOffsetTable>) -> TexResult<Arc<S>>,
        dummy: fn() -> Arc<S>,
    ) -> Arc<S> {
        let slot = registry_slot(registry, path);
        // Only requests for this path wait on the open.
        let opened = slot.get_or_try_init(|| {
            let sampler = match self.opener.open(path).and_then(|input| create(input, Arc::clone(&self.table))) {
                Ok(sampler) => sampler,
                Err(e) => {
                    warn!(path = %path.display(), kind, error = %e, "cannot open sampler, using dummy");
                    dummy()
                }
            };
            Ok::<_, Infallible>(sampler)
        });
        match opened {
            Ok(sampler) => Arc::clone(sampler),
            Err(never) => match never {},
        }
    }
}

/// Slot for `path`, inserted empty on first request.
fn registry_slot<S: ?Sized>(registry: &Registry<S>, path: &Path) -> Arc<LazySlot<Arc<S>>> {
    if let Some(slot) = registry.read().unwrap_or_else(|e| e.into_inner()).get(path) {
        return Arc::clone(slot);
    }
    let mut map = registry.write().unwrap_or_else(|e| e.into_inner());
    Arc::clone(map.entry(path.to_path_buf()).or_default())
}

fn read_len<S: ?Sized>(registry: &Registry<S>) -> usize {
    registry.read().unwrap_or_else(|e| e.into_inner()).len()
}

impl std::fmt::Debug for TextureSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureSystem")
            .field("textures", &read_len(&self.textures))
            .field("shadows", &read_len(&self.shadows))
            .field("environments", &read_len(&self.environments))
            .finish_non_exhaustive()
    }
}
