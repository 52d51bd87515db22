//! Populate-once cache slot.
//!
//! Tiles and mip levels are fetched on first use and never replaced. A
//! [`LazySlot`] makes that an explicit state machine:
//!
//! ```text
//! Empty ──claim──► Populating ──install──► Ready
//!   ▲                  │
//!   └────failure───────┘
//! ```
//!
//! Readers of a `Ready` slot take no lock. Concurrent first requests
//! serialize on a per-slot mutex, so the fetch runs at most once per
//! successful population and exactly one value is ever installed.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};

/// Population state of a [`LazySlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Nothing fetched yet.
    Empty = 0,
    /// A thread is fetching the value.
    Populating = 1,
    /// The value is installed and immutable.
    Ready = 2,
}

impl SlotState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Populating,
            2 => Self::Ready,
            _ => Self::Empty,
        }
    }
}

/// A value that is computed on first access, once.
#[derive(Debug)]
pub struct LazySlot<V> {
    value: OnceLock<V>,
    populate: Mutex<()>,
    state: AtomicU8,
}

impl<V> LazySlot<V> {
    /// Creates an empty slot.
    pub const fn new() -> Self {
        Self {
            value: OnceLock::new(),
            populate: Mutex::new(()),
            state: AtomicU8::new(SlotState::Empty as u8),
        }
    }

    /// The installed value, if any.
    #[inline]
    pub fn get(&self) -> Option<&V> {
        self.value.get()
    }

    /// Current population state.
    #[inline]
    pub fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns the installed value, running `init` to produce it if the
    /// slot is empty.
    ///
    /// If `init` fails the slot returns to `Empty` and the error is handed
    /// back; a later call retries.
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(v) = self.value.get() {
            return Ok(v);
        }

        let _guard = self.populate.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(v) = self.value.get() {
            return Ok(v);
        }

        self.state.store(SlotState::Populating as u8, Ordering::Release);
        match init() {
            Ok(v) => {
                let v = self.value.get_or_init(|| v);
                self.state.store(SlotState::Ready as u8, Ordering::Release);
                Ok(v)
            }
            Err(e) => {
                self.state.store(SlotState::Empty as u8, Ordering::Release);
                Err(e)
            }
        }
    }
}

impl<V> Default for LazySlot<V> {
    fn default() -> Self {
        Self::new()
    }
}
