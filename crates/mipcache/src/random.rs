//! Low-discrepancy point table with a re-randomizable offset.
//!
//! Stochastic texture iteration draws its pixel positions from a fixed
//! table of 2D Halton points (bases 2 and 3). Every lookup is shifted by a
//! shared offset pair, modulo 1, so lookups stay well stratified inside one
//! request while [`RandomOffsetTable::randomize`] decorrelates them between
//! independent contexts.
//!
//! Call `randomize` once per decorrelation context, e.g. once per render
//! bucket. Calling it per sample throws the stratification away.
//!
//! ```rust
//! use mipcache::random::RandomOffsetTable;
//! use rand::SeedableRng;
//!
//! let table = RandomOffsetTable::new();
//! let before = table.lookup(5);
//! table.randomize(&mut rand::rngs::StdRng::seed_from_u64(7));
//! let after = table.lookup(5);
//! assert_ne!(before, after);
//! assert!(after.0 >= 0.0 && after.0 < 1.0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Number of points in the table.
pub const TABLE_SIZE: usize = 1024;

/// Radical inverse of `index` in `base`, in `[0, 1)`.
fn radical_inverse(index: u32, base: u32) -> f32 {
    let inv_base = 1.0 / base as f64;
    let mut result = 0.0f64;
    let mut f = inv_base;
    let mut i = index;
    while i > 0 {
        result += f * (i % base) as f64;
        i /= base;
        f *= inv_base;
    }
    result as f32
}

#[inline]
fn pack(x: f32, y: f32) -> u64 {
    (u64::from(x.to_bits()) << 32) | u64::from(y.to_bits())
}

#[inline]
fn unpack(bits: u64) -> (f32, f32) {
    (f32::from_bits((bits >> 32) as u32), f32::from_bits(bits as u32))
}

/// Adds `offset` to `v` modulo 1, keeping the result in `[0, 1)`.
#[inline]
fn wrap_add(v: f32, offset: f32) -> f32 {
    let sum = v + offset;
    if sum >= 1.0 {
        sum - 1.0
    } else {
        sum
    }
}

/// Fixed table of 2D low-discrepancy points plus a shared offset.
///
/// Owned by the render session and shared with every sampler through an
/// `Arc`. The offset pair is packed into a single atomic so a concurrent
/// reader never sees half of an update, but it should still only change
/// between buckets, not while samples are in flight.
#[derive(Debug)]
pub struct RandomOffsetTable {
    points: Box<[(f32, f32)]>,
    offset: AtomicU64,
}

impl RandomOffsetTable {
    /// Builds the point table with a zero offset.
    pub fn new() -> Self {
        let points = (0..TABLE_SIZE as u32)
            .map(|i| (radical_inverse(i, 2), radical_inverse(i, 3)))
            .collect();
        Self {
            points,
            offset: AtomicU64::new(pack(0.0, 0.0)),
        }
    }

    /// Number of table entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; the table is never empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Current offset pair.
    #[inline]
    pub fn offset(&self) -> (f32, f32) {
        unpack(self.offset.load(Ordering::Acquire))
    }

    /// Redraws the offset pair from `rng`. The table itself is unchanged.
    pub fn randomize<R: Rng + ?Sized>(&self, rng: &mut R) {
        let x: f32 = rng.gen_range(0.0..1.0);
        let y: f32 = rng.gen_range(0.0..1.0);
        self.offset.store(pack(x, y), Ordering::Release);
        tracing::trace!(x, y, "randomized texture sample offsets");
    }

    /// Offset table point `index` (taken modulo the table size).
    #[inline]
    pub fn lookup(&self, index: usize) -> (f32, f32) {
        self.lookup_with(index, self.offset())
    }

    /// Like [`lookup`](Self::lookup) with an offset read once up front.
    ///
    /// Iterators snapshot the offset when they start so a whole request
    /// uses one consistent shift.
    #[inline]
    pub fn lookup_with(&self, index: usize, offset: (f32, f32)) -> (f32, f32) {
        let (px, py) = self.points[index % self.points.len()];
        (wrap_add(px, offset.0), wrap_add(py, offset.1))
    }

    /// Raw table point, without the offset.
    #[inline]
    pub fn point(&self, index: usize) -> (f32, f32) {
        self.points[index % self.points.len()]
    }
}

impl Default for RandomOffsetTable {
    fn default() -> Self {
        Self::new()
    }
}
