//! Area-proportional split of a stochastic sample budget.
//!
//! When a support spans several tiles (or several wrapped pieces), parts
//! are visited in a fixed order and each receives the increase of
//! `round(samples * covered_area / total_area)` as its area is added to
//! the covered total. The rounded targets are monotone and end at
//! `samples` exactly, so the parts always sum to the full budget and no
//! part ever drifts more than half a sample from its proportional share.

/// Running state of a budget split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaPartition {
    samples: u32,
    total_area: u64,
    covered_area: u64,
    given: u32,
}

impl AreaPartition {
    /// Splits `samples` over parts totalling `total_area` pixels.
    pub fn new(samples: u32, total_area: u64) -> Self {
        Self {
            samples,
            total_area,
            covered_area: 0,
            given: 0,
        }
    }

    /// Samples for the next part of `area` pixels.
    ///
    /// Parts must be taken in a fixed order and their areas must add up to
    /// the total passed to [`new`](Self::new).
    pub fn take(&mut self, area: u64) -> u32 {
        if area == 0 || self.total_area == 0 {
            return 0;
        }
        self.covered_area = (self.covered_area + area).min(self.total_area);
        let n = u128::from(self.samples);
        let total = u128::from(self.total_area);
        let target = ((2 * n * u128::from(self.covered_area) + total) / (2 * total)) as u32;
        let samples = target - self.given;
        self.given = target;
        samples
    }

    /// Samples not yet handed out.
    #[inline]
    pub fn remaining_samples(&self) -> u32 {
        self.samples - self.given
    }
}
