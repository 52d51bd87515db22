//! Read-only view of one pixel's channels.

use mipcache_core::PixelFormat;

/// Channels of one pixel, read through the storage normalization rule.
///
/// The view borrows from whatever owns the pixel (a buffer, or a tile kept
/// alive by the iterator that produced the view), so it cannot outlive it
/// and never grants mutation.
///
/// ```rust
/// use mipcache::SampleVector;
///
/// let raw = [255u8, 0, 51];
/// let v = SampleVector::new(&raw);
/// assert_eq!(v.len(), 3);
/// assert_eq!(v.get(0), 1.0);
/// assert!((v.get(2) - 0.2).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SampleVector<'a, T: PixelFormat> {
    channels: &'a [T],
}

impl<'a, T: PixelFormat> SampleVector<'a, T> {
    /// Wraps the stored channels of one pixel.
    #[inline]
    pub fn new(channels: &'a [T]) -> Self {
        Self { channels }
    }

    /// Number of channels.
    #[inline]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the pixel has no channels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Logical value of channel `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.channels[index].to_f32()
    }

    /// Logical value of channel `index`, or `None` past the last channel.
    #[inline]
    pub fn try_get(&self, index: usize) -> Option<f32> {
        self.channels.get(index).map(|v| v.to_f32())
    }

    /// Stored values, unconverted.
    #[inline]
    pub fn raw(&self) -> &'a [T] {
        self.channels
    }

    /// Iterates over the logical channel values.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.channels.iter().map(|v| v.to_f32())
    }

    /// Collects the logical channel values.
    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }
}
