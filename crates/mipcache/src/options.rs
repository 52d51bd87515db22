//! Per-lookup sampling configuration.
//!
//! [`SampleOptions`] carries wrap modes, filter widths, the stochastic
//! sample budget and shadow bias. Every texture yields a default record
//! built from its attributes, with library fallbacks for anything the file
//! does not declare:
//!
//! | Attribute      | Field(s)           | Fallback  |
//! |----------------|--------------------|-----------|
//! | `wrap_modes`   | `s_wrap`, `t_wrap` | `black`   |
//! | `filter`       | `filter`           | gaussian  |
//! | `num_samples`  | `num_samples`      | 16        |
//! | `shadow_bias`  | `bias`             | 0         |
//!
//! ```rust
//! use mipcache::attrs::Attrs;
//! use mipcache::options::{SampleOptions, WrapMode};
//!
//! let attrs = Attrs::new().with("wrap_modes", "periodic,clamp");
//! let opts = SampleOptions::from_attrs(&attrs, 3);
//! assert_eq!(opts.s_wrap, WrapMode::Periodic);
//! assert_eq!(opts.t_wrap, WrapMode::Clamp);
//! assert_eq!(opts.num_channels, 3);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::attrs::Attrs;

/// Attribute holding `"<s>,<t>"` wrap modes.
pub const ATTR_WRAP_MODES: &str = "wrap_modes";
/// Attribute holding the default shadow bias.
pub const ATTR_SHADOW_BIAS: &str = "shadow_bias";
/// Attribute holding the default stochastic sample count.
pub const ATTR_NUM_SAMPLES: &str = "num_samples";
/// Attribute naming the default filter kernel.
pub const ATTR_FILTER: &str = "filter";
/// Attribute holding a cube-face field of view in degrees.
pub const ATTR_FOV: &str = "fov";
/// Attribute naming an environment map layout.
pub const ATTR_ENV_LAYOUT: &str = "env_layout";

/// What a lookup sees outside `[0, 1]` on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// The texture repeats.
    Periodic,
    /// The edge pixel extends outwards.
    Clamp,
    /// Outside is the fill value.
    #[default]
    Black,
}

impl WrapMode {
    /// Lowercase name as written in attributes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Periodic => "periodic",
            Self::Clamp => "clamp",
            Self::Black => "black",
        }
    }

    /// Repeat length along an axis of length `size`; only periodic axes
    /// repeat.
    #[inline]
    pub fn period(&self, size: f32) -> Option<f32> {
        match self {
            Self::Periodic => Some(size),
            Self::Clamp | Self::Black => None,
        }
    }
}

impl fmt::Display for WrapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WrapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "periodic" | "repeat" => Ok(Self::Periodic),
            "clamp" => Ok(Self::Clamp),
            "black" => Ok(Self::Black),
            other => Err(format!("unknown wrap mode '{other}'")),
        }
    }
}

/// Filter kernel evaluated over the footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterType {
    /// Equal weight everywhere inside the footprint.
    Box,
    /// Gaussian falloff from the footprint center.
    #[default]
    Gaussian,
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Box => "box",
            Self::Gaussian => "gaussian",
        })
    }
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" => Ok(Self::Box),
            "gaussian" | "gauss" => Ok(Self::Gaussian),
            other => Err(format!("unknown filter '{other}'")),
        }
    }
}

/// Options for one lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOptions {
    /// Wrap mode along s (raster x).
    pub s_wrap: WrapMode,
    /// Wrap mode along t (raster y).
    pub t_wrap: WrapMode,
    /// Filter width multiplier along s.
    pub s_width: f32,
    /// Filter width multiplier along t.
    pub t_width: f32,
    /// Extra filter width in texture coordinates, added on both axes.
    pub blur: f32,
    /// Filter kernel.
    pub filter: FilterType,
    /// Stochastic sample count; supports larger than this are subsampled.
    pub num_samples: u32,
    /// Shadow depth bias.
    pub bias: f32,
    /// Value for channels past the texture's last one, and for the part of
    /// a black-wrapped footprint outside the image.
    pub fill: f32,
    /// First texture channel read.
    pub start_channel: u32,
    /// Number of output channels.
    pub num_channels: u32,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            s_wrap: WrapMode::Black,
            t_wrap: WrapMode::Black,
            s_width: 1.0,
            t_width: 1.0,
            blur: 0.0,
            filter: FilterType::Gaussian,
            num_samples: 16,
            bias: 0.0,
            fill: 0.0,
            start_channel: 0,
            num_channels: 1,
        }
    }
}

impl SampleOptions {
    /// Defaults for a texture with `channels` channels and attributes `attrs`.
    ///
    /// Unparsable attribute values are ignored in favour of the fallbacks.
    pub fn from_attrs(attrs: &Attrs, channels: u32) -> Self {
        let mut opts = Self {
            num_channels: channels.max(1),
            ..Self::default()
        };

        if let Some(modes) = attrs.get_str(ATTR_WRAP_MODES) {
            let mut parts = modes.split(',');
            let s = parts.next().and_then(|m| m.parse().ok());
            let t = parts.next().and_then(|m| m.parse().ok());
            if let Some(s) = s {
                opts.s_wrap = s;
                opts.t_wrap = t.unwrap_or(s);
            }
            if let Some(t) = t {
                opts.t_wrap = t;
            }
        }
        if let Some(filter) = attrs.get_str(ATTR_FILTER).and_then(|f| f.parse().ok()) {
            opts.filter = filter;
        }
        if let Some(n) = attrs.get_u32(ATTR_NUM_SAMPLES).filter(|&n| n > 0) {
            opts.num_samples = n;
        }
        if let Some(bias) = attrs.get_f32(ATTR_SHADOW_BIAS).filter(|b| b.is_finite()) {
            opts.bias = bias;
        }
        opts
    }

    /// Sets both wrap modes.
    pub fn with_wrap(mut self, s: WrapMode, t: WrapMode) -> Self {
        self.s_wrap = s;
        self.t_wrap = t;
        self
    }

    /// Sets both filter width multipliers.
    pub fn with_width(mut self, s: f32, t: f32) -> Self {
        self.s_width = s;
        self.t_width = t;
        self
    }

    /// Sets the stochastic sample count.
    pub fn with_samples(mut self, n: u32) -> Self {
        self.num_samples = n;
        self
    }

    /// Sets the channel window.
    pub fn with_channels(mut self, start: u32, count: u32) -> Self {
        self.start_channel = start;
        self.num_channels = count;
        self
    }
}
