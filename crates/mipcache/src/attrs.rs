//! Typed texture attributes.
//!
//! Texture headers carry free-form attributes (wrap modes baked by the
//! texture maker, shadow bias, cube-face field of view, environment layout).
//! [`Attrs`] stores them as string keys mapped to [`AttrValue`]s and offers
//! coercing getters.
//!
//! ```rust
//! use mipcache::attrs::{Attrs, AttrValue};
//!
//! let mut attrs = Attrs::new();
//! attrs.set("wrap_modes", AttrValue::Str("periodic,clamp".into()));
//! attrs.set("shadow_bias", 0.01f32);
//! attrs.set("num_samples", 32u32);
//!
//! assert_eq!(attrs.get_str("wrap_modes"), Some("periodic,clamp"));
//! assert_eq!(attrs.get_f32("shadow_bias"), Some(0.01));
//! assert_eq!(attrs.get_u32("num_samples"), Some(32));
//! ```

use std::collections::HashMap;

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// UTF-8 string value.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Fixed-length float tuple (matrices, colors).
    Floats(Vec<f32>),
}

impl AttrValue {
    /// Returns the string, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value as `f64`; strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Floats(v) if v.len() == 1 => Some(f64::from(v[0])),
            Self::Floats(_) => None,
        }
    }

    /// Non-negative integer value; floats must be integral.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Int(v) => u32::try_from(*v).ok(),
            Self::Float(v) if v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f64 => Some(*v as u32),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Floats(v) => {
                let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        Self::Float(v.into())
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<f32>> for AttrValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Floats(v)
    }
}

/// Attribute container: string key -> typed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attrs {
    map: HashMap<String, AttrValue>,
}

impl Attrs {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.map.insert(key.into(), value.into());
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.map.get(key)
    }

    /// Whether the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over all attributes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.map.iter()
    }

    /// String attribute.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttrValue::as_str)
    }

    /// Float attribute (ints and numeric strings coerce).
    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(AttrValue::as_f64).map(|v| v as f32)
    }

    /// Non-negative integer attribute.
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(AttrValue::as_u32)
    }
}
