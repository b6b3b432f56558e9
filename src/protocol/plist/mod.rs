//! Binary property list codec for command and status payloads
//!
//! Only the subset of `bplist00` needed by the remote-control endpoints is
//! produced, but the decoder accepts every object type a receiver may send
//! back in `/playback-info` (arrays of time ranges, dates, UTF-16 strings).

mod decode;
mod encode;
#[cfg(test)]
mod tests;

pub use decode::{PlistDecodeError, decode};
pub use encode::{PlistEncodeError, encode};

use std::collections::HashMap;

/// Content type for binary plist bodies
pub const CONTENT_TYPE: &str = "application/x-apple-binary-plist";

/// A property list value
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    /// Boolean value
    Boolean(bool),
    /// Signed integer
    Integer(i64),
    /// Unsigned integer above `i64::MAX`
    UnsignedInteger(u64),
    /// Floating point number
    Real(f64),
    /// UTF-8 string
    String(String),
    /// Binary data
    Data(Vec<u8>),
    /// Seconds since 2001-01-01 00:00:00 UTC
    Date(f64),
    /// Array of values
    Array(Vec<PlistValue>),
    /// Dictionary with string keys
    Dictionary(HashMap<String, PlistValue>),
}

impl PlistValue {
    /// Empty dictionary
    #[must_use]
    pub fn empty_dict() -> Self {
        PlistValue::Dictionary(HashMap::new())
    }

    /// Try to get as boolean
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PlistValue::Integer(i) => Some(*i),
            PlistValue::UnsignedInteger(u) => (*u).try_into().ok(),
            _ => None,
        }
    }

    /// Try to get as f64
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PlistValue::Real(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            PlistValue::Integer(i) => Some(*i as f64),
            #[allow(clippy::cast_precision_loss)]
            PlistValue::UnsignedInteger(u) => Some(*u as f64),
            _ => None,
        }
    }

    /// Numeric value truncated to whole non-negative units
    ///
    /// Reals are truncated toward zero; negatives and NaN clamp to 0.
    #[must_use]
    pub fn as_whole_u64(&self) -> Option<u64> {
        match self {
            PlistValue::Integer(i) => Some(u64::try_from(*i).unwrap_or(0)),
            PlistValue::UnsignedInteger(u) => Some(*u),
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            PlistValue::Real(f) if f.is_finite() && *f > 0.0 => Some(f.trunc() as u64),
            PlistValue::Real(_) => Some(0),
            PlistValue::String(s) => s
                .trim()
                .split('.')
                .next()
                .and_then(|whole| whole.parse().ok()),
            _ => None,
        }
    }

    /// Loose truthiness: false, zero, NaN and empty strings are false
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            PlistValue::Boolean(b) => *b,
            PlistValue::Integer(i) => *i != 0,
            PlistValue::UnsignedInteger(u) => *u != 0,
            PlistValue::Real(f) => f.abs() > 0.0,
            PlistValue::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Try to get as string reference
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as byte slice
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PlistValue::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Try to get as array reference
    #[must_use]
    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            PlistValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Try to get as dictionary reference
    #[must_use]
    pub fn as_dict(&self) -> Option<&HashMap<String, PlistValue>> {
        match self {
            PlistValue::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Look up a dictionary entry
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.as_dict().and_then(|d| d.get(key))
    }
}

impl From<bool> for PlistValue {
    fn from(v: bool) -> Self {
        PlistValue::Boolean(v)
    }
}

impl From<i32> for PlistValue {
    fn from(v: i32) -> Self {
        PlistValue::Integer(i64::from(v))
    }
}

impl From<i64> for PlistValue {
    fn from(v: i64) -> Self {
        PlistValue::Integer(v)
    }
}

impl From<u32> for PlistValue {
    fn from(v: u32) -> Self {
        PlistValue::Integer(i64::from(v))
    }
}

impl From<u64> for PlistValue {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(PlistValue::UnsignedInteger(v), PlistValue::Integer)
    }
}

impl From<f64> for PlistValue {
    fn from(v: f64) -> Self {
        PlistValue::Real(v)
    }
}

impl From<String> for PlistValue {
    fn from(v: String) -> Self {
        PlistValue::String(v)
    }
}

impl From<&str> for PlistValue {
    fn from(v: &str) -> Self {
        PlistValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for PlistValue {
    fn from(v: Vec<u8>) -> Self {
        PlistValue::Data(v)
    }
}

impl From<&[u8]> for PlistValue {
    fn from(v: &[u8]) -> Self {
        PlistValue::Data(v.to_vec())
    }
}

/// Builder for creating plist dictionaries
#[derive(Debug, Default)]
pub struct DictBuilder {
    map: HashMap<String, PlistValue>,
}

impl DictBuilder {
    /// Create a new dictionary builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key-value pair
    #[must_use]
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<PlistValue>) -> Self {
        self.map.insert(key.into(), value.into());
        self
    }

    /// Build the dictionary
    #[must_use]
    pub fn build(self) -> PlistValue {
        PlistValue::Dictionary(self.map)
    }
}
