// src/preheat/value.rs - Raw preheat request values
use std::fmt;

use serde::Deserialize;

use crate::error::ControlError;

/// A temperature or duration as it arrives from a user interface: a number,
/// or text that should hold one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PreheatValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PreheatValue {
    /// Round to a whole number, ties to even.
    ///
    /// Fails for non-finite, unparsable, negative or out-of-range values.
    pub fn to_whole(&self) -> Option<u32> {
        match self {
            PreheatValue::Integer(value) => u32::try_from(*value).ok(),
            PreheatValue::Float(value) => round_whole(*value),
            PreheatValue::Text(text) => text.trim().parse::<f64>().ok().and_then(round_whole),
        }
    }

    pub(crate) fn require_whole(&self, field: &'static str) -> Result<u32, ControlError> {
        self.to_whole().ok_or_else(|| ControlError::InvalidValue {
            field,
            value: self.to_string(),
        })
    }
}

fn round_whole(value: f64) -> Option<u32> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round_ties_even();
    // -0.4 rounds to -0.0, which compares equal to zero.
    if rounded < 0.0 || rounded > u32::MAX as f64 {
        return None;
    }
    Some(rounded as u32)
}

impl fmt::Display for PreheatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreheatValue::Integer(value) => write!(f, "{}", value),
            PreheatValue::Float(value) => write!(f, "{}", value),
            PreheatValue::Text(text) => f.write_str(text),
        }
    }
}

macro_rules! preheat_value_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for PreheatValue {
            fn from(value: $ty) -> Self {
                PreheatValue::Integer(value as i64)
            }
        })*
    };
}

preheat_value_from_int!(i32, i64, u8, u16, u32);

impl From<f32> for PreheatValue {
    fn from(value: f32) -> Self {
        PreheatValue::Float(value as f64)
    }
}

impl From<f64> for PreheatValue {
    fn from(value: f64) -> Self {
        PreheatValue::Float(value)
    }
}

impl From<&str> for PreheatValue {
    fn from(value: &str) -> Self {
        PreheatValue::Text(value.to_string())
    }
}

impl From<String> for PreheatValue {
    fn from(value: String) -> Self {
        PreheatValue::Text(value)
    }
}
