// src/command.rs - Device command vocabulary
//! Builders for the command lines understood by the device, plus the numeric
//! formatting they share.

use std::fmt;

use serde::Deserialize;

/// A numeric command argument.
///
/// Values are rendered unrounded: integers as plain digits and floats in their
/// shortest round-trip form. Floats follow the layout the device has always
/// received: whole values keep a trailing `.0` (`60.0`), decimal exponents
/// below -4 or from 16 up switch to `1e-05` / `1e+16` form, and non-finite
/// values print as `nan`, `inf` and `-inf`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(value) => write!(f, "{}", value),
            Number::Float(value) => write_float(f, value),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        return f.write_str("nan");
    }
    if value.is_infinite() {
        return f.write_str(if value < 0.0 { "-inf" } else { "inf" });
    }
    // `{:e}` yields the shortest round-trip digits, e.g. `1.5e16` or `-2e-5`.
    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .and_then(|(m, e)| e.parse::<i32>().ok().map(|e| (m, e)))
        .ok_or(fmt::Error)?;
    if (-4..16).contains(&exponent) {
        let fixed = value.to_string();
        if fixed.contains('.') {
            f.write_str(&fixed)
        } else {
            write!(f, "{}.0", fixed)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(f, "{}e{}{:02}", mantissa, sign, exponent.unsigned_abs())
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::Int(0)
    }
}

macro_rules! number_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Number {
            fn from(value: $ty) -> Self {
                Number::Int(value as i64)
            }
        })*
    };
}

number_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Number {
    fn from(value: f32) -> Self {
        Number::Float(value as f64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

/// An ordered group of command lines that must reach the device as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBatch {
    lines: Vec<String>,
}

impl CommandBatch {
    pub fn single(line: impl Into<String>) -> Self {
        Self { lines: vec![line.into()] }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

}

impl<S: Into<String>> FromIterator<S> for CommandBatch {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join(" | "))
    }
}

/// Job-level capabilities of the output device. These are not command lines;
/// the channel decides how to carry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Pause,
    Resume,
    Cancel,
}

/// `M140 S<temperature>`
pub fn set_bed_temperature(temperature: impl Into<Number>) -> CommandBatch {
    CommandBatch::single(format!("M140 S{}", temperature.into()))
}

/// `M104 S<temperature> T<position>`
pub fn set_hotend_temperature(position: usize, temperature: impl Into<Number>) -> CommandBatch {
    CommandBatch::single(format!("M104 S{} T{}", temperature.into(), position))
}

/// Relative move wrapped in a positioning-mode switch and restore.
pub fn relative_move(x: Number, y: Number, z: Number, speed: Number) -> CommandBatch {
    [
        "G91".to_string(),
        format!("G0 X{} Y{} Z{} F{}", x, y, z, speed),
        "G90".to_string(),
    ]
    .into_iter()
    .collect()
}

pub fn home_bed() -> CommandBatch {
    CommandBatch::single("G28 Z")
}

pub fn home_head() -> CommandBatch {
    CommandBatch::single("G28 X Y")
}
