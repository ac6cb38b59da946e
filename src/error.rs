// src/error.rs - Control-layer error type
use thiserror::Error;

/// Why a control request was dropped.
///
/// A request that produces one of these had no side effects: nothing was sent
/// to the device and no entity or timer was touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("invalid {field}: {value:?} is not a whole non-negative number")]
    InvalidValue { field: &'static str, value: String },
    #[error("extruder {position} does not exist (printer has {extruder_count})")]
    StaleExtruder { position: usize, extruder_count: usize },
    #[error("unknown job state request: {0:?}")]
    UnknownJobState(String),
    #[error("printer does not support {0}")]
    Unsupported(&'static str),
}
