use thiserror::Error;

use crate::types::HorizonId;

/// Errors surfaced at the engine boundary.
///
/// Numeric anomalies inside the indicators are clamped and logged rather than
/// reported here; only conditions the caller must react to appear.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("horizon {0}m is not configured")]
    UnknownHorizon(HorizonId),

    #[error("non-finite sample rejected: {0}")]
    NonFiniteSample(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;
