// =============================================================================
// Shared types used across the statistics engine
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Horizon identifier: the trailing window length in minutes.
pub type HorizonId = u32;

/// Point-in-time reading of every indicator of one horizon.
///
/// This is the row handed to snapshot sinks and the read model for reporting
/// and trade-decision collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonSnapshot {
    pub horizon: HorizonId,
    /// Samples ingested by this horizon so far (warm-up replay included).
    pub samples: u64,
    pub at: DateTime<Utc>,
    pub sma: f64,
    pub std_dev_percent: f64,
    pub ema: f64,
    pub ema_up: bool,
    pub macd: f64,
    pub macd_divergence: f64,
    pub macd_bullish: bool,
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub stable: bool,
    pub buy_signal: bool,
    #[serde(default)]
    pub sell_signal: bool,
    #[serde(default)]
    pub reversal_warning: bool,
}
