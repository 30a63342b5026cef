// =============================================================================
// Horizon Module
// =============================================================================
//
// Per-horizon aggregation and the multi-horizon fan-out:
// - HorizonAggregator: SMA / std-dev, trend EMA, MACD and DMI for one horizon
// - MultiHorizonStatistician: owns every horizon, serializes each behind a lock

pub mod aggregator;
pub mod statistician;

pub use aggregator::{HorizonAggregator, STABLE_HORIZONS};
pub use statistician::MultiHorizonStatistician;
