// =============================================================================
// Swing Stats — multi-horizon streaming indicator engine
// =============================================================================
//
// One price stream in, a full indicator set (SMA, std-dev, trend EMA, MACD,
// +DI / -DI / ADX) out for every configured trailing horizon.  Every update is
// incremental; no indicator rescans full history.
//
//   tick -> MultiHorizonStatistician -> HorizonAggregator (per horizon)
//        -> WindowedMoment / TrendEma / MacdEngine / DirectionalMovement
// =============================================================================

pub mod error;
pub mod horizon;
pub mod indicators;
pub mod runtime_config;
pub mod signal_state;
pub mod sink;
pub mod types;

pub use error::StatsError;
pub use horizon::{HorizonAggregator, MultiHorizonStatistician};
pub use runtime_config::{HorizonSettings, StatsConfig};
pub use signal_state::{ExitReason, SignalEvent, SignalState};
pub use sink::{MemorySink, NullSink, SnapshotSink, TracingSink};
pub use types::{HorizonId, HorizonSnapshot};
