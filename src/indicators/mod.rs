// =============================================================================
// Streaming Indicators Module
// =============================================================================
//
// Incremental building blocks for the per-horizon engine.  Every type here is
// updated one sample at a time in amortised O(1) and never rescans history
// except where documented (the extrema buffer's rescan on eviction).

pub mod directional_movement;
pub mod ema;
pub mod extrema_buffer;
pub mod macd;
pub mod phased_ema;
pub mod trend_ema;
pub mod windowed_moment;

pub use directional_movement::DirectionalMovement;
pub use ema::ExpAverage;
pub use extrema_buffer::SlidingExtremaBuffer;
pub use macd::{MacdEngine, MacdPeriods};
pub use phased_ema::{EmaOrder, PhasedEma};
pub use trend_ema::{DirectionTimer, Trend, TrendEma};
pub use windowed_moment::WindowedMoment;
