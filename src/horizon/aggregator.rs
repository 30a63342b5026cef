// =============================================================================
// Horizon Aggregator — one full indicator set over one trailing horizon
// =============================================================================
//
// For a horizon of H minutes at R samples per minute the window is W = H * R
// samples.  The aggregator owns, and feeds in this order:
//
//   1. WindowedMoment(W)              — SMA and standard deviation
//   2. TrendEma(period_size W)        — EMA direction over the last horizon
//   3. MacdEngine(period_size W)      — MACD, signal, divergence
//   4. DirectionalMovement(W)         — +DI / -DI / ADX
//
// The phased averages take one lane per sample of the window, so their
// periods count horizons.  The slowest of them (MACD slow, 26) therefore needs
// 26 horizons of data:
//
//   stable_sample_count = R * H * 26
//
// `stable` latches true once that many samples have been ingested.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{Result, StatsError};
use crate::indicators::{DirectionalMovement, MacdEngine, TrendEma, WindowedMoment};
use crate::runtime_config::HorizonSettings;
use crate::sink::SnapshotSink;
use crate::types::{HorizonId, HorizonSnapshot};

/// Horizons of data required before a horizon reports itself stable.
pub const STABLE_HORIZONS: u64 = 26;

/// All indicators of a single horizon plus warm-up and signal logic.
pub struct HorizonAggregator {
    horizon: HorizonId,
    window: usize,
    stable_sample_count: u64,
    settings: HorizonSettings,

    moment: WindowedMoment,
    trend: TrendEma,
    macd: MacdEngine,
    dmi: DirectionalMovement,

    samples: u64,
    stable: bool,
    warm_up_remaining: u64,
    sink: Arc<dyn SnapshotSink>,
}

impl HorizonAggregator {
    pub fn new(
        horizon: HorizonId,
        sample_rate: u32,
        settings: HorizonSettings,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        let window = (u64::from(horizon) * u64::from(sample_rate)) as usize;
        let stable_sample_count = u64::from(sample_rate) * u64::from(horizon) * STABLE_HORIZONS;

        Self {
            horizon,
            window,
            stable_sample_count,
            moment: WindowedMoment::new(window),
            trend: TrendEma::new(settings.trend_periods, window, sample_rate, settings.panic_minutes),
            macd: MacdEngine::new(settings.macd, window, sample_rate, settings.panic_minutes),
            dmi: DirectionalMovement::new(window, settings.atr_period),
            settings,
            samples: 0,
            stable: false,
            warm_up_remaining: stable_sample_count,
            sink,
        }
    }

    /// Ingest one sample.  Non-finite values are rejected before any state
    /// is touched.
    pub fn add(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            warn!(horizon = self.horizon, value, "non-finite sample rejected");
            return Err(StatsError::NonFiniteSample(value));
        }

        self.moment.add(value);
        self.trend.add(value);
        self.macd.add(value);
        self.dmi.add(value);
        self.samples += 1;

        if !self.stable && self.samples >= self.stable_sample_count {
            self.stable = true;
            info!(horizon = self.horizon, samples = self.samples, "horizon stable");
        }

        let every = self.settings.snapshot_every;
        if every > 0 && self.samples % every == 0 {
            self.sink.record(&self.snapshot());
        }
        Ok(())
    }

    /// Seed the horizon by replaying `value` `stable_sample_count` times.
    /// The replay happens once per aggregator; later calls are no-ops.
    pub fn warm_up(&mut self, value: f64) -> Result<()> {
        self.warm_up_batch(value, u64::MAX).map(|_| ())
    }

    /// Replay at most `batch` of the outstanding warm-up samples and return
    /// how many remain.  Lets a caller holding the aggregator behind a lock
    /// release it between samples.
    pub fn warm_up_batch(&mut self, value: f64, batch: u64) -> Result<u64> {
        for _ in 0..batch.min(self.warm_up_remaining) {
            self.add(value)?;
            self.warm_up_remaining -= 1;
        }
        Ok(self.warm_up_remaining)
    }

    // ── Read accessors ──────────────────────────────────────────────────

    pub fn horizon(&self) -> HorizonId {
        self.horizon
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn stable_sample_count(&self) -> u64 {
        self.stable_sample_count
    }

    pub fn stable(&self) -> bool {
        self.stable
    }

    pub fn sma(&self) -> f64 {
        self.moment.average()
    }

    pub fn std_dev(&self) -> f64 {
        self.moment.std_dev()
    }

    /// Standard deviation as a percentage of the SMA (0 when the SMA is 0).
    pub fn std_dev_percent(&self) -> f64 {
        let sma = self.sma();
        if sma == 0.0 {
            return 0.0;
        }
        self.std_dev() / sma * 100.0
    }

    pub fn ema(&self) -> f64 {
        self.trend.value()
    }

    pub fn ema_up(&self) -> bool {
        self.trend.is_up()
    }

    pub fn trend_minutes(&self) -> f64 {
        self.trend.minutes_in_direction()
    }

    pub fn macd(&self) -> f64 {
        self.macd.macd()
    }

    pub fn macd_divergence(&self) -> f64 {
        self.macd.divergence()
    }

    pub fn macd_bullish(&self) -> bool {
        self.macd.is_bullish()
    }

    pub fn macd_minutes(&self) -> f64 {
        self.macd.minutes_in_direction()
    }

    pub fn adx(&self) -> f64 {
        self.dmi.adx()
    }

    pub fn plus_di(&self) -> f64 {
        self.dmi.plus_di()
    }

    pub fn minus_di(&self) -> f64 {
        self.dmi.minus_di()
    }

    pub fn atr(&self) -> f64 {
        self.dmi.atr()
    }

    /// Volatile enough, MACD bullish and EMA rising.
    pub fn buy_signal(&self) -> bool {
        self.std_dev_percent() >= self.settings.buy_threshold_pct
            && self.macd_bullish()
            && self.ema_up()
    }

    /// Volatile enough, MACD bearish and EMA not rising.
    pub fn sell_signal(&self) -> bool {
        self.std_dev_percent() >= self.settings.sell_threshold_pct
            && !self.macd_bullish()
            && !self.ema_up()
    }

    /// Either the EMA trend or MACD has been bearish past the panic limit.
    pub fn reversal_warning(&self) -> bool {
        self.trend.reversal_warning() || self.macd.reversal_warning()
    }

    pub fn snapshot(&self) -> HorizonSnapshot {
        HorizonSnapshot {
            horizon: self.horizon,
            samples: self.samples,
            at: Utc::now(),
            sma: self.sma(),
            std_dev_percent: self.std_dev_percent(),
            ema: self.ema(),
            ema_up: self.ema_up(),
            macd: self.macd(),
            macd_divergence: self.macd_divergence(),
            macd_bullish: self.macd_bullish(),
            adx: self.adx(),
            plus_di: self.plus_di(),
            minus_di: self.minus_di(),
            stable: self.stable,
            buy_signal: self.buy_signal(),
            sell_signal: self.sell_signal(),
            reversal_warning: self.reversal_warning(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, NullSink};

    fn aggregator(horizon: HorizonId, rate: u32) -> HorizonAggregator {
        HorizonAggregator::new(horizon, rate, HorizonSettings::default(), Arc::new(NullSink))
    }

    #[test]
    fn window_and_stability_derive_from_horizon() {
        let agg = aggregator(5, 30);
        assert_eq!(agg.window(), 150);
        assert_eq!(agg.stable_sample_count(), 30 * 5 * 26);
        assert!(!agg.stable());
    }

    #[test]
    fn stable_latches_exactly_at_threshold() {
        let mut agg = aggregator(1, 4);
        let threshold = agg.stable_sample_count();
        for i in 1..=threshold * 2 {
            agg.add(10.0 + (i % 7) as f64).unwrap();
            assert_eq!(agg.stable(), i >= threshold, "sample {i}");
        }
    }

    #[test]
    fn constant_feed_one_minute_horizon() {
        let mut agg = aggregator(1, 30);
        for _ in 0..(30 * 26 + 1) {
            agg.add(100.0).unwrap();
        }
        assert!(agg.stable());
        assert!((agg.sma() - 100.0).abs() < 1e-9);
        assert!(agg.std_dev_percent().abs() < 1e-9);
        assert!((agg.ema() - 100.0).abs() < 1e-9);
        assert!(!agg.buy_signal());
    }

    #[test]
    fn non_finite_input_is_rejected_without_side_effects() {
        let mut agg = aggregator(1, 10);
        agg.add(50.0).unwrap();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(agg.add(bad), Err(StatsError::NonFiniteSample(_))));
        }
        assert_eq!(agg.samples(), 1);
        assert_eq!(agg.sma(), 50.0);
        agg.add(70.0).unwrap();
        assert!((agg.sma() - 60.0).abs() < 1e-12);
    }

    #[test]
    fn warm_up_replays_to_stability() {
        let mut agg = aggregator(2, 5);
        agg.warm_up(250.0).unwrap();
        assert_eq!(agg.samples(), agg.stable_sample_count());
        assert!(agg.stable());
        assert!((agg.sma() - 250.0).abs() < 1e-9);
        assert_eq!(agg.adx(), 0.0);
    }

    #[test]
    fn warm_up_in_single_steps_matches_full_replay() {
        let mut stepped = aggregator(1, 3);
        let mut remaining = stepped.stable_sample_count();
        while remaining > 0 {
            let left = stepped.warm_up_batch(80.0, 1).unwrap();
            assert_eq!(left, remaining - 1);
            remaining = left;
        }

        let mut full = aggregator(1, 3);
        full.warm_up(80.0).unwrap();

        assert_eq!(stepped.samples(), full.samples());
        assert!(stepped.stable());
        assert_eq!(stepped.sma(), full.sma());
        assert_eq!(stepped.ema(), full.ema());
    }

    #[test]
    fn warm_up_runs_once() {
        let mut agg = aggregator(1, 2);
        agg.warm_up(10.0).unwrap();
        agg.warm_up(10.0).unwrap();
        assert_eq!(agg.samples(), agg.stable_sample_count());
        assert_eq!(agg.warm_up_batch(10.0, 5).unwrap(), 0);
        assert_eq!(agg.samples(), agg.stable_sample_count());
    }

    #[test]
    fn warm_up_rejects_non_finite_value() {
        let mut agg = aggregator(1, 5);
        assert!(agg.warm_up(f64::NAN).is_err());
        assert_eq!(agg.samples(), 0);
    }

    #[test]
    fn snapshot_every_thirty_samples() {
        let sink = Arc::new(MemorySink::new());
        let mut agg = HorizonAggregator::new(1, 10, HorizonSettings::default(), sink.clone());
        for i in 0..95 {
            agg.add(100.0 + i as f64).unwrap();
        }
        let rows = sink.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r.samples).collect::<Vec<_>>(), vec![30, 60, 90]);
        assert!(rows.iter().all(|r| r.horizon == 1));
    }

    #[test]
    fn rally_after_warm_up_raises_buy_signal() {
        let mut agg = aggregator(1, 2);
        agg.warm_up(100.0).unwrap();
        let mut price = 100.0;
        for i in 0..60 {
            price *= 1.0 + 0.002 * (1.0 + i as f64 / 10.0);
            agg.add(price).unwrap();
        }
        assert!(agg.ema_up());
        assert!(agg.macd_bullish());
        assert!(agg.std_dev_percent() >= HorizonSettings::default().buy_threshold_pct);
        assert!(agg.buy_signal());
        assert!(!agg.sell_signal());
        assert!(agg.plus_di() > agg.minus_di());
    }

    #[test]
    fn selloff_after_warm_up_raises_sell_signal() {
        let mut agg = aggregator(1, 2);
        agg.warm_up(100.0).unwrap();
        let mut price = 100.0;
        for i in 0..60 {
            price *= 1.0 - 0.002 * (1.0 + i as f64 / 10.0);
            agg.add(price).unwrap();
        }
        assert!(!agg.ema_up());
        assert!(!agg.macd_bullish());
        assert!(agg.sell_signal());
        assert!(!agg.buy_signal());
        assert!(agg.minus_di() > agg.plus_di());
    }

    #[test]
    fn snapshot_mirrors_accessors() {
        let mut agg = aggregator(1, 3);
        for i in 0..20 {
            agg.add(10.0 + (i as f64).sin()).unwrap();
        }
        let snap = agg.snapshot();
        assert_eq!(snap.horizon, 1);
        assert_eq!(snap.samples, 20);
        assert_eq!(snap.sma, agg.sma());
        assert_eq!(snap.adx, agg.adx());
        assert_eq!(snap.macd_bullish, agg.macd_bullish());
        assert_eq!(snap.buy_signal, agg.buy_signal());
    }
}
