// =============================================================================
// Multi-Horizon Statistician — one tick stream fanned out to every horizon
// =============================================================================
//
// Thread safety:
//   - Each HorizonAggregator sits behind its own parking_lot::Mutex, so a
//     horizon's updates are strictly serialized while distinct horizons
//     share no mutable state.
//   - `add` blocks on a busy horizon rather than dropping the sample.
//   - On the first sample (warm-up enabled) one blocking task per horizon
//     replays that sample `stable_sample_count` times, taking the horizon
//     lock per replayed sample.  Live ticks interleave with the replay in
//     lock-acquisition order.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::aggregator::HorizonAggregator;
use crate::error::{Result, StatsError};
use crate::runtime_config::StatsConfig;
use crate::sink::SnapshotSink;
use crate::types::{HorizonId, HorizonSnapshot};

type SharedAggregator = Arc<Mutex<HorizonAggregator>>;

/// Owns one aggregator per configured horizon.
pub struct MultiHorizonStatistician {
    horizons: Vec<HorizonId>,
    aggregators: HashMap<HorizonId, SharedAggregator>,
    ticks: AtomicU64,
    warm_up: bool,
    warm_up_started: AtomicBool,
    warm_up_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MultiHorizonStatistician {
    /// Build every aggregator from `config`.  All of them share `sink`.
    pub fn new(config: &StatsConfig, sink: Arc<dyn SnapshotSink>) -> Result<Self> {
        config.validate()?;

        let aggregators = config
            .horizons
            .iter()
            .map(|&h| {
                let agg = HorizonAggregator::new(
                    h,
                    config.sample_rate,
                    config.horizon_settings(h),
                    sink.clone(),
                );
                (h, Arc::new(Mutex::new(agg)))
            })
            .collect();

        info!(
            horizons = ?config.horizons,
            sample_rate = config.sample_rate,
            warm_up = config.warm_up,
            "statistician initialised"
        );

        Ok(Self {
            horizons: config.horizons.clone(),
            aggregators,
            ticks: AtomicU64::new(0),
            warm_up: config.warm_up,
            warm_up_started: AtomicBool::new(false),
            warm_up_tasks: Mutex::new(Vec::new()),
        })
    }

    /// Fan one sample out to every horizon.
    pub fn add(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            warn!(value, "non-finite sample rejected");
            return Err(StatsError::NonFiniteSample(value));
        }

        if self.warm_up && !self.warm_up_started.swap(true, Ordering::SeqCst) {
            self.start_warm_up(value);
        }

        for h in &self.horizons {
            self.aggregators[h].lock().add(value)?;
        }
        self.ticks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Spawn one replay per horizon.  Outside a tokio runtime the replay runs
    /// inline instead.
    fn start_warm_up(&self, value: f64) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no tokio runtime available, warming up horizons inline");
                for (&h, agg) in &self.aggregators {
                    replay(h, agg, value);
                }
                return;
            }
        };

        let mut tasks = self.warm_up_tasks.lock();
        for (&h, agg) in &self.aggregators {
            let agg = agg.clone();
            tasks.push(handle.spawn_blocking(move || replay(h, &agg, value)));
        }
        info!(horizons = tasks.len(), value, "warm-up replay started");
    }

    /// Wait until every warm-up replay has finished.  Returns immediately when
    /// none was started.
    pub async fn wait_for_warm_up(&self) {
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.warm_up_tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "warm-up task failed");
            }
        }
    }

    // ── Read accessors ──────────────────────────────────────────────────

    /// Configured horizons in reporting order.
    pub fn horizons(&self) -> &[HorizonId] {
        &self.horizons
    }

    /// Live samples accepted by `add` (warm-up replay excluded).
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Run `f` against one horizon under its lock.
    pub fn with_horizon<T>(
        &self,
        horizon: HorizonId,
        f: impl FnOnce(&HorizonAggregator) -> T,
    ) -> Result<T> {
        let agg = self
            .aggregators
            .get(&horizon)
            .ok_or(StatsError::UnknownHorizon(horizon))?;
        let guard = agg.lock();
        Ok(f(&*guard))
    }

    pub fn snapshot(&self, horizon: HorizonId) -> Result<HorizonSnapshot> {
        self.with_horizon(horizon, HorizonAggregator::snapshot)
    }

    /// Snapshots of every horizon in reporting order.
    pub fn snapshots(&self) -> Vec<HorizonSnapshot> {
        self.horizons
            .iter()
            .map(|h| self.aggregators[h].lock().snapshot())
            .collect()
    }

    pub fn samples(&self, horizon: HorizonId) -> Result<u64> {
        self.with_horizon(horizon, HorizonAggregator::samples)
    }

    pub fn sma(&self, horizon: HorizonId) -> Result<f64> {
        self.with_horizon(horizon, HorizonAggregator::sma)
    }

    pub fn std_dev_percent(&self, horizon: HorizonId) -> Result<f64> {
        self.with_horizon(horizon, HorizonAggregator::std_dev_percent)
    }

    pub fn ema(&self, horizon: HorizonId) -> Result<f64> {
        self.with_horizon(horizon, HorizonAggregator::ema)
    }

    pub fn ema_up(&self, horizon: HorizonId) -> Result<bool> {
        self.with_horizon(horizon, HorizonAggregator::ema_up)
    }

    pub fn macd(&self, horizon: HorizonId) -> Result<f64> {
        self.with_horizon(horizon, HorizonAggregator::macd)
    }

    pub fn macd_divergence(&self, horizon: HorizonId) -> Result<f64> {
        self.with_horizon(horizon, HorizonAggregator::macd_divergence)
    }

    pub fn macd_bullish(&self, horizon: HorizonId) -> Result<bool> {
        self.with_horizon(horizon, HorizonAggregator::macd_bullish)
    }

    pub fn adx(&self, horizon: HorizonId) -> Result<f64> {
        self.with_horizon(horizon, HorizonAggregator::adx)
    }

    pub fn plus_di(&self, horizon: HorizonId) -> Result<f64> {
        self.with_horizon(horizon, HorizonAggregator::plus_di)
    }

    pub fn minus_di(&self, horizon: HorizonId) -> Result<f64> {
        self.with_horizon(horizon, HorizonAggregator::minus_di)
    }

    pub fn stable(&self, horizon: HorizonId) -> Result<bool> {
        self.with_horizon(horizon, HorizonAggregator::stable)
    }

    pub fn buy_signal(&self, horizon: HorizonId) -> Result<bool> {
        self.with_horizon(horizon, HorizonAggregator::buy_signal)
    }
}

/// Replay `value` through one horizon, one lock acquisition per sample.
fn replay(horizon: HorizonId, agg: &SharedAggregator, value: f64) {
    let started = Instant::now();
    let count = agg.lock().stable_sample_count();
    loop {
        match agg.lock().warm_up_batch(value, 1) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!(horizon, error = %e, "warm-up replay aborted");
                return;
            }
        }
    }
    info!(
        horizon,
        samples = count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "warm-up replay finished"
    );
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, NullSink};

    fn config(horizons: Vec<HorizonId>, sample_rate: u32, warm_up: bool) -> StatsConfig {
        StatsConfig {
            horizons,
            sample_rate,
            warm_up,
            ..StatsConfig::default()
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = config(vec![], 30, false);
        assert!(matches!(
            MultiHorizonStatistician::new(&cfg, Arc::new(NullSink)),
            Err(StatsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn add_reaches_every_horizon_exactly_once() {
        let cfg = config(vec![1, 5, 10, 30], 2, false);
        let stats = MultiHorizonStatistician::new(&cfg, Arc::new(NullSink)).unwrap();
        for i in 1..=25u64 {
            stats.add(100.0 + i as f64).unwrap();
            for &h in stats.horizons() {
                assert_eq!(stats.samples(h).unwrap(), i, "horizon {h}");
            }
        }
        assert_eq!(stats.ticks(), 25);
    }

    #[test]
    fn every_horizon_latches_stable_at_its_own_threshold() {
        let cfg = config(vec![1, 2, 3], 2, false);
        let stats = MultiHorizonStatistician::new(&cfg, Arc::new(NullSink)).unwrap();
        let last = 2 * 3 * 26 + 1;
        for i in 1..=last {
            stats.add(50.0 + (i % 5) as f64).unwrap();
            for &h in stats.horizons() {
                let threshold = 2 * u64::from(h) * 26;
                assert_eq!(stats.stable(h).unwrap(), i >= threshold, "horizon {h} sample {i}");
            }
        }
    }

    #[test]
    fn unknown_horizon_is_not_found() {
        let cfg = config(vec![1, 5], 2, false);
        let stats = MultiHorizonStatistician::new(&cfg, Arc::new(NullSink)).unwrap();
        assert_eq!(stats.sma(7), Err(StatsError::UnknownHorizon(7)));
        assert_eq!(stats.adx(7), Err(StatsError::UnknownHorizon(7)));
        assert!(matches!(stats.snapshot(7), Err(StatsError::UnknownHorizon(7))));
        // A configured horizon with no data reads a real zero instead.
        assert_eq!(stats.sma(5), Ok(0.0));
    }

    #[test]
    fn non_finite_sample_touches_no_horizon() {
        let cfg = config(vec![1, 5], 2, false);
        let stats = MultiHorizonStatistician::new(&cfg, Arc::new(NullSink)).unwrap();
        stats.add(10.0).unwrap();
        assert!(matches!(stats.add(f64::NAN), Err(StatsError::NonFiniteSample(_))));
        assert!(stats.add(f64::INFINITY).is_err());
        assert_eq!(stats.ticks(), 1);
        assert_eq!(stats.samples(1).unwrap(), 1);
        assert_eq!(stats.samples(5).unwrap(), 1);
    }

    #[test]
    fn snapshots_follow_configured_order() {
        let cfg = config(vec![30, 1, 5], 2, false);
        let stats = MultiHorizonStatistician::new(&cfg, Arc::new(NullSink)).unwrap();
        stats.add(1.0).unwrap();
        let order: Vec<HorizonId> = stats.snapshots().iter().map(|s| s.horizon).collect();
        assert_eq!(order, vec![30, 1, 5]);
    }

    #[test]
    fn warm_up_without_runtime_runs_inline() {
        let cfg = config(vec![1, 2], 3, true);
        let stats = MultiHorizonStatistician::new(&cfg, Arc::new(NullSink)).unwrap();
        stats.add(42.0).unwrap();
        assert!(stats.stable(1).unwrap());
        assert!(stats.stable(2).unwrap());
        assert_eq!(stats.samples(1).unwrap(), 3 * 26 + 1);
        assert_eq!(stats.samples(2).unwrap(), 3 * 2 * 26 + 1);
        assert_eq!(stats.ticks(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn background_warm_up_seeds_every_horizon() {
        let cfg = config(vec![1, 5, 10], 4, true);
        let sink = Arc::new(MemorySink::new());
        let stats = MultiHorizonStatistician::new(&cfg, sink.clone()).unwrap();

        stats.add(100.0).unwrap();
        for _ in 0..9 {
            stats.add(100.0).unwrap();
        }
        stats.wait_for_warm_up().await;

        for &h in stats.horizons() {
            let expected = 4 * u64::from(h) * 26 + 10;
            assert_eq!(stats.samples(h).unwrap(), expected, "horizon {h}");
            assert!(stats.stable(h).unwrap());
            assert!((stats.sma(h).unwrap() - 100.0).abs() < 1e-9);
            assert!(stats.std_dev_percent(h).unwrap().abs() < 1e-9);
        }
        assert_eq!(stats.ticks(), 10);
        assert!(!sink.rows_for(10).is_empty());
    }

    #[tokio::test]
    async fn wait_without_warm_up_returns_immediately() {
        let cfg = config(vec![1], 2, false);
        let stats = MultiHorizonStatistician::new(&cfg, Arc::new(NullSink)).unwrap();
        stats.add(1.0).unwrap();
        stats.wait_for_warm_up().await;
        assert_eq!(stats.samples(1).unwrap(), 1);
    }
}
