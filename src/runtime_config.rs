// =============================================================================
// Runtime Configuration — horizon set, sample rate and signal thresholds
// =============================================================================
//
// Everything the engine needs is fixed at construction from this struct; there
// are no package-level constant tables.  Loaded from JSON at startup and
// persisted with an atomic tmp + rename so a crash mid-write never leaves a
// truncated file behind.
//
// Every field carries a serde default so that older config files missing new
// fields still load.
// =============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StatsError;
use crate::indicators::MacdPeriods;
use crate::types::HorizonId;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_horizons() -> Vec<HorizonId> {
    vec![1, 5, 10, 30, 60, 120, 240, 720, 1440]
}

fn default_sample_rate() -> u32 {
    30
}

fn default_buy_threshold_pct() -> f64 {
    0.1
}

fn default_sell_threshold_pct() -> f64 {
    0.1
}

fn default_panic_minutes() -> f64 {
    30.0
}

fn default_snapshot_every() -> u64 {
    30
}

fn default_trend_periods() -> usize {
    12
}

fn default_atr_period() -> usize {
    14
}

fn default_signal_horizon() -> HorizonId {
    60
}

// =============================================================================
// HorizonSettings
// =============================================================================

/// Per-horizon slice of the configuration handed to a `HorizonAggregator`.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonSettings {
    pub buy_threshold_pct: f64,
    pub sell_threshold_pct: f64,
    pub panic_minutes: f64,
    pub snapshot_every: u64,
    pub macd: MacdPeriods,
    pub trend_periods: usize,
    pub atr_period: usize,
}

impl Default for HorizonSettings {
    fn default() -> Self {
        Self {
            buy_threshold_pct: default_buy_threshold_pct(),
            sell_threshold_pct: default_sell_threshold_pct(),
            panic_minutes: default_panic_minutes(),
            snapshot_every: default_snapshot_every(),
            macd: MacdPeriods::default(),
            trend_periods: default_trend_periods(),
            atr_period: default_atr_period(),
        }
    }
}

// =============================================================================
// StatsConfig
// =============================================================================

/// Top-level configuration for the multi-horizon statistician.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    // --- Horizons & sampling -------------------------------------------------

    /// Horizon lengths in minutes, in reporting order.
    #[serde(default = "default_horizons")]
    pub horizons: Vec<HorizonId>,

    /// Nominal samples per minute delivered by the feed.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Replay the first sample through every horizon to seed it.
    #[serde(default = "default_true")]
    pub warm_up: bool,

    /// Emit a snapshot to the sink every N samples per horizon (0 disables).
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u64,

    // --- Signal thresholds ---------------------------------------------------

    /// Minimum std-dev (percent of SMA) for a buy signal.
    #[serde(default = "default_buy_threshold_pct")]
    pub buy_threshold_pct: f64,

    /// Per-horizon overrides of `buy_threshold_pct`.
    #[serde(default)]
    pub horizon_buy_threshold_pct: BTreeMap<HorizonId, f64>,

    /// Minimum std-dev (percent of SMA) for a sell signal.
    #[serde(default = "default_sell_threshold_pct")]
    pub sell_threshold_pct: f64,

    /// Minutes in a bearish direction before a reversal warning is raised.
    #[serde(default = "default_panic_minutes")]
    pub panic_minutes: f64,

    // --- Indicator periods ---------------------------------------------------

    #[serde(default)]
    pub macd: MacdPeriods,

    /// Trend EMA period, in horizon-length samples.
    #[serde(default = "default_trend_periods")]
    pub trend_periods: usize,

    /// ATR / DMI smoothing, in horizon windows.
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Horizon whose signals drive the entry/exit state machine.
    #[serde(default = "default_signal_horizon")]
    pub signal_horizon: HorizonId,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            horizons: default_horizons(),
            sample_rate: default_sample_rate(),
            warm_up: true,
            snapshot_every: default_snapshot_every(),
            buy_threshold_pct: default_buy_threshold_pct(),
            horizon_buy_threshold_pct: BTreeMap::new(),
            sell_threshold_pct: default_sell_threshold_pct(),
            panic_minutes: default_panic_minutes(),
            macd: MacdPeriods::default(),
            trend_periods: default_trend_periods(),
            atr_period: default_atr_period(),
            signal_horizon: default_signal_horizon(),
        }
    }
}

impl StatsConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read stats config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse stats config from {}", path.display()))?;

        info!(
            path = %path.display(),
            horizons = ?config.horizons,
            sample_rate = config.sample_rate,
            "stats config loaded"
        );

        Ok(config)
    }

    /// Load `path`, writing the defaults there first when no file exists.
    /// An existing file that fails to read or parse is returned as an error
    /// and left untouched.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::metadata(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save(path)?;
                info!(path = %path.display(), "no stats config found, defaults written");
                Ok(config)
            }
            _ => Self::load(path),
        }
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise stats config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "stats config saved (atomic)");
        Ok(())
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> std::result::Result<(), StatsError> {
        if self.horizons.is_empty() {
            return Err(StatsError::InvalidConfig("no horizons configured".into()));
        }
        if self.sample_rate == 0 {
            return Err(StatsError::InvalidConfig("sample_rate must be > 0".into()));
        }
        for (i, h) in self.horizons.iter().enumerate() {
            if self.horizons[..i].contains(h) {
                return Err(StatsError::InvalidConfig(format!("horizon {h}m listed twice")));
            }
            if u64::from(*h) * u64::from(self.sample_rate) < 2 {
                return Err(StatsError::InvalidConfig(format!(
                    "horizon {h}m at {} samples/min spans fewer than 2 samples",
                    self.sample_rate
                )));
            }
        }
        let periods = [
            self.macd.fast,
            self.macd.slow,
            self.macd.signal,
            self.trend_periods,
            self.atr_period,
        ];
        if periods.contains(&0) {
            return Err(StatsError::InvalidConfig("indicator periods must be > 0".into()));
        }
        Ok(())
    }

    /// Resolve the settings for one horizon, applying per-horizon overrides.
    pub fn horizon_settings(&self, horizon: HorizonId) -> HorizonSettings {
        HorizonSettings {
            buy_threshold_pct: self
                .horizon_buy_threshold_pct
                .get(&horizon)
                .copied()
                .unwrap_or(self.buy_threshold_pct),
            sell_threshold_pct: self.sell_threshold_pct,
            panic_minutes: self.panic_minutes,
            snapshot_every: self.snapshot_every,
            macd: self.macd,
            trend_periods: self.trend_periods,
            atr_period: self.atr_period,
        }
    }
}
