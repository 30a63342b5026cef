// =============================================================================
// Trend EMA — EMA slope direction with time-in-direction tracking
// =============================================================================
//
// Wraps a single-order `PhasedEma` and keeps a ring of its last `period_size`
// outputs.  The slope is newest minus oldest over that ring:
//
//   slope > 0  => trending up
//   slope < 0  => trending down
//   slope == 0 => direction unchanged
//
// A `DirectionTimer` records the sample at which the current direction began.
// Durations are measured in samples and converted to minutes with the nominal
// sample rate, so a synthetic warm-up replay and the live feed share one time
// base.
// =============================================================================

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::phased_ema::PhasedEma;

/// Direction of a tracked series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    /// No direction established yet.
    Flat,
    Up,
    Down,
}

impl Default for Trend {
    fn default() -> Self {
        Self::Flat
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "Flat"),
            Self::Up => write!(f, "Up"),
            Self::Down => write!(f, "Down"),
        }
    }
}

// ---------------------------------------------------------------------------
// DirectionTimer
// ---------------------------------------------------------------------------

/// Tracks how long a series has held its current direction.
#[derive(Debug, Clone)]
pub struct DirectionTimer {
    trend: Trend,
    /// Sample index at which the current direction started.
    started_at: u64,
    /// Samples seen so far.
    now: u64,
    sample_rate: f64,
    panic_minutes: f64,
}

impl DirectionTimer {
    pub fn new(sample_rate: u32, panic_minutes: f64) -> Self {
        Self {
            trend: Trend::Flat,
            started_at: 0,
            now: 0,
            sample_rate: f64::from(sample_rate.max(1)),
            panic_minutes,
        }
    }

    /// Advance one sample.  `Trend::Flat` keeps the previous direction.
    /// Returns `true` when the direction flipped.
    pub fn observe(&mut self, trend: Trend) -> bool {
        self.now += 1;
        if trend == Trend::Flat || trend == self.trend {
            return false;
        }
        self.trend = trend;
        self.started_at = self.now;
        true
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn samples_in_direction(&self) -> u64 {
        self.now - self.started_at
    }

    pub fn minutes_in_direction(&self) -> f64 {
        self.samples_in_direction() as f64 / self.sample_rate
    }

    /// Down for at least `panic_minutes`.
    pub fn reversal_warning(&self) -> bool {
        self.trend == Trend::Down && self.minutes_in_direction() >= self.panic_minutes
    }
}

// ---------------------------------------------------------------------------
// TrendEma
// ---------------------------------------------------------------------------

/// Phased EMA plus slope direction over its last `period_size` outputs.
#[derive(Debug, Clone)]
pub struct TrendEma {
    ema: PhasedEma,
    history: VecDeque<f64>,
    capacity: usize,
    slope: f64,
    timer: DirectionTimer,
}

impl TrendEma {
    pub fn new(periods: usize, period_size: usize, sample_rate: u32, panic_minutes: f64) -> Self {
        let capacity = period_size.max(1);
        Self {
            ema: PhasedEma::single(periods, capacity),
            history: VecDeque::with_capacity(capacity),
            capacity,
            slope: 0.0,
            timer: DirectionTimer::new(sample_rate, panic_minutes),
        }
    }

    pub fn add(&mut self, value: f64) {
        let current = self.ema.add(value);
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(current);

        let oldest = self.history.front().copied().unwrap_or(current);
        self.slope = current - oldest;

        let trend = if self.slope > 0.0 {
            Trend::Up
        } else if self.slope < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        };
        self.timer.observe(trend);
    }

    pub fn value(&self) -> f64 {
        self.ema.value()
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn trend(&self) -> Trend {
        self.timer.trend()
    }

    pub fn is_up(&self) -> bool {
        self.timer.trend() == Trend::Up
    }

    pub fn minutes_in_direction(&self) -> f64 {
        self.timer.minutes_in_direction()
    }

    pub fn reversal_warning(&self) -> bool {
        self.timer.reversal_warning()
    }
}
