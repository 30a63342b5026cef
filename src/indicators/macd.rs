// =============================================================================
// MACD — Moving Average Convergence / Divergence
// =============================================================================
//
//   macd       = EMA_fast(price) - EMA_slow(price)
//   signal     = EMA_signal(macd)
//   divergence = macd - signal          (histogram)
//   bullish    = divergence > 0
//
// All three averages are `PhasedEma`s sharing the same lane count, so the
// periods are expressed in nominal samples rather than ticks.  A
// `DirectionTimer` measures how long MACD has stayed bullish or bearish.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::phased_ema::PhasedEma;
use super::trend_ema::{DirectionTimer, Trend};

fn default_fast() -> usize {
    12
}

fn default_slow() -> usize {
    26
}

fn default_signal() -> usize {
    9
}

/// Fast / slow / signal periods in nominal samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdPeriods {
    #[serde(default = "default_fast")]
    pub fast: usize,
    #[serde(default = "default_slow")]
    pub slow: usize,
    #[serde(default = "default_signal")]
    pub signal: usize,
}

impl Default for MacdPeriods {
    fn default() -> Self {
        Self {
            fast: default_fast(),
            slow: default_slow(),
            signal: default_signal(),
        }
    }
}

/// Streaming MACD with bullish/bearish duration tracking.
#[derive(Debug, Clone)]
pub struct MacdEngine {
    fast: PhasedEma,
    slow: PhasedEma,
    signal: PhasedEma,
    macd: f64,
    divergence: f64,
    timer: DirectionTimer,
}

impl MacdEngine {
    pub fn new(periods: MacdPeriods, period_size: usize, sample_rate: u32, panic_minutes: f64) -> Self {
        Self {
            fast: PhasedEma::single(periods.fast, period_size),
            slow: PhasedEma::single(periods.slow, period_size),
            signal: PhasedEma::single(periods.signal, period_size),
            macd: 0.0,
            divergence: 0.0,
            timer: DirectionTimer::new(sample_rate, panic_minutes),
        }
    }

    pub fn add(&mut self, value: f64) {
        let fast = self.fast.add(value);
        let slow = self.slow.add(value);
        self.macd = fast - slow;
        let signal = self.signal.add(self.macd);
        self.divergence = self.macd - signal;

        let trend = if self.divergence > 0.0 {
            Trend::Up
        } else if self.divergence < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        };
        self.timer.observe(trend);
    }

    pub fn macd(&self) -> f64 {
        self.macd
    }

    pub fn signal(&self) -> f64 {
        self.signal.value()
    }

    pub fn divergence(&self) -> f64 {
        self.divergence
    }

    pub fn is_bullish(&self) -> bool {
        self.divergence > 0.0
    }

    pub fn minutes_in_direction(&self) -> f64 {
        self.timer.minutes_in_direction()
    }

    /// Bearish for at least the panic threshold.
    pub fn reversal_warning(&self) -> bool {
        self.timer.reversal_warning()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn engine(period_size: usize) -> MacdEngine {
        MacdEngine::new(MacdPeriods::default(), period_size, 1, 10.0)
    }

    #[test]
    fn default_periods_are_classic() {
        let p = MacdPeriods::default();
        assert_eq!((p.fast, p.slow, p.signal), (12, 26, 9));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: MacdPeriods = serde_json::from_str(r#"{ "fast": 5 }"#).unwrap();
        assert_eq!(p.fast, 5);
        assert_eq!(p.slow, 26);
    }

    #[test]
    fn flat_price_has_no_divergence() {
        let mut m = engine(3);
        for _ in 0..200 {
            m.add(50.0);
        }
        assert_eq!(m.macd(), 0.0);
        assert_eq!(m.divergence(), 0.0);
        assert!(!m.is_bullish());
        assert!(!m.reversal_warning());
    }

    #[test]
    fn accelerating_rally_is_bullish() {
        let mut m = engine(1);
        for i in 0..120 {
            let x = i as f64;
            m.add(100.0 + x * x * 0.01);
        }
        assert!(m.macd() > 0.0);
        assert!(m.is_bullish());
        assert!(m.minutes_in_direction() > 0.0);
    }

    #[test]
    fn accelerating_selloff_is_bearish_and_warns() {
        let mut m = engine(1);
        for i in 0..120 {
            let x = i as f64;
            m.add(1000.0 - x * x * 0.05);
        }
        assert!(m.macd() < 0.0);
        assert!(!m.is_bullish());
        assert!(m.reversal_warning());
    }

    #[test]
    fn divergence_is_macd_minus_signal() {
        let mut m = engine(2);
        for i in 0..80 {
            m.add(100.0 + (i as f64 * 0.2).sin() * 4.0);
            assert!((m.divergence() - (m.macd() - m.signal())).abs() < 1e-12);
        }
    }
}
