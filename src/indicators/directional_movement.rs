// =============================================================================
// Directional Movement (DMI) and Average Directional Index (ADX) — streaming
// =============================================================================
//
// Works on a single price stream instead of OHLC bars.  The "bar" is the
// trailing window of W samples, and the "previous bar" is the window before
// it:
//
//   current   — SlidingExtremaBuffer over the last W samples
//   previous  — SlidingExtremaBuffer fed with everything `current` evicts,
//               so it always lags `current` by exactly one window
//
// Per sample:
//   up   = current.high - previous.high
//   down = previous.low - current.low
//
//   +DM = up   if up > down and up > 0
//   -DM = down if down > up and down > 0
//   both negative => the move with the smaller magnitude keeps that
//                    magnitude on its own side, the other side is 0
//
//   TR   = |current.high - current.low|            (single leg)
//   ATR  = EMA(TR)                 over atr_period * W, floored at 1
//   +DI  = EMA(+DM / ATR) * 100
//   -DI  = EMA(-DM / ATR) * 100
//   DX   = |+DI - -DI| / (+DI + -DI)               (denominator 1 when 0)
//   ADX  = EMA(DX) * 100
//
// Interpretation:
//   ADX > 25  => trending market
//   ADX < 20  => ranging / choppy market
// =============================================================================

use tracing::{debug, warn};

use super::ema::ExpAverage;
use super::extrema_buffer::SlidingExtremaBuffer;

/// ATR is never used below this value as a divisor.
pub const ATR_FLOOR: f64 = 1.0;

/// Raw directional movement for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalMove {
    pub plus: f64,
    pub minus: f64,
}

/// Classify an up/down move pair into +DM / -DM.
pub fn directional_move(up: f64, down: f64) -> DirectionalMove {
    if up > down && up > 0.0 {
        return DirectionalMove { plus: up, minus: 0.0 };
    }
    if down > up && down > 0.0 {
        return DirectionalMove { plus: 0.0, minus: down };
    }
    if up < 0.0 && down < 0.0 {
        // Contracting range: credit the side that shrank least.
        if up.abs() < down.abs() {
            return DirectionalMove { plus: up.abs(), minus: 0.0 };
        }
        if down.abs() < up.abs() {
            return DirectionalMove { plus: 0.0, minus: down.abs() };
        }
    }
    DirectionalMove { plus: 0.0, minus: 0.0 }
}

/// The current window and the one before it.
#[derive(Debug, Clone)]
struct WindowPair {
    current: SlidingExtremaBuffer,
    previous: SlidingExtremaBuffer,
}

impl WindowPair {
    /// Both windows start out filled with the first price.
    fn seeded(window: usize, value: f64) -> Self {
        Self {
            current: SlidingExtremaBuffer::new(window, value, value),
            previous: SlidingExtremaBuffer::new(window, value, value),
        }
    }
}

/// Streaming +DI / -DI / ADX over a trailing window.
#[derive(Debug, Clone)]
pub struct DirectionalMovement {
    window: usize,
    /// Allocated on the first sample.
    windows: Option<WindowPair>,
    atr: ExpAverage,
    plus_dm_avg: ExpAverage,
    minus_dm_avg: ExpAverage,
    adx_avg: ExpAverage,
    plus_di: f64,
    minus_di: f64,
    adx: f64,
}

impl DirectionalMovement {
    /// `window` is W in samples; the smoothing period of every average is
    /// `atr_period * W`.
    pub fn new(window: usize, atr_period: usize) -> Self {
        let smoothing = atr_period.max(1) * window.max(1);
        Self {
            window,
            windows: None,
            atr: ExpAverage::new(smoothing),
            plus_dm_avg: ExpAverage::new(smoothing),
            minus_dm_avg: ExpAverage::new(smoothing),
            adx_avg: ExpAverage::new(smoothing),
            plus_di: 0.0,
            minus_di: 0.0,
            adx: 0.0,
        }
    }

    pub fn add(&mut self, value: f64) {
        let window = self.window;
        let WindowPair { current, previous } = self
            .windows
            .get_or_insert_with(|| WindowPair::seeded(window, value));

        let evicted = current.push(value);
        previous.push(evicted);

        let up = current.high() - previous.high();
        let down = previous.low() - current.low();
        let dm = directional_move(up, down);

        let true_range = (current.high() - current.low()).abs();
        let atr = self.atr.add(true_range).max(ATR_FLOOR);

        let plus_avg = self.plus_dm_avg.add(dm.plus / atr);
        let minus_avg = self.minus_dm_avg.add(dm.minus / atr);
        self.plus_di = floor_di("plus_di", plus_avg * 100.0);
        self.minus_di = floor_di("minus_di", minus_avg * 100.0);

        let di_sum = self.plus_di + self.minus_di;
        let denominator = if di_sum == 0.0 { 1.0 } else { di_sum };
        let dx = (self.plus_di - self.minus_di).abs() / denominator;
        let adx = self.adx_avg.add(dx) * 100.0;
        if !(0.0..=100.0).contains(&adx) {
            debug!(adx, "ADX outside [0, 100] clamped");
        }
        self.adx = adx.clamp(0.0, 100.0);
    }

    pub fn plus_di(&self) -> f64 {
        self.plus_di
    }

    pub fn minus_di(&self) -> f64 {
        self.minus_di
    }

    pub fn adx(&self) -> f64 {
        self.adx
    }

    /// Smoothed true range (unfloored).
    pub fn atr(&self) -> f64 {
        self.atr.value()
    }
}

fn floor_di(name: &str, di: f64) -> f64 {
    if di < 0.0 {
        warn!(indicator = name, value = di, "negative directional index floored to 0");
        0.0
    } else {
        di
    }
}
