// =============================================================================
// Exponential Moving Average (EMA) — incremental form
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = value_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The first value seeds the average directly (no blending).  Used on its own
// for the ATR and directional-movement accumulators, and as the per-lane
// average inside `PhasedEma`.
// =============================================================================

/// Smoothing factor for an EMA over `period` samples.
///
/// `period == 0` is treated as 1, which makes the average track its input.
pub fn multiplier(period: usize) -> f64 {
    2.0 / (period.max(1) as f64 + 1.0)
}

/// A single classic exponential moving average.
#[derive(Debug, Clone)]
pub struct ExpAverage {
    multiplier: f64,
    value: f64,
    seeded: bool,
}

impl ExpAverage {
    pub fn new(period: usize) -> Self {
        Self {
            multiplier: multiplier(period),
            value: 0.0,
            seeded: false,
        }
    }

    /// Overwrite the average with `value` without blending.
    pub fn seed(&mut self, value: f64) {
        self.value = value;
        self.seeded = true;
    }

    /// Blend `value` into the average, seeding it on the first call.
    pub fn add(&mut self, value: f64) -> f64 {
        if self.seeded {
            self.value = value * self.multiplier + self.value * (1.0 - self.multiplier);
        } else {
            self.seed(value);
        }
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_matches_period() {
        assert!((multiplier(9) - 0.2).abs() < 1e-12);
        assert!((multiplier(1) - 1.0).abs() < 1e-12);
        assert!((multiplier(0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn first_value_seeds() {
        let mut ema = ExpAverage::new(10);
        assert!(!ema.is_seeded());
        assert_eq!(ema.add(7.5), 7.5);
        assert!(ema.is_seeded());
    }

    #[test]
    fn known_values() {
        // 5-period EMA of 1..=10 seeded with the first value.
        let mult = 2.0 / 6.0;
        let mut ema = ExpAverage::new(5);
        let mut expected = 1.0;
        ema.add(1.0);
        for c in 2..=10 {
            let c = c as f64;
            expected = c * mult + expected * (1.0 - mult);
            let got = ema.add(c);
            assert!((got - expected).abs() < 1e-12, "got {got}, expected {expected}");
        }
    }

    #[test]
    fn converges_to_constant_input() {
        let mut ema = ExpAverage::new(14);
        ema.add(0.0);
        for _ in 0..500 {
            ema.add(10.0);
        }
        assert!((ema.value() - 10.0).abs() < 1e-6);
    }
}
