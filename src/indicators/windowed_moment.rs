// =============================================================================
// Windowed Moment — running mean and variance over a bounded window
// =============================================================================
//
// Both moments are maintained incrementally from the value that leaves the
// window on every push:
//
//   sum'    = sum    - oldest   + value
//   sum_sq' = sum_sq - oldest^2 + value^2
//
// With n = min(count, period):
//
//   mean     = sum / n
//   variance = |n * sum_sq - sum^2| / (n * (n - 1))
//
// The absolute value absorbs floating-point cancellation that would otherwise
// produce a tiny negative variance on near-constant input.  A negative raw
// numerator is logged so real bugs are still visible.
// =============================================================================

use tracing::debug;

use super::extrema_buffer::SlidingExtremaBuffer;

/// Running mean / variance / standard deviation of the last `period` samples.
#[derive(Debug, Clone)]
pub struct WindowedMoment {
    window: SlidingExtremaBuffer,
    period: usize,
    count: u64,
    sum: f64,
    sum_sq: f64,
}

impl WindowedMoment {
    pub fn new(period: usize) -> Self {
        // Zero-seeded: an empty slot leaving the window subtracts nothing.
        let window = SlidingExtremaBuffer::new(period, 0.0, 0.0);
        Self {
            period: window.capacity(),
            window,
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn add(&mut self, value: f64) {
        let oldest = self.window.push(value);
        self.sum += value - oldest;
        self.sum_sq += value * value - oldest * oldest;
        self.count += 1;
    }

    /// Number of samples currently contributing, capped at the period.
    pub fn len(&self) -> usize {
        self.count.min(self.period as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn average(&self) -> f64 {
        match self.len() {
            0 => 0.0,
            n => self.sum / n as f64,
        }
    }

    pub fn variance(&self) -> f64 {
        let n = self.len();
        if n < 2 {
            return 0.0;
        }
        let n_f = n as f64;
        let numerator = n_f * self.sum_sq - self.sum * self.sum;
        if numerator < 0.0 {
            debug!(
                numerator,
                sum = self.sum,
                sum_sq = self.sum_sq,
                "negative variance numerator clamped"
            );
        }
        let variance = numerator.abs() / (n_f * (n_f - 1.0));
        if variance.is_nan() {
            0.0
        } else {
            variance
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Highest sample in the window (zero-padded while warming).
    pub fn high(&self) -> f64 {
        self.window.high()
    }

    /// Lowest sample in the window (zero-padded while warming).
    pub fn low(&self) -> f64 {
        self.window.low()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_std_dev(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    }

    #[test]
    fn empty_moment_reads_zero() {
        let m = WindowedMoment::new(10);
        assert!(m.is_empty());
        assert_eq!(m.average(), 0.0);
        assert_eq!(m.std_dev(), 0.0);
    }

    #[test]
    fn single_sample_has_no_variance() {
        let mut m = WindowedMoment::new(10);
        m.add(42.0);
        assert_eq!(m.len(), 1);
        assert_eq!(m.average(), 42.0);
        assert_eq!(m.variance(), 0.0);
    }

    #[test]
    fn constant_input_has_zero_std_dev() {
        let period = 30;
        let mut m = WindowedMoment::new(period);
        for _ in 0..period {
            m.add(100.0);
        }
        assert!((m.average() - 100.0).abs() < 1e-9);
        assert_eq!(m.std_dev(), 0.0);
    }

    #[test]
    fn average_uses_partial_count_while_warming() {
        let mut m = WindowedMoment::new(10);
        m.add(2.0);
        m.add(4.0);
        assert_eq!(m.len(), 2);
        assert!((m.average() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn window_slides_after_period() {
        let mut m = WindowedMoment::new(3);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            m.add(v);
        }
        assert_eq!(m.len(), 3);
        assert!((m.average() - 4.0).abs() < 1e-12);
        assert!((m.std_dev() - sample_std_dev(&[3.0, 4.0, 5.0])).abs() < 1e-9);
        assert_eq!(m.high(), 5.0);
        assert_eq!(m.low(), 3.0);
    }

    #[test]
    fn std_dev_matches_two_pass_computation() {
        let values: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0)
            .collect();
        let period = 25;
        let mut m = WindowedMoment::new(period);
        for (i, &v) in values.iter().enumerate() {
            m.add(v);
            let start = (i + 1).saturating_sub(period);
            let window = &values[start..=i];
            if window.len() >= 2 {
                let expected = sample_std_dev(window);
                assert!(
                    (m.std_dev() - expected).abs() < 1e-6,
                    "push {i}: got {}, expected {expected}",
                    m.std_dev()
                );
            }
        }
    }

    #[test]
    fn near_constant_large_values_never_negative() {
        let mut m = WindowedMoment::new(50);
        for i in 0..500 {
            m.add(1.0e9 + (i % 2) as f64 * 1.0e-6);
            assert!(m.variance() >= 0.0);
            assert!(m.std_dev().is_finite());
        }
    }
}
