// =============================================================================
// Phased EMA — recovering a slow nominal period from a fast tick stream
// =============================================================================
//
// Ticks usually arrive much faster than the interval an indicator is defined
// over (a price every 2s for a "one sample per minute" EMA).  EMA-ing every
// tick would shrink the effective period by the tick ratio.
//
// Instead writes are spread round-robin over `period_size` lanes:
//
//   lane_t = t mod period_size
//
// and each lane is an independent classic EMA of `periods` samples, so every
// lane sees exactly one sample per nominal interval.  Until each lane has been
// written once (cold phase) a write sets the lane; afterwards it blends:
//
//   lane = value * a + lane * (1 - a),   a = 2 / (periods + 1)
//
// `value()` reads the most recently written lane, so the output follows the
// latest tick while staying smoothed at the intended period.
//
// Higher orders chain further stages on the previous stage's output:
//
//   Single:  e1
//   Double:  2*e1 - e2                    (DEMA)
//   Triple:  3*e1 - 3*e2 + e3             (TEMA)
// =============================================================================

use serde::{Deserialize, Serialize};

use super::ema::multiplier;

/// Order of a [`PhasedEma`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmaOrder {
    Single,
    Double,
    Triple,
}

impl EmaOrder {
    fn stages(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }
}

impl Default for EmaOrder {
    fn default() -> Self {
        Self::Single
    }
}

/// One stage: `period_size` lanes written round-robin.
#[derive(Debug, Clone)]
struct LaneSet {
    lanes: Vec<f64>,
    cursor: usize,
    warm: bool,
    multiplier: f64,
}

impl LaneSet {
    fn new(periods: usize, period_size: usize) -> Self {
        Self {
            lanes: vec![0.0; period_size.max(1)],
            cursor: 0,
            warm: false,
            multiplier: multiplier(periods),
        }
    }

    fn add(&mut self, value: f64) -> f64 {
        let lane = &mut self.lanes[self.cursor];
        if self.warm {
            *lane = value * self.multiplier + *lane * (1.0 - self.multiplier);
        } else {
            *lane = value;
        }

        self.cursor += 1;
        if self.cursor == self.lanes.len() {
            self.cursor = 0;
            self.warm = true;
        }
        self.value()
    }

    fn value(&self) -> f64 {
        let last = if self.cursor == 0 {
            self.lanes.len() - 1
        } else {
            self.cursor - 1
        };
        self.lanes[last]
    }
}

/// Multi-lane exponential average of order 1, 2 or 3.
#[derive(Debug, Clone)]
pub struct PhasedEma {
    stages: Vec<LaneSet>,
    order: EmaOrder,
}

impl PhasedEma {
    /// `periods` is the smoothing period in nominal samples; `period_size` is
    /// the number of ticks per nominal sample (one lane each).
    pub fn new(periods: usize, period_size: usize, order: EmaOrder) -> Self {
        Self {
            stages: (0..order.stages())
                .map(|_| LaneSet::new(periods, period_size))
                .collect(),
            order,
        }
    }

    pub fn single(periods: usize, period_size: usize) -> Self {
        Self::new(periods, period_size, EmaOrder::Single)
    }

    pub fn add(&mut self, value: f64) -> f64 {
        let mut input = value;
        for stage in &mut self.stages {
            input = stage.add(input);
        }
        self.value()
    }

    pub fn value(&self) -> f64 {
        let e1 = self.stages[0].value();
        match self.order {
            EmaOrder::Single => e1,
            EmaOrder::Double => 2.0 * e1 - self.stages[1].value(),
            EmaOrder::Triple => {
                3.0 * e1 - 3.0 * self.stages[1].value() + self.stages[2].value()
            }
        }
    }

    /// True once every lane of the first stage has been seeded.
    pub fn is_warm(&self) -> bool {
        self.stages[0].warm
    }
}
