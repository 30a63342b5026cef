// =============================================================================
// Signal State Machine — entry / exit transitions from horizon signals
// =============================================================================
//
// Consumes only the boolean outputs of one horizon snapshot:
//
//   Flat --(stable && buy_signal)--------------------------> Long
//   Long --(sell_signal)-----------------------------------> Flat
//   Long --(reversal_warning)------------------------------> Flat
//
// Unstable horizons never trigger a transition.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::types::HorizonSnapshot;

/// Position state driven by horizon signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalState {
    Flat,
    Long { entered_at_tick: u64, entry_price: f64 },
}

impl Default for SignalState {
    fn default() -> Self {
        Self::Flat
    }
}

/// Why a long was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    SellSignal,
    ReversalWarning,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SellSignal => write!(f, "sell signal"),
            Self::ReversalWarning => write!(f, "reversal warning"),
        }
    }
}

/// A transition produced by [`SignalState::step`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalEvent {
    Enter {
        tick: u64,
        price: f64,
    },
    Exit {
        tick: u64,
        price: f64,
        /// Price change since entry, in percent.
        change_pct: f64,
        held_ticks: u64,
        reason: ExitReason,
    },
}

impl SignalState {
    /// Advance on one snapshot.  Returns the transition, if any.
    pub fn step(&mut self, tick: u64, price: f64, snapshot: &HorizonSnapshot) -> Option<SignalEvent> {
        if !snapshot.stable {
            return None;
        }

        match *self {
            Self::Flat if snapshot.buy_signal => {
                *self = Self::Long { entered_at_tick: tick, entry_price: price };
                Some(SignalEvent::Enter { tick, price })
            }
            Self::Flat => None,
            Self::Long { entered_at_tick, entry_price } => {
                let reason = if snapshot.sell_signal {
                    ExitReason::SellSignal
                } else if snapshot.reversal_warning {
                    ExitReason::ReversalWarning
                } else {
                    return None;
                };
                let change_pct = if entry_price != 0.0 {
                    (price - entry_price) / entry_price * 100.0
                } else {
                    0.0
                };
                *self = Self::Flat;
                Some(SignalEvent::Exit {
                    tick,
                    price,
                    change_pct,
                    held_ticks: tick.saturating_sub(entered_at_tick),
                    reason,
                })
            }
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long { .. })
    }
}
