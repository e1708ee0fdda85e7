//! Per-session guard for the automatic score calculation.
//!
//! A session may auto-calculate at most once. The guard is owned by the
//! caller; manual recalculations never consult it.

use std::sync::atomic::{AtomicU8, Ordering};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::ScoreRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    Idle,
    AutoTriggerFired,
    Calculating,
    Done,
}

impl TriggerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TriggerState::Idle,
            1 => TriggerState::AutoTriggerFired,
            2 => TriggerState::Calculating,
            _ => TriggerState::Done,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            TriggerState::Idle => 0,
            TriggerState::AutoTriggerFired => 1,
            TriggerState::Calculating => 2,
            TriggerState::Done => 3,
        }
    }
}

/// Latch for the automatic calculation: `Idle → AutoTriggerFired →
/// Calculating → Done`. Only the first `try_fire` wins.
#[derive(Debug)]
pub struct AutoTrigger {
    state: AtomicU8,
}

impl Default for AutoTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoTrigger {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(TriggerState::Idle.as_u8()),
        }
    }

    pub fn state(&self) -> TriggerState {
        TriggerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Claim the single automatic run. The latch is set before the caller
    /// starts calculating, so a second caller sees it immediately.
    pub fn try_fire(&self) -> bool {
        let fired = self
            .state
            .compare_exchange(
                TriggerState::Idle.as_u8(),
                TriggerState::AutoTriggerFired.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        debug!(fired, "Auto-trigger claim");
        fired
    }

    /// Move a fired trigger into `Calculating`. Returns false from any other state.
    pub fn begin(&self) -> bool {
        self.advance(TriggerState::AutoTriggerFired, TriggerState::Calculating)
    }

    pub fn finish(&self) -> bool {
        self.advance(TriggerState::Calculating, TriggerState::Done)
    }

    fn advance(&self, from: TriggerState, to: TriggerState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// True when nothing has been scored yet or the stored total is zero.
pub fn should_auto_calculate(latest: Option<&ScoreRecord>) -> bool {
    match latest {
        None => true,
        Some(record) => record.total_score == Decimal::ZERO,
    }
}
