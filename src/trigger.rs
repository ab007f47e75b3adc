//! Bulk-clear trigger.
//!
//! Fires when two configured lines are active at the same time and at least
//! the rate-limit interval has passed since it last fired. It is a rate
//! limiter, not an edge detector: holding both lines longer than the
//! interval fires it again.

use crate::input::InputMonitor;

/// Default minimum spacing between two clears.
pub const DEFAULT_CLEAR_INTERVAL_MS: u64 = 2000;

/// Two-line combination that wipes the logs.
#[derive(Debug, Clone)]
pub struct BulkClearTrigger {
    first: u8,
    second: u8,
    interval_ms: u64,
    last_triggered_at: Option<u64>,
}

impl BulkClearTrigger {
    /// Watch lines `first` and `second`, firing at most once per `interval_ms`.
    pub const fn new(first: u8, second: u8, interval_ms: u64) -> Self {
        Self {
            first,
            second,
            interval_ms,
            last_triggered_at: None,
        }
    }

    /// The two line ids of the combination.
    pub fn pair(&self) -> (u8, u8) {
        (self.first, self.second)
    }

    /// When the trigger last fired.
    pub fn last_triggered_at(&self) -> Option<u64> {
        self.last_triggered_at
    }

    /// Decide from explicit line states. Returns `true` when the clear
    /// should run now, and records `now_ms` as the trigger time.
    pub fn evaluate(&mut self, now_ms: u64, first_active: bool, second_active: bool) -> bool {
        if !(first_active && second_active) {
            return false;
        }
        let ready = self
            .last_triggered_at
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.interval_ms);
        if ready {
            self.last_triggered_at = Some(now_ms);
        }
        ready
    }

    /// Decide from the monitor's stable line states.
    pub fn poll<const N: usize>(&mut self, now_ms: u64, monitor: &InputMonitor<N>) -> bool {
        let first = monitor.is_active(self.first);
        let second = monitor.is_active(self.second);
        self.evaluate(now_ms, first, second)
    }
}
