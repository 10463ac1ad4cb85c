use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PledgeIntent {
    pub id: String,
    pub amount_minor_units: u64,
    pub invoice_ref: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PledgeState {
    Pending,
    Settled,
    Expired,
    Failed,
}

impl PledgeState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PledgeStatus {
    pub state: PledgeState,
    #[serde(default)]
    pub settled_at: Option<DateTime<Utc>>,
}

impl PledgeStatus {
    pub fn pending() -> Self {
        Self {
            state: PledgeState::Pending,
            settled_at: None,
        }
    }

    pub fn settled(at: DateTime<Utc>) -> Self {
        Self {
            state: PledgeState::Settled,
            settled_at: Some(at),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Rejects a `settledAt` on anything but a settled pledge.
    pub fn validate(self) -> Result<Self> {
        if self.settled_at.is_some() && self.state != PledgeState::Settled {
            return Err(CacheError::malformed(
                "Invalid pledge status: settledAt set on unsettled pledge",
            ));
        }
        Ok(self)
    }
}

/// Adaptive polling intervals for pledge settlement.
///
/// Polls every `fast_interval` during the first `fast_window`, then every
/// `slow_interval` until `ceiling`, after which polling gives up.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(default)]
pub struct PollSchedule {
    pub fast_interval_ms: u64,
    pub fast_window_ms: u64,
    pub slow_interval_ms: u64,
    pub ceiling_ms: u64,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            fast_interval_ms: 3_000,
            fast_window_ms: 120_000,
            slow_interval_ms: 10_000,
            ceiling_ms: 720_000,
        }
    }
}

impl PollSchedule {
    pub fn validate(self) -> Result<Self> {
        if self.fast_interval_ms == 0 || self.slow_interval_ms == 0 {
            return Err(CacheError::ValidationError(
                "Poll intervals must be positive".to_string(),
            ));
        }
        if self.fast_window_ms > self.ceiling_ms {
            return Err(CacheError::ValidationError(
                "Fast poll window must not exceed the ceiling".to_string(),
            ));
        }
        Ok(self)
    }

    /// Delay before the next poll, or `None` once polling must stop.
    pub fn next_delay(&self, elapsed: Duration, state: PledgeState) -> Option<Duration> {
        if state.is_terminal() {
            return None;
        }
        let elapsed_ms = elapsed.as_millis();
        if elapsed_ms < u128::from(self.fast_window_ms) {
            Some(Duration::from_millis(self.fast_interval_ms))
        } else if elapsed_ms < u128::from(self.ceiling_ms) {
            Some(Duration::from_millis(self.slow_interval_ms))
        } else {
            None
        }
    }
}

/// [`PollSchedule::next_delay`] with the default schedule.
pub fn next_poll_delay(elapsed: Duration, state: PledgeState) -> Option<Duration> {
    PollSchedule::default().next_delay(elapsed, state)
}
