//! One sealed-bid auction round.
//!
//! A [`Round`] is created when the administrator calls an item and is
//! consumed by settlement. Its deadline is fixed at creation.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ledger::BidLedger;
use crate::error::AuctionError;

/// Longest item label kept, in characters.
pub const MAX_LABEL_CHARS: usize = 64;

/// Label used when the administrator calls an item without a usable one.
pub const PLACEHOLDER_LABEL: &str = "Unnamed item";

/// Monotonic round token.
///
/// Every round gets a fresh epoch, and every timer scheduled for a round
/// carries it. A timer whose epoch no longer matches the active round is
/// stale and must do nothing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoundEpoch(u64);

impl RoundEpoch {
    /// Returns the epoch following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoundEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle phase of the session's auction slot.
///
/// `Settling` only exists inside the settlement handler and is never
/// observable from outside the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// No round; the administrator may call an item.
    Idle,
    /// Accepting bids until the settlement timer fires.
    Open,
    /// Computing and broadcasting the result.
    Settling,
}

/// The single active round.
#[derive(Debug)]
pub struct Round {
    /// Token distinguishing this round from stale timers.
    pub epoch: RoundEpoch,
    /// Free-text item label.
    pub label: String,
    /// Bidding window length in whole seconds.
    pub duration_secs: u64,
    /// When the round was opened (server clock).
    pub started_at: DateTime<Utc>,
    /// Absolute deadline (server clock). Never extended.
    pub deadline: DateTime<Utc>,
    /// Sealed bids.
    pub ledger: BidLedger,
}

impl Round {
    /// Opens a round at `now` lasting `duration_secs`.
    #[must_use]
    pub fn open(
        epoch: RoundEpoch,
        label: Option<&str>,
        duration_secs: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let span = i64::try_from(duration_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            epoch,
            label: sanitize_label(label),
            duration_secs,
            started_at: now,
            deadline: now.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC),
            ledger: BidLedger::new(),
        }
    }

    /// Returns the time left until the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.deadline - now).to_std().unwrap_or_default()
    }
}

/// Normalizes a requested round length to whole seconds.
///
/// Fractional values round up with a floor of one second.
///
/// # Errors
///
/// Returns [`AuctionError::InvalidDuration`] if `seconds` is not finite,
/// is not positive, or exceeds `max_secs`.
pub fn normalize_duration(seconds: f64, max_secs: u64) -> Result<u64, AuctionError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(AuctionError::InvalidDuration(seconds));
    }
    let whole = seconds.ceil().max(1.0);
    #[allow(clippy::cast_precision_loss)]
    let limit = max_secs as f64;
    if whole > limit {
        return Err(AuctionError::InvalidDuration(seconds));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = whole as u64;
    Ok(secs)
}

fn sanitize_label(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return PLACEHOLDER_LABEL.to_string();
    }
    trimmed.chars().take(MAX_LABEL_CHARS).collect()
}
