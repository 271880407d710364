//! Server-to-client events reflecting session state changes.
//!
//! Every accepted transition emits one or more [`ServerEvent`]s through the
//! [`super::EventBus`], each wrapped in an [`Outbound`] that names its
//! [`Audience`]. Bid amounts only ever appear in events addressed to the
//! bidder alone, or in the settlement result.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ParticipantId;
use super::clock::ClockReply;
use super::ledger::{Offer, Settlement};
use super::lobby::Participant;
use super::round::Round;

/// Wire event sent from server to clients.
///
/// Serialized as `{"type": "<kebab-case>", "payload": {...}}`. Times are
/// Unix epoch milliseconds of the server clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// The recipient's own connection id, sent once on connect.
    Welcome {
        /// Id assigned to this connection.
        participant_id: ParticipantId,
    },

    /// Lobby roster in join order.
    RosterUpdate(Vec<Participant>),

    /// Current administrator, or `null` when unassigned.
    AdminUpdate {
        /// Administrator connection id.
        admin_id: Option<ParticipantId>,
    },

    /// Default round length.
    DurationUpdate {
        /// Whole seconds.
        seconds: u64,
    },

    /// A round opened.
    RoundStarted {
        /// Item label.
        label: String,
        /// Bidding window length.
        duration_seconds: u64,
        /// Absolute deadline.
        #[serde(with = "chrono::serde::ts_milliseconds")]
        deadline: DateTime<Utc>,
        /// Server time at emission, for countdown alignment.
        #[serde(with = "chrono::serde::ts_milliseconds")]
        server_now: DateTime<Utc>,
    },

    /// Periodic authoritative time while a round is open.
    RoundTick {
        /// Server time at emission.
        #[serde(with = "chrono::serde::ts_milliseconds")]
        server_now: DateTime<Utc>,
        /// Deadline of the open round.
        #[serde(with = "chrono::serde::ts_milliseconds")]
        deadline: DateTime<Utc>,
    },

    /// Private acknowledgment of the submitter's accepted bid.
    BidAccepted {
        /// The amount now in force.
        amount: f64,
    },

    /// Public marker that a participant has bid. Never carries the amount.
    BidMarked {
        /// Who bid.
        participant_id: ParticipantId,
    },

    /// A round closed and its bids are revealed.
    RoundSettled {
        /// Item label.
        label: String,
        /// All bids, ranked.
        offers: Vec<Offer>,
        /// Highest bid, or `null` when nobody bid.
        winner: Option<Offer>,
    },

    /// Server clock reading, in reply to a probe or on connect.
    ClockReply {
        /// Server time at emission.
        #[serde(with = "chrono::serde::ts_milliseconds")]
        server_now: DateTime<Utc>,
        /// The client's probe value, when replying to one.
        #[serde(skip_serializing_if = "Option::is_none")]
        echo: Option<f64>,
    },
}

impl ServerEvent {
    /// Builds the `round-started` event for `round`.
    #[must_use]
    pub fn round_started(round: &Round, server_now: DateTime<Utc>) -> Self {
        Self::RoundStarted {
            label: round.label.clone(),
            duration_seconds: round.duration_secs,
            deadline: round.deadline,
            server_now,
        }
    }

    /// Builds the `round-settled` event from a settlement.
    #[must_use]
    pub fn round_settled(label: String, settlement: Settlement) -> Self {
        Self::RoundSettled {
            label,
            offers: settlement.offers,
            winner: settlement.winner,
        }
    }

    /// Returns the wire tag as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::RosterUpdate(_) => "roster-update",
            Self::AdminUpdate { .. } => "admin-update",
            Self::DurationUpdate { .. } => "duration-update",
            Self::RoundStarted { .. } => "round-started",
            Self::RoundTick { .. } => "round-tick",
            Self::BidAccepted { .. } => "bid-accepted",
            Self::BidMarked { .. } => "bid-marked",
            Self::RoundSettled { .. } => "round-settled",
            Self::ClockReply { .. } => "clock-reply",
        }
    }
}

impl From<ClockReply> for ServerEvent {
    fn from(reply: ClockReply) -> Self {
        Self::ClockReply {
            server_now: reply.server_now,
            echo: reply.echo,
        }
    }
}

/// Which connections an event is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every connection.
    All,
    /// A single connection.
    Only(ParticipantId),
}

impl Audience {
    /// Returns `true` if connection `id` should receive the event.
    #[must_use]
    pub fn includes(self, id: ParticipantId) -> bool {
        match self {
            Self::All => true,
            Self::Only(target) => target == id,
        }
    }
}

/// An event together with its audience, as carried on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// Recipients.
    pub audience: Audience,
    /// Payload.
    pub event: ServerEvent,
}

impl Outbound {
    /// Addresses `event` to every connection.
    #[must_use]
    pub const fn all(event: ServerEvent) -> Self {
        Self {
            audience: Audience::All,
            event,
        }
    }

    /// Addresses `event` to connection `id` only.
    #[must_use]
    pub const fn only(id: ParticipantId, event: ServerEvent) -> Self {
        Self {
            audience: Audience::Only(id),
            event,
        }
    }
}
