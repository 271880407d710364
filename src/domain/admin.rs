//! Administrator arbitration.
//!
//! Exactly one connection at a time may hold the administrator role. How
//! the role is acquired and what happens when its holder leaves depends on
//! the [`AdminPolicy`] chosen at startup; the two policies are never mixed
//! within one session.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use utoipa::ToSchema;

use super::ParticipantId;
use crate::error::AuctionError;

/// How the administrator role is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminPolicy {
    /// The first participant to join becomes administrator. When the
    /// holder leaves, the role passes to the next participant in join
    /// order. Explicit claims are refused.
    Implicit,
    /// The role starts unassigned and is granted to the first connection
    /// that claims it. When the holder leaves the role becomes unassigned
    /// again. The administrator is kept off the biddable roster.
    #[default]
    ExplicitClaim,
}

impl AdminPolicy {
    /// Returns `true` when the administrator must stay out of the lobby.
    #[must_use]
    pub const fn excludes_admin_from_lobby(self) -> bool {
        matches!(self, Self::ExplicitClaim)
    }
}

impl fmt::Display for AdminPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Implicit => f.write_str("implicit"),
            Self::ExplicitClaim => f.write_str("explicit"),
        }
    }
}

impl FromStr for AdminPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "implicit" | "first_joiner" => Ok(Self::Implicit),
            "explicit" | "explicit_claim" | "claim" => Ok(Self::ExplicitClaim),
            other => Err(format!("unknown admin policy: {other}")),
        }
    }
}

/// Holds the single administrator slot.
#[derive(Debug)]
pub struct AdminArbiter {
    policy: AdminPolicy,
    current: Option<ParticipantId>,
}

impl AdminArbiter {
    /// Creates an arbiter with the slot unassigned.
    #[must_use]
    pub const fn new(policy: AdminPolicy) -> Self {
        Self {
            policy,
            current: None,
        }
    }

    /// Returns the active policy.
    #[must_use]
    pub const fn policy(&self) -> AdminPolicy {
        self.policy
    }

    /// Returns the current administrator, if any.
    #[must_use]
    pub const fn current(&self) -> Option<ParticipantId> {
        self.current
    }

    /// Returns `true` if `id` holds the role.
    #[must_use]
    pub fn is_admin(&self, id: ParticipantId) -> bool {
        self.current == Some(id)
    }

    /// Handles an explicit claim from `id`.
    ///
    /// # Errors
    ///
    /// - [`AuctionError::ClaimNotSupported`] under [`AdminPolicy::Implicit`].
    /// - [`AuctionError::AdminAlreadyHeld`] if the role is taken, including
    ///   by `id` itself.
    pub fn claim(&mut self, id: ParticipantId) -> Result<(), AuctionError> {
        if self.policy == AdminPolicy::Implicit {
            return Err(AuctionError::ClaimNotSupported);
        }
        if self.current.is_some() {
            return Err(AuctionError::AdminAlreadyHeld);
        }
        self.current = Some(id);
        Ok(())
    }

    /// Assigns the role to `id` if nobody holds it and the policy is
    /// implicit. Returns `true` when the role changed hands.
    pub fn on_join(&mut self, id: ParticipantId) -> bool {
        if self.policy != AdminPolicy::Implicit || self.current.is_some() {
            return false;
        }
        self.current = Some(id);
        true
    }

    /// Releases the role if `id` holds it.
    ///
    /// Under the implicit policy the role passes to `successor`; under the
    /// explicit policy it becomes unassigned. Returns `true` when the
    /// holder changed.
    pub fn release(&mut self, id: ParticipantId, successor: Option<ParticipantId>) -> bool {
        if !self.is_admin(id) {
            return false;
        }
        self.current = match self.policy {
            AdminPolicy::Implicit => successor,
            AdminPolicy::ExplicitClaim => None,
        };
        true
    }
}
