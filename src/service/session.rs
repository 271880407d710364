//! Session service: the auction lifecycle state machine.
//!
//! [`Session`] owns the lobby roster, the administrator slot, the default
//! round length and the single active round. Every mutation method
//! follows the pattern: check guards → mutate → emit events → return.
//! Guards that fail return an [`AuctionError`] and leave state and the
//! event bus untouched.
//!
//! `Session` is deliberately synchronous and never awaits. The
//! [`super::Coordinator`] owns it exclusively and feeds it one command at
//! a time, which is what makes the transition history strictly sequential.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::round::normalize_duration;
use crate::domain::{
    AdminArbiter, AdminPolicy, EventBus, LobbyRegistry, Participant, ParticipantId, Round,
    RoundEpoch, RoundPhase, ServerEvent, Settlement,
};
use crate::error::AuctionError;

/// Tunables for one session, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Administrator arbitration policy.
    pub admin_policy: AdminPolicy,
    /// Round length used when a call carries no override.
    pub default_duration_secs: u64,
    /// Longest round length accepted.
    pub max_duration_secs: u64,
    /// Extra time after the deadline before settlement fires.
    pub settlement_grace: Duration,
    /// Cadence of authoritative `round-tick` broadcasts.
    pub tick_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            admin_policy: AdminPolicy::ExplicitClaim,
            default_duration_secs: 10,
            max_duration_secs: 3600,
            settlement_grace: Duration::from_millis(250),
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Timers the coordinator must arm after a round opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSchedule {
    /// Round the timers belong to.
    pub epoch: RoundEpoch,
    /// Delay until settlement (deadline plus grace).
    pub settle_in: Duration,
    /// Period of the authoritative tick.
    pub tick_every: Duration,
}

/// Read-only view of the open round. Never carries amounts.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    /// Round token.
    #[schema(value_type = u64)]
    pub epoch: RoundEpoch,
    /// Item label.
    pub label: String,
    /// Bidding window length.
    pub duration_seconds: u64,
    /// Absolute deadline, epoch millis.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[schema(value_type = i64)]
    pub deadline: DateTime<Utc>,
    /// Participants that have bid, in bid order.
    pub bidders: Vec<ParticipantId>,
}

/// Read-only view of the whole session.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Lobby roster in join order.
    pub roster: Vec<Participant>,
    /// Current administrator.
    pub admin_id: Option<ParticipantId>,
    /// Administrator arbitration policy.
    pub admin_policy: AdminPolicy,
    /// Default round length.
    pub duration_seconds: u64,
    /// Lifecycle phase.
    pub phase: RoundPhase,
    /// The open round, if any.
    pub round: Option<RoundSummary>,
}

/// Owner of all mutable session state.
#[derive(Debug)]
pub struct Session {
    lobby: LobbyRegistry,
    arbiter: AdminArbiter,
    duration_secs: u64,
    round: Option<Round>,
    phase: RoundPhase,
    last_epoch: RoundEpoch,
    settings: SessionSettings,
    event_bus: EventBus,
}

impl Session {
    /// Creates an empty session publishing through `event_bus`.
    #[must_use]
    pub fn new(settings: SessionSettings, event_bus: EventBus) -> Self {
        Self {
            lobby: LobbyRegistry::new(),
            arbiter: AdminArbiter::new(settings.admin_policy),
            duration_secs: settings
                .default_duration_secs
                .clamp(1, settings.max_duration_secs.max(1)),
            round: None,
            phase: RoundPhase::Idle,
            last_epoch: RoundEpoch::default(),
            settings,
            event_bus,
        }
    }

    /// Sends the current state privately to a newly opened connection.
    pub fn connect(&self, id: ParticipantId, now: DateTime<Utc>) {
        let bus = &self.event_bus;
        let _ = bus.send_to(id, ServerEvent::Welcome { participant_id: id });
        let _ = bus.send_to(id, ServerEvent::RosterUpdate(self.lobby.snapshot()));
        let _ = bus.send_to(
            id,
            ServerEvent::AdminUpdate {
                admin_id: self.arbiter.current(),
            },
        );
        let _ = bus.send_to(
            id,
            ServerEvent::DurationUpdate {
                seconds: self.duration_secs,
            },
        );
        if let Some(round) = &self.round {
            let _ = bus.send_to(id, ServerEvent::round_started(round, now));
            for participant_id in round.ledger.bidders() {
                let _ = bus.send_to(id, ServerEvent::BidMarked { participant_id });
            }
        }
    }

    /// Adds `id` to the lobby roster.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionError::AdminExcluded`] when the administrator tries
    /// to join under a policy that keeps it off the roster.
    pub fn join(
        &mut self,
        id: ParticipantId,
        display_name: Option<&str>,
    ) -> Result<Participant, AuctionError> {
        if self.arbiter.policy().excludes_admin_from_lobby() && self.arbiter.is_admin(id) {
            return Err(AuctionError::AdminExcluded);
        }
        let participant = self.lobby.join(id, display_name);
        tracing::info!(participant = %id, name = %participant.display_name, "joined lobby");
        self.publish_roster();

        if self.arbiter.on_join(id) {
            self.on_admin_changed();
        }
        Ok(participant)
    }

    /// Removes `id` from the roster and releases the administrator role if
    /// it holds it. Returns `true` if anything changed.
    ///
    /// An open round is never cancelled; bids already placed by `id` stay
    /// in the ledger.
    pub fn leave(&mut self, id: ParticipantId) -> bool {
        let removed = self.lobby.leave(id).is_some();
        if removed {
            tracing::info!(participant = %id, "left lobby");
            self.publish_roster();
        }

        let successor = self.lobby.first().map(|p| p.id);
        let released = self.arbiter.release(id, successor);
        if released {
            tracing::info!(
                participant = %id,
                successor = ?self.arbiter.current(),
                "administrator released"
            );
            self.on_admin_changed();
        }
        removed || released
    }

    /// Handles an explicit administrator claim.
    ///
    /// # Errors
    ///
    /// Propagates [`AuctionError::AdminAlreadyHeld`] and
    /// [`AuctionError::ClaimNotSupported`] from the arbiter.
    pub fn claim_admin(&mut self, id: ParticipantId) -> Result<(), AuctionError> {
        self.arbiter.claim(id)?;
        tracing::info!(participant = %id, "administrator claimed");

        if self.arbiter.policy().excludes_admin_from_lobby() && self.lobby.leave(id).is_some() {
            self.publish_roster();
        }
        self.on_admin_changed();
        Ok(())
    }

    /// Changes the default round length.
    ///
    /// # Errors
    ///
    /// - [`AuctionError::NotAdmin`] if `id` is not the administrator.
    /// - [`AuctionError::InvalidDuration`] for unusable values.
    pub fn set_duration(&mut self, id: ParticipantId, seconds: f64) -> Result<u64, AuctionError> {
        self.require_admin(id)?;
        let secs = normalize_duration(seconds, self.settings.max_duration_secs)?;
        self.duration_secs = secs;
        tracing::info!(seconds = secs, "round duration updated");
        let _ = self
            .event_bus
            .broadcast(ServerEvent::DurationUpdate { seconds: secs });
        Ok(secs)
    }

    /// Opens a round for `label` (the `Idle → Open` transition).
    ///
    /// # Errors
    ///
    /// - [`AuctionError::NotAdmin`] if `id` is not the administrator.
    /// - [`AuctionError::RoundInProgress`] if a round is already open.
    /// - [`AuctionError::InvalidDuration`] for an unusable override.
    pub fn call_item(
        &mut self,
        id: ParticipantId,
        label: Option<&str>,
        duration_override: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<RoundSchedule, AuctionError> {
        self.require_admin(id)?;
        if self.round.is_some() {
            return Err(AuctionError::RoundInProgress);
        }
        let duration_secs = match duration_override {
            Some(seconds) => normalize_duration(seconds, self.settings.max_duration_secs)?,
            None => self.duration_secs,
        };

        let epoch = self.last_epoch.next();
        self.last_epoch = epoch;
        let round = Round::open(epoch, label, duration_secs, now);
        let settle_in = round
            .remaining(now)
            .saturating_add(self.settings.settlement_grace);

        tracing::info!(%epoch, label = %round.label, duration_secs, "round opened");
        let _ = self
            .event_bus
            .broadcast(ServerEvent::round_started(&round, now));

        self.round = Some(round);
        self.phase = RoundPhase::Open;

        Ok(RoundSchedule {
            epoch,
            settle_in,
            tick_every: self.settings.tick_interval,
        })
    }

    /// Records a sealed bid from `id`.
    ///
    /// # Errors
    ///
    /// - [`AuctionError::NoActiveRound`] outside an open round.
    /// - [`AuctionError::AdminExcluded`] if `id` is the administrator.
    /// - [`AuctionError::NotInLobby`] if `id` has not joined.
    /// - [`AuctionError::InvalidAmount`] for negative or non-finite amounts.
    pub fn submit_bid(&mut self, id: ParticipantId, amount: f64) -> Result<(), AuctionError> {
        let round = self.round.as_mut().ok_or(AuctionError::NoActiveRound)?;
        if self.arbiter.is_admin(id) {
            return Err(AuctionError::AdminExcluded);
        }
        let name = self.lobby.name_of(id).ok_or(AuctionError::NotInLobby)?;
        round.ledger.record(id, name, amount)?;

        tracing::debug!(participant = %id, epoch = %round.epoch, "bid accepted");
        let _ = self
            .event_bus
            .send_to(id, ServerEvent::BidAccepted { amount });
        let _ = self
            .event_bus
            .broadcast(ServerEvent::BidMarked { participant_id: id });
        Ok(())
    }

    /// Broadcasts the authoritative `(serverNow, deadline)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionError::StaleTimer`] if `epoch` is not the open
    /// round.
    pub fn tick(&self, epoch: RoundEpoch, now: DateTime<Utc>) -> Result<(), AuctionError> {
        let round = self
            .round
            .as_ref()
            .filter(|r| r.epoch == epoch)
            .ok_or(AuctionError::StaleTimer(epoch.get()))?;
        let _ = self.event_bus.broadcast(ServerEvent::RoundTick {
            server_now: now,
            deadline: round.deadline,
        });
        Ok(())
    }

    /// Settles the round identified by `epoch` (`Open → Settling → Idle`).
    ///
    /// Always succeeds for the current round, including one with no bids.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionError::StaleTimer`] if `epoch` is not the open
    /// round, in which case nothing is broadcast.
    pub fn settle(&mut self, epoch: RoundEpoch) -> Result<Settlement, AuctionError> {
        let round = self
            .round
            .take_if(|r| r.epoch == epoch)
            .ok_or(AuctionError::StaleTimer(epoch.get()))?;
        self.phase = RoundPhase::Settling;

        let Round { label, ledger, .. } = round;
        let settlement = ledger.settle(&self.lobby);
        tracing::info!(
            %epoch,
            label = %label,
            offers = settlement.offers.len(),
            winner = ?settlement.winner.as_ref().map(|w| &w.name),
            "round settled"
        );
        let _ = self
            .event_bus
            .broadcast(ServerEvent::round_settled(label, settlement.clone()));

        self.phase = RoundPhase::Idle;
        Ok(settlement)
    }

    /// Returns a read-only snapshot of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            roster: self.lobby.snapshot(),
            admin_id: self.arbiter.current(),
            admin_policy: self.arbiter.policy(),
            duration_seconds: self.duration_secs,
            phase: self.phase,
            round: self.round.as_ref().map(|r| RoundSummary {
                epoch: r.epoch,
                label: r.label.clone(),
                duration_seconds: r.duration_secs,
                deadline: r.deadline,
                bidders: r.ledger.bidders(),
            }),
        }
    }

    /// Returns the current administrator.
    #[must_use]
    pub fn admin(&self) -> Option<ParticipantId> {
        self.arbiter.current()
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Returns the default round length.
    #[must_use]
    pub const fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Returns the epoch of the open round, if any.
    #[must_use]
    pub fn active_epoch(&self) -> Option<RoundEpoch> {
        self.round.as_ref().map(|r| r.epoch)
    }

    fn require_admin(&self, id: ParticipantId) -> Result<(), AuctionError> {
        if self.arbiter.is_admin(id) {
            Ok(())
        } else {
            Err(AuctionError::NotAdmin)
        }
    }

    fn publish_roster(&self) {
        let _ = self
            .event_bus
            .broadcast(ServerEvent::RosterUpdate(self.lobby.snapshot()));
    }

    /// Announces a new administrator (or none) and keeps the new holder
    /// out of the open round's ledger.
    fn on_admin_changed(&mut self) {
        let admin_id = self.arbiter.current();
        if let (Some(admin), Some(round)) = (admin_id, self.round.as_mut())
            && round.ledger.withdraw(admin)
        {
            tracing::info!(participant = %admin, "withdrew bid of new administrator");
        }
        let _ = self.event_bus.broadcast(ServerEvent::AdminUpdate { admin_id });
        let _ = self.event_bus.broadcast(ServerEvent::DurationUpdate {
            seconds: self.duration_secs,
        });
    }
}
