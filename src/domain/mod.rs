//! Domain layer: session entities, sealed-bid ledger, and event system.
//!
//! This module contains the server-side domain model: connection identity,
//! the lobby roster, administrator arbitration, rounds and their bid
//! ledgers, the server clock, and the event bus that fans state changes
//! out to every connection.

pub mod admin;
pub mod clock;
pub mod event_bus;
pub mod ledger;
pub mod lobby;
pub mod participant_id;
pub mod round;
pub mod session_event;

pub use admin::{AdminArbiter, AdminPolicy};
pub use clock::{Clock, ClockReply, ClockSample, ClockSync, SystemClock};
pub use event_bus::EventBus;
pub use ledger::{BidLedger, Offer, Settlement};
pub use lobby::{LobbyRegistry, Participant};
pub use participant_id::ParticipantId;
pub use round::{Round, RoundEpoch, RoundPhase};
pub use session_event::{Audience, Outbound, ServerEvent};
