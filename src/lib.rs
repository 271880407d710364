//! # auction-gateway
//!
//! WebSocket coordinator for timed sealed-bid auction rounds inside a
//! shared lobby.
//!
//! Participants connect over WebSocket, join a lobby, and one of them acts
//! as administrator. The administrator calls items; each call opens a
//! fixed-length round during which lobby members submit private offers.
//! When the round's deadline passes the server ranks every offer, names a
//! winner and reveals the ranking to everyone. The server is the only
//! authority on time, so all deadlines are absolute server timestamps and
//! clients correct their clocks with probes.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler (ws/)            ── clock probes answered in place
//!     ├── REST Handlers (api/)        ── health, session snapshot
//!     │
//!     ├── Coordinator (service/)      ── one task, commands + timers
//!     ├── Session (service/)
//!     │
//!     ├── Lobby / Admin / Round / Ledger (domain/)
//!     └── EventBus (domain/)          ── fan-out to every connection
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
