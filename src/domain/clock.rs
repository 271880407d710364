//! Server-authoritative time and round-trip clock probes.
//!
//! Clients estimate their offset from the server clock by sending their
//! local send time as an `echo` and timing the reply. The server side of
//! that exchange is [`ClockSync::probe`]; the client-side arithmetic is
//! [`ClockSample::offset_ms`].

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the server's reference time.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current server time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Server reply to a clock probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReply {
    /// Server time when the reply was produced.
    pub server_now: DateTime<Utc>,
    /// The client's echo, verbatim. `None` for unprompted replies.
    pub echo: Option<f64>,
}

/// Answers clock probes against a shared [`Clock`].
#[derive(Debug, Clone)]
pub struct ClockSync {
    clock: Arc<dyn Clock>,
}

impl ClockSync {
    /// Creates a probe responder over `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Replies to a probe, echoing the client's value back.
    #[must_use]
    pub fn probe(&self, echo: f64) -> ClockReply {
        ClockReply {
            server_now: self.clock.now(),
            echo: Some(echo),
        }
    }

    /// Unprompted reply sent when a connection opens.
    #[must_use]
    pub fn greeting(&self) -> ClockReply {
        ClockReply {
            server_now: self.clock.now(),
            echo: None,
        }
    }
}

impl Default for ClockSync {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

/// One completed probe as seen by a client, all times in epoch millis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSample {
    /// Client time when the probe was sent (the echo).
    pub sent_at_ms: f64,
    /// Server time carried in the reply.
    pub server_now_ms: f64,
    /// Client time when the reply arrived.
    pub received_at_ms: f64,
}

impl ClockSample {
    /// Round-trip time of the probe, never negative.
    #[must_use]
    pub fn round_trip_ms(&self) -> f64 {
        (self.received_at_ms - self.sent_at_ms).max(0.0)
    }

    /// Estimated `server - client` offset assuming symmetric latency.
    #[must_use]
    pub fn offset_ms(&self) -> f64 {
        let one_way = self.round_trip_ms() / 2.0;
        self.server_now_ms - (self.sent_at_ms + one_way)
    }
}
