//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::domain::{Clock, ClockSync, EventBus, SystemClock};
use crate::service::{Coordinator, CoordinatorHandle, Session};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Sender side of the session coordinator.
    pub coordinator: CoordinatorHandle,
    /// Event bus for WebSocket fan-out.
    pub event_bus: EventBus,
    /// Server clock for probe replies.
    pub clock_sync: ClockSync,
}

impl AppState {
    /// Builds the session, spawns its coordinator on the current tokio
    /// runtime, and returns the shared state.
    #[must_use]
    pub fn start(config: &GatewayConfig) -> Self {
        Self::start_with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`AppState::start`] with an explicit server clock.
    #[must_use]
    pub fn start_with_clock(config: &GatewayConfig, clock: Arc<dyn Clock>) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let session = Session::new(config.session_settings(), event_bus.clone());
        let (coordinator, _task) = Coordinator::spawn(
            session,
            Arc::clone(&clock),
            config.command_queue_capacity,
        );
        tracing::info!(policy = %config.admin_policy, "session coordinator running");

        Self {
            coordinator,
            event_bus,
            clock_sync: ClockSync::new(clock),
        }
    }
}
