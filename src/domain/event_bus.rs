//! Broadcast channel for outbound session events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The session
//! publishes every [`Outbound`] through the bus, and every WebSocket
//! connection subscribes and forwards the events addressed to it.

use tokio::sync::broadcast;

use super::{Outbound, ParticipantId, ServerEvent};

/// Broadcast bus for [`Outbound`] events.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, the oldest events are dropped for lagging
/// receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Outbound>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, outbound: Outbound) -> usize {
        tracing::trace!(event = outbound.event.event_type_str(), "publish");
        self.sender.send(outbound).unwrap_or(0)
    }

    /// Publishes `event` to every connection.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        self.publish(Outbound::all(event))
    }

    /// Publishes `event` to connection `id` only.
    pub fn send_to(&self, id: ParticipantId, event: ServerEvent) -> usize {
        self.publish(Outbound::only(id, event))
    }

    /// Creates a new receiver that will receive all future events.
    ///
    /// Each WebSocket connection should call this once on connect, before
    /// registering with the coordinator, so it cannot miss its greeting.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
