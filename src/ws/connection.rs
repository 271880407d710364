//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! forwarding client requests to the coordinator and delivering the
//! events addressed to this participant.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{ClientMessage, encode};
use crate::app_state::AppState;
use crate::domain::{Audience, Outbound, ParticipantId, ServerEvent};

type WsSink = SplitSink<WebSocket, Message>;

/// Decides which bus events a connection forwards.
///
/// Nothing is forwarded until the connection's own `welcome` arrives.
/// Broadcasts published before that are already reflected in the private
/// state sync that follows the welcome, so the client sees the welcome
/// first and no state twice.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryFilter {
    id: ParticipantId,
    synced: bool,
}

impl DeliveryFilter {
    /// Creates a filter for connection `id`, not yet synced.
    #[must_use]
    pub const fn new(id: ParticipantId) -> Self {
        Self { id, synced: false }
    }

    /// Returns `true` if `outbound` should be sent to this connection.
    pub fn admit(&mut self, outbound: &Outbound) -> bool {
        if !self.synced {
            self.synced = outbound.audience == Audience::Only(self.id)
                && matches!(outbound.event, ServerEvent::Welcome { .. });
            return self.synced;
        }
        outbound.audience.includes(self.id)
    }
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Assigns a fresh [`ParticipantId`] and greets with the server time.
/// - Answers clock probes directly; everything else goes to the
///   coordinator in arrival order.
/// - Forwards bus events whose audience includes this participant, from
///   its `welcome` onward (see [`DeliveryFilter`]).
/// - Reports the disconnect when the socket closes.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let id = ParticipantId::new();
    // Subscribe before registering so the private state sync is not missed.
    let mut event_rx = state.event_bus.subscribe();
    let mut filter = DeliveryFilter::new(id);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let greeting = ServerEvent::from(state.clock_sync.greeting());
    if !send_event(&mut ws_tx, &greeting).await {
        return;
    }
    if let Err(err) = state.coordinator.connect(id).await {
        tracing::warn!(participant = %id, %err, "rejecting ws connection");
        return;
    }
    tracing::info!(participant = %id, "ws connection opened");

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match ClientMessage::parse(text.as_str()) {
                            Ok(ClientMessage::ClockProbe { echo }) => {
                                let reply = ServerEvent::from(state.clock_sync.probe(echo));
                                if !send_event(&mut ws_tx, &reply).await {
                                    break;
                                }
                            }
                            Ok(message) => {
                                if let Some(request) = message.into_request() {
                                    tracing::trace!(
                                        participant = %id,
                                        kind = request.kind(),
                                        "ws request"
                                    );
                                    if state.coordinator.dispatch(id, request).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(err) => {
                                tracing::debug!(
                                    participant = %id,
                                    %err,
                                    "dropping malformed ws frame"
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(participant = %id, %err, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Event from EventBus
            event = event_rx.recv() => {
                match event {
                    Ok(outbound) => {
                        if filter.admit(&outbound)
                            && !send_event(&mut ws_tx, &outbound.event).await
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            participant = %id,
                            lagged = n,
                            "ws client lagged behind event bus"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    if let Err(err) = state.coordinator.disconnect(id).await {
        tracing::debug!(participant = %id, %err, "disconnect not delivered");
    }
    tracing::info!(participant = %id, "ws connection closed");
}

/// Writes one event as a text frame. Returns `false` once the socket is
/// unusable.
async fn send_event(ws_tx: &mut WsSink, event: &ServerEvent) -> bool {
    let Some(json) = encode(event) else {
        tracing::error!(event = event.event_type_str(), "failed to encode event");
        return true;
    };
    ws_tx.send(Message::text(json)).await.is_ok()
}
