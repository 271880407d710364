//! WebSocket layer: connection handling and the wire protocol.
//!
//! The WebSocket endpoint at `/ws` is the only way to take part in the
//! auction. Each connection is one participant; its frames are translated
//! into session requests and its share of the event stream is forwarded
//! back as tagged JSON frames.

pub mod connection;
pub mod handler;
pub mod messages;
