//! WebSocket wire protocol: the closed set of client messages.
//!
//! Every frame is a JSON object `{"type": "<kebab-case>", "payload": {...}}`.
//! Unknown `type` tags and payloads of the wrong shape fail to parse and
//! are dropped by the connection loop. Server-to-client frames are
//! [`crate::domain::ServerEvent`]s.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::ServerEvent;
use crate::service::SessionRequest;

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Join or rejoin the lobby.
    JoinLobby {
        /// Display name; non-text values are coerced, missing ones replaced.
        #[serde(default, deserialize_with = "lenient_text")]
        display_name: Option<String>,
    },
    /// Leave the lobby.
    LeaveLobby {},
    /// Claim the administrator role.
    ClaimAdmin {},
    /// Change the default round length (administrator only).
    SetDuration {
        /// Seconds.
        seconds: f64,
    },
    /// Open a round (administrator only).
    CallItem {
        /// Item label.
        #[serde(default, deserialize_with = "lenient_text")]
        label: Option<String>,
        /// Round length for this call only.
        #[serde(default)]
        duration_override_seconds: Option<f64>,
    },
    /// Place or replace a sealed bid.
    SubmitBid {
        /// Offered amount.
        amount: f64,
    },
    /// Clock synchronization probe.
    ClockProbe {
        /// Client send time, echoed back verbatim.
        echo: f64,
    },
}

impl ClientMessage {
    /// Parses one text frame.
    ///
    /// A missing or `null` payload is read as `{}` so that messages
    /// without arguments may omit it.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] for malformed JSON, unknown
    /// message types, or payloads of the wrong shape.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let mut frame: Value = serde_json::from_str(text)?;
        if let Some(obj) = frame.as_object_mut()
            && obj.get("payload").is_none_or(Value::is_null)
        {
            obj.insert("payload".to_string(), Value::Object(serde_json::Map::new()));
        }
        serde_json::from_value(frame)
    }

    /// Converts into a session request. Clock probes are answered by the
    /// connection itself and yield `None`.
    #[must_use]
    pub fn into_request(self) -> Option<SessionRequest> {
        let request = match self {
            Self::JoinLobby { display_name } => SessionRequest::JoinLobby { display_name },
            Self::LeaveLobby {} => SessionRequest::LeaveLobby,
            Self::ClaimAdmin {} => SessionRequest::ClaimAdmin,
            Self::SetDuration { seconds } => SessionRequest::SetDuration { seconds },
            Self::CallItem {
                label,
                duration_override_seconds,
            } => SessionRequest::CallItem {
                label,
                duration_override_seconds,
            },
            Self::SubmitBid { amount } => SessionRequest::SubmitBid { amount },
            Self::ClockProbe { .. } => return None,
        };
        Some(request)
    }
}

/// Serializes an outbound event into a text frame.
#[must_use]
pub fn encode(event: &ServerEvent) -> Option<String> {
    serde_json::to_string(event).ok()
}

/// Accepts any JSON value where free text is expected: strings pass
/// through, numbers and booleans are stringified, anything else is `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ClientMessage {
        let Ok(msg) = ClientMessage::parse(text) else {
            panic!("should parse: {text}");
        };
        msg
    }

    #[test]
    fn join_lobby_reads_display_name() {
        let msg = parse(r#"{"type":"join-lobby","payload":{"displayName":"Ann"}}"#);
        assert_eq!(
            msg,
            ClientMessage::JoinLobby {
                display_name: Some("Ann".to_string())
            }
        );
    }

    #[test]
    fn join_lobby_coerces_odd_names() {
        let numeric = parse(r#"{"type":"join-lobby","payload":{"displayName":42}}"#);
        assert_eq!(
            numeric,
            ClientMessage::JoinLobby {
                display_name: Some("42".to_string())
            }
        );
        let missing = parse(r#"{"type":"join-lobby"}"#);
        assert_eq!(missing, ClientMessage::JoinLobby { display_name: None });
    }

    #[test]
    fn argumentless_messages_accept_missing_or_empty_payload() {
        assert_eq!(parse(r#"{"type":"leave-lobby"}"#), ClientMessage::LeaveLobby {});
        assert_eq!(
            parse(r#"{"type":"claim-admin","payload":{}}"#),
            ClientMessage::ClaimAdmin {}
        );
        assert_eq!(
            parse(r#"{"type":"claim-admin","payload":null}"#),
            ClientMessage::ClaimAdmin {}
        );
    }

    #[test]
    fn call_item_with_optional_override() {
        let msg = parse(
            r#"{"type":"call-item","payload":{"label":"Player A","durationOverrideSeconds":5}}"#,
        );
        assert_eq!(
            msg.into_request(),
            Some(SessionRequest::CallItem {
                label: Some("Player A".to_string()),
                duration_override_seconds: Some(5.0),
            })
        );
    }

    #[test]
    fn submit_bid_requires_numeric_amount() {
        assert_eq!(
            parse(r#"{"type":"submit-bid","payload":{"amount":12}}"#),
            ClientMessage::SubmitBid { amount: 12.0 }
        );
        let quoted = r#"{"type":"submit-bid","payload":{"amount":"12"}}"#;
        assert!(ClientMessage::parse(quoted).is_err());
        assert!(ClientMessage::parse(r#"{"type":"submit-bid","payload":{}}"#).is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(ClientMessage::parse(r#"{"type":"cancel-round","payload":{}}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
        assert!(ClientMessage::parse(r#"["join-lobby"]"#).is_err());
    }

    #[test]
    fn clock_probe_is_not_a_session_request() {
        let msg = parse(r#"{"type":"clock-probe","payload":{"echo":1700000000000}}"#);
        assert_eq!(msg, ClientMessage::ClockProbe { echo: 1.7e12 });
        assert!(msg.into_request().is_none());
    }

    #[test]
    fn encode_produces_tagged_frame() {
        let Some(text) = encode(&ServerEvent::DurationUpdate { seconds: 10 }) else {
            panic!("encodable");
        };
        assert_eq!(text, r#"{"type":"duration-update","payload":{"seconds":10}}"#);
    }
}
