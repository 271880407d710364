//! Type-safe connection identifier.
//!
//! [`ParticipantId`] is a newtype wrapper around [`uuid::Uuid`] (v4) so
//! that connection identities cannot be confused with other UUIDs.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Opaque identifier for one live WebSocket connection.
///
/// Generated by the server at upgrade time and never reused. The same id
/// keys the lobby roster, the administrator slot, and the bid ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct ParticipantId(uuid::Uuid);

impl ParticipantId {
    /// Creates a new random `ParticipantId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `ParticipantId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Returns the first four hex characters, used for placeholder names.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string().chars().take(4).collect()
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for ParticipantId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(ParticipantId::new(), ParticipantId::new());
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let uuid = uuid::Uuid::nil();
        let id = ParticipantId::from_uuid(uuid);
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn short_takes_first_four_hex_chars() {
        let Ok(uuid) = "abcd1234-0000-4000-8000-000000000000".parse::<uuid::Uuid>() else {
            panic!("valid uuid");
        };
        assert_eq!(ParticipantId::from(uuid).short(), "abcd");
    }

    #[test]
    fn as_uuid_returns_inner() {
        let uuid = uuid::Uuid::new_v4();
        assert_eq!(*ParticipantId::from_uuid(uuid).as_uuid(), uuid);
    }
}
