//! Lobby roster: connected participants and their display names.
//!
//! [`LobbyRegistry`] keeps participants in join order. Joining is
//! idempotent per connection and never fails; malformed names are
//! coerced to a placeholder derived from the connection id.

use serde::Serialize;
use utoipa::ToSchema;

use super::ParticipantId;

/// Longest display name kept, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// A participant currently present in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Connection identifier.
    pub id: ParticipantId,
    /// Display name (not guaranteed unique).
    pub display_name: String,
}

/// Ordered roster of lobby participants.
#[derive(Debug, Default)]
pub struct LobbyRegistry {
    participants: Vec<Participant>,
}

impl LobbyRegistry {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` to the roster, replacing any entry it already holds.
    ///
    /// A rejoin moves the participant to the end of the join order.
    pub fn join(&mut self, id: ParticipantId, display_name: Option<&str>) -> Participant {
        self.participants.retain(|p| p.id != id);
        let participant = Participant {
            id,
            display_name: sanitize_name(id, display_name),
        };
        self.participants.push(participant.clone());
        participant
    }

    /// Removes `id` from the roster. Returns the removed entry, if any.
    pub fn leave(&mut self, id: ParticipantId) -> Option<Participant> {
        let pos = self.participants.iter().position(|p| p.id == id)?;
        Some(self.participants.remove(pos))
    }

    /// Looks up the display name of `id`.
    #[must_use]
    pub fn name_of(&self, id: ParticipantId) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.display_name.as_str())
    }

    /// Returns the earliest-joined participant, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Participant> {
        self.participants.first()
    }

    /// Returns the roster in join order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Participant> {
        self.participants.clone()
    }
}

/// Returns the placeholder name used when a client sends no usable name.
#[must_use]
pub fn placeholder_name(id: ParticipantId) -> String {
    format!("Participant-{}", id.short())
}

fn sanitize_name(id: ParticipantId, raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return placeholder_name(id);
    }
    trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn join_appends_in_order() {
        let mut lobby = LobbyRegistry::new();
        let a = ParticipantId::new();
        let b = ParticipantId::new();
        lobby.join(a, Some("Ann"));
        lobby.join(b, Some("Bob"));

        let ids: Vec<_> = lobby.snapshot().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn rejoin_replaces_entry_and_last_name_wins() {
        let mut lobby = LobbyRegistry::new();
        let a = ParticipantId::new();
        lobby.join(a, Some("first"));
        lobby.join(a, Some("second"));

        assert_eq!(lobby.snapshot().len(), 1);
        assert_eq!(lobby.name_of(a), Some("second"));
    }

    #[test]
    fn rejoin_moves_to_end() {
        let mut lobby = LobbyRegistry::new();
        let a = ParticipantId::new();
        let b = ParticipantId::new();
        lobby.join(a, Some("Ann"));
        lobby.join(b, Some("Bob"));
        lobby.join(a, Some("Ann"));

        let Some(first) = lobby.first() else {
            panic!("roster should not be empty");
        };
        assert_eq!(first.id, b);
    }

    #[test]
    fn blank_or_missing_name_gets_placeholder() {
        let mut lobby = LobbyRegistry::new();
        let a = ParticipantId::new();
        let b = ParticipantId::new();

        let pa = lobby.join(a, Some("   "));
        let pb = lobby.join(b, None);

        assert_eq!(pa.display_name, placeholder_name(a));
        assert_eq!(pb.display_name, placeholder_name(b));
        assert!(pa.display_name.starts_with("Participant-"));
    }

    #[test]
    fn long_names_are_truncated() {
        let mut lobby = LobbyRegistry::new();
        let long = "x".repeat(100);
        let p = lobby.join(ParticipantId::new(), Some(&long));
        assert_eq!(p.display_name.chars().count(), MAX_DISPLAY_NAME_CHARS);
    }

    #[test]
    fn leave_removes_and_reports() {
        let mut lobby = LobbyRegistry::new();
        let a = ParticipantId::new();
        lobby.join(a, Some("Ann"));

        assert!(lobby.leave(a).is_some());
        assert!(lobby.leave(a).is_none());
        assert!(lobby.snapshot().is_empty());
        assert!(lobby.name_of(a).is_none());
    }
}
