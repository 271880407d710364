//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::AdminPolicy;
use crate::service::SessionSettings;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3001`).
    pub listen_addr: SocketAddr,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Capacity of the coordinator's command queue.
    pub command_queue_capacity: usize,

    /// How the administrator role is assigned.
    pub admin_policy: AdminPolicy,

    /// Round length when a call carries no override, in seconds.
    pub default_round_duration_secs: u64,

    /// Longest accepted round length, in seconds.
    pub max_round_duration_secs: u64,

    /// Milliseconds after the deadline before settlement fires.
    pub settlement_grace_ms: u64,

    /// Milliseconds between authoritative `round-tick` broadcasts.
    pub round_tick_interval_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            event_bus_capacity: 1024,
            command_queue_capacity: 256,
            admin_policy: AdminPolicy::ExplicitClaim,
            default_round_duration_secs: 10,
            max_round_duration_secs: 3600,
            settlement_grace_ms: 250,
            round_tick_interval_ms: 1000,
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set or
    /// cannot be parsed.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let admin_policy = match std::env::var("ADMIN_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|err: String| {
                tracing::warn!(%err, "falling back to default admin policy");
                defaults.admin_policy
            }),
            Err(_) => defaults.admin_policy,
        };

        Ok(Self {
            listen_addr,
            event_bus_capacity: parse_env("EVENT_BUS_CAPACITY", defaults.event_bus_capacity),
            command_queue_capacity: parse_env(
                "COMMAND_QUEUE_CAPACITY",
                defaults.command_queue_capacity,
            ),
            admin_policy,
            default_round_duration_secs: parse_env(
                "DEFAULT_ROUND_DURATION_SECS",
                defaults.default_round_duration_secs,
            ),
            max_round_duration_secs: parse_env(
                "MAX_ROUND_DURATION_SECS",
                defaults.max_round_duration_secs,
            ),
            settlement_grace_ms: parse_env("SETTLEMENT_GRACE_MS", defaults.settlement_grace_ms),
            round_tick_interval_ms: parse_env(
                "ROUND_TICK_INTERVAL_MS",
                defaults.round_tick_interval_ms,
            ),
        })
    }

    /// Session tunables derived from this configuration.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            admin_policy: self.admin_policy,
            default_duration_secs: self.default_round_duration_secs,
            max_duration_secs: self.max_round_duration_secs,
            settlement_grace: Duration::from_millis(self.settlement_grace_ms),
            tick_interval: Duration::from_millis(self.round_tick_interval_ms),
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr.port(), 3001);
        assert_eq!(config.admin_policy, AdminPolicy::ExplicitClaim);
        assert_eq!(config.default_round_duration_secs, 10);
    }

    #[test]
    fn session_settings_convert_millis() {
        let config = GatewayConfig {
            settlement_grace_ms: 400,
            round_tick_interval_ms: 500,
            ..GatewayConfig::default()
        };
        let settings = config.session_settings();
        assert_eq!(settings.settlement_grace, Duration::from_millis(400));
        assert_eq!(settings.tick_interval, Duration::from_millis(500));
        assert_eq!(settings.default_duration_secs, 10);
    }

    #[test]
    fn parse_env_falls_back_on_missing_key() {
        let value: u64 = parse_env("AUCTION_GATEWAY_TEST_UNSET_KEY", 42);
        assert_eq!(value, 42);
    }
}
