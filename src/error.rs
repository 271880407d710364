//! Coordinator error types.
//!
//! [`AuctionError`] names every reason a client action can be refused.
//! None of them reach the network: the coordinator logs the rejection and
//! drops the message. The one variant that can surface over HTTP,
//! [`AuctionError::CoordinatorUnavailable`], maps to a structured JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3001,
///     "message": "session coordinator unavailable"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Reasons the coordinator refuses an action.
///
/// # Error Code Ranges
///
/// | Range     | Category                 |
/// |-----------|--------------------------|
/// | 1000–1999 | Invalid payload          |
/// | 2000–2999 | Authorization / guard    |
/// | 3000–3999 | Server                   |
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuctionError {
    /// Bid amount is negative or not finite.
    #[error("invalid bid amount: {0}")]
    InvalidAmount(f64),

    /// Duration is not positive, not finite, or above the configured cap.
    #[error("invalid round duration: {0}")]
    InvalidDuration(f64),

    /// Actor is not the administrator.
    #[error("action requires the administrator role")]
    NotAdmin,

    /// Someone already holds the administrator role.
    #[error("administrator role already held")]
    AdminAlreadyHeld,

    /// The active policy assigns the role implicitly.
    #[error("administrator role cannot be claimed under the implicit policy")]
    ClaimNotSupported,

    /// The administrator tried to bid or join the biddable roster.
    #[error("the administrator cannot take part in bidding")]
    AdminExcluded,

    /// Bidder is not on the lobby roster.
    #[error("participant is not in the lobby")]
    NotInLobby,

    /// A round is already open.
    #[error("a round is already in progress")]
    RoundInProgress,

    /// No round is open.
    #[error("no round is open")]
    NoActiveRound,

    /// A timer fired for a round that no longer exists.
    #[error("stale timer for round {0}")]
    StaleTimer(u64),

    /// The coordinator task has stopped.
    #[error("session coordinator unavailable")]
    CoordinatorUnavailable,
}

impl AuctionError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidAmount(_) => 1001,
            Self::InvalidDuration(_) => 1002,
            Self::NotAdmin => 2001,
            Self::AdminAlreadyHeld => 2002,
            Self::ClaimNotSupported => 2003,
            Self::AdminExcluded => 2004,
            Self::NotInLobby => 2005,
            Self::RoundInProgress => 2006,
            Self::NoActiveRound => 2007,
            Self::StaleTimer(_) => 2008,
            Self::CoordinatorUnavailable => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAmount(_) | Self::InvalidDuration(_) => StatusCode::BAD_REQUEST,
            Self::NotAdmin | Self::AdminExcluded | Self::NotInLobby => StatusCode::FORBIDDEN,
            Self::AdminAlreadyHeld
            | Self::ClaimNotSupported
            | Self::RoundInProgress
            | Self::NoActiveRound
            | Self::StaleTimer(_) => StatusCode::CONFLICT,
            Self::CoordinatorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AuctionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn codes_fall_in_their_ranges() {
        assert_eq!(AuctionError::InvalidAmount(-1.0).error_code() / 1000, 1);
        assert_eq!(AuctionError::NotAdmin.error_code() / 1000, 2);
        assert_eq!(AuctionError::CoordinatorUnavailable.error_code() / 1000, 3);
    }

    #[test]
    fn unavailable_maps_to_503() {
        let response = AuctionError::CoordinatorUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn display_includes_value() {
        let err = AuctionError::InvalidDuration(0.0);
        assert_eq!(err.to_string(), "invalid round duration: 0");
    }
}
