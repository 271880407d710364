//! Read-only session inspection.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::error::{AuctionError, ErrorResponse};
use crate::service::SessionSnapshot;

/// `GET /api/v1/session` — Current lobby, administrator and round.
///
/// Bid amounts are never exposed; the open round lists only who has bid.
#[utoipa::path(
    get,
    path = "/api/v1/session",
    tag = "Session",
    summary = "Inspect the session",
    description = "Returns the roster, administrator, default duration and open round. \
                   Bid amounts are never included.",
    responses(
        (status = 200, description = "Session snapshot", body = SessionSnapshot),
        (status = 503, description = "Coordinator stopped", body = ErrorResponse),
    )
)]
pub async fn session_handler(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, AuctionError> {
    let snapshot = state.coordinator.snapshot().await?;
    Ok(Json(snapshot))
}

/// Session routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/session", get(session_handler))
}
