use axum::extract::State;
use axum::Json;
use tracing::warn;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::FormattedPlayer;

/// `GET /detailedLeaderboard`
///
/// Serves the cached top players, refreshing from upstream first when the
/// cache is empty or stale.
pub async fn detailed_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<FormattedPlayer>>, ApiError> {
    let players = state.leaderboard.snapshot().await.map_err(|e| {
        warn!("Leaderboard refresh failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(players.as_ref().clone()))
}
