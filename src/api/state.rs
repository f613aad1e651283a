use std::sync::Arc;

use crate::leaderboard::LeaderboardService;

#[derive(Clone)]
pub struct AppState {
    pub leaderboard: Arc<LeaderboardService>,
}
