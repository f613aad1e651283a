//! Leaderboard refresh orchestration.
//!
//! A refresh runs the whole chain:
//! 1. Resolve the current season
//! 2. Take the top N of that season's global rankings
//! 3. Fetch every ranked player's record concurrently
//! 4. Reduce each record to a `FormattedPlayer`
//! 5. Sort by current-season rank
//!
//! The result replaces the cached snapshot only if every step succeeded.

pub mod fetch;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::info;

use crate::cache::TimedCache;
use crate::config::LeaderboardConfig;
use crate::models::{sort_by_current_rank, FormattedPlayer};
use crate::upstream::{UpstreamApi, UpstreamError};

/// Run the full fetch chain once, without touching any cache.
pub async fn build_leaderboard(
    api: &dyn UpstreamApi,
    top_n: usize,
) -> Result<Vec<FormattedPlayer>, UpstreamError> {
    let season = fetch::current_season(api).await?;
    info!("Current season is {}", season);

    let rankings = fetch::top_rankings(api, &season, top_n).await?;
    let details = try_join_all(
        rankings
            .iter()
            .map(|ranked| fetch::player_detail(api, &ranked.tag)),
    )
    .await?;

    let mut players: Vec<FormattedPlayer> =
        details.into_iter().map(FormattedPlayer::from).collect();
    sort_by_current_rank(&mut players);
    Ok(players)
}

/// Cache state reported by the health route.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub populated: bool,
    pub fresh: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub players: usize,
    pub staleness_ms: u64,
}

/// Serves the leaderboard from cache, refreshing it when stale.
pub struct LeaderboardService {
    api: Arc<dyn UpstreamApi>,
    cache: TimedCache<Vec<FormattedPlayer>>,
    top_n: usize,
}

impl LeaderboardService {
    pub fn new(api: Arc<dyn UpstreamApi>, config: &LeaderboardConfig) -> Self {
        Self::with_cache(
            api,
            TimedCache::new(config.staleness(), config.refresh_mode),
            config.top_n,
        )
    }

    pub fn with_cache(
        api: Arc<dyn UpstreamApi>,
        cache: TimedCache<Vec<FormattedPlayer>>,
        top_n: usize,
    ) -> Self {
        Self { api, cache, top_n }
    }

    /// Current leaderboard, refreshed first if the cache is empty or stale.
    pub async fn snapshot(&self) -> Result<Arc<Vec<FormattedPlayer>>, UpstreamError> {
        self.cache.get_or_refresh(|| self.run_refresh()).await
    }

    /// Refresh unconditionally.
    pub async fn refresh(&self) -> Result<Arc<Vec<FormattedPlayer>>, UpstreamError> {
        self.cache.refresh_with(|| self.run_refresh()).await
    }

    async fn run_refresh(&self) -> Result<Vec<FormattedPlayer>, UpstreamError> {
        info!("Updating cache from {}", self.api.name());
        let players = build_leaderboard(self.api.as_ref(), self.top_n).await?;
        info!("Done updating cache ({} players)", players.len());
        Ok(players)
    }

    pub async fn cache_status(&self) -> CacheStatus {
        let staleness_ms = u64::try_from(self.cache.staleness().as_millis()).unwrap_or(u64::MAX);
        match self.cache.current().await {
            Some(snapshot) => CacheStatus {
                populated: true,
                fresh: self.cache.is_fresh(&snapshot),
                updated_at: Some(snapshot.updated_at),
                players: snapshot.value.len(),
                staleness_ms,
            },
            None => CacheStatus {
                populated: false,
                fresh: false,
                updated_at: None,
                players: 0,
                staleness_ms,
            },
        }
    }
}
