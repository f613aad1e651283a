//! Individual steps of the leaderboard fetch chain.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::models::{ItemList, PlayerDetail, PlayerRank, PlayerTag, Season};
use crate::upstream::{Endpoint, UpstreamApi, UpstreamError};

fn decode<T: DeserializeOwned>(endpoint: &Endpoint, body: Value) -> Result<T, UpstreamError> {
    serde_json::from_value(body).map_err(|e| UpstreamError::malformed(endpoint, e.to_string()))
}

/// The raw `items` array of a list response, which must be present and
/// non-empty. Entries are left undecoded so callers only pay for the ones
/// they keep.
fn required_items(endpoint: &Endpoint, body: Value) -> Result<Vec<Value>, UpstreamError> {
    let list: ItemList<Value> = decode(endpoint, body)?;
    match list.items {
        None => Err(UpstreamError::malformed(endpoint, "missing items")),
        Some(items) if items.is_empty() => {
            Err(UpstreamError::malformed(endpoint, "items is empty"))
        }
        Some(items) => Ok(items),
    }
}

/// Id of the most recent global season.
///
/// The upstream list is unpaginated and oldest-first, so the last entry is
/// the current season. If the API ever paginates this list, this returns
/// the last season of the first page instead of failing.
pub async fn current_season(api: &dyn UpstreamApi) -> Result<String, UpstreamError> {
    let endpoint = Endpoint::Seasons;
    let body = api.get(&endpoint).await?;
    let last = required_items(&endpoint, body)?
        .pop()
        .ok_or_else(|| UpstreamError::malformed(&endpoint, "items is empty"))?;

    let season: Season = decode(&endpoint, last)?;
    Ok(season.id)
}

/// First `limit` entries of a season's global player rankings, in
/// upstream order. Entries past `limit` are never decoded.
pub async fn top_rankings(
    api: &dyn UpstreamApi,
    season_id: &str,
    limit: usize,
) -> Result<Vec<PlayerRank>, UpstreamError> {
    let endpoint = Endpoint::SeasonRankings(season_id.to_string());
    let body = api.get(&endpoint).await?;
    let mut items = required_items(&endpoint, body)?;

    debug!(
        "Season {} has {} ranked players, keeping {}",
        season_id,
        items.len(),
        limit.min(items.len())
    );
    items.truncate(limit);
    items
        .into_iter()
        .map(|item| decode(&endpoint, item))
        .collect()
}

/// Full player record for a tag.
pub async fn player_detail(
    api: &dyn UpstreamApi,
    tag: &PlayerTag,
) -> Result<PlayerDetail, UpstreamError> {
    let endpoint = Endpoint::Player(tag.clone());
    let body = api.get(&endpoint).await?;
    if body.is_null() {
        return Err(UpstreamError::malformed(&endpoint, "empty player record"));
    }
    decode(&endpoint, body)
}
