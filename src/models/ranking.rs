use serde::{Deserialize, Serialize};

use super::PlayerTag;

/// A player's position on a season's global leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRank {
    pub tag: PlayerTag,
    pub name: String,
    #[serde(default)]
    pub exp_level: u32,
    #[serde(default)]
    pub trophies: u32,
    pub rank: u32,
    #[serde(default)]
    pub clan: Option<ClanSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanSummary {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub badge_id: Option<u64>,
}
