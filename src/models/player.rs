//! Player detail records and the reduced shape served to clients.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Full player record returned by `players/{tag}`.
///
/// Only the fields the leaderboard exposes are kept; everything else the
/// upstream sends is dropped during deserialization. The deck and league
/// statistics are forwarded as-is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current_deck: Option<Value>,
    #[serde(default)]
    pub league_statistics: Option<Value>,
}

/// The externally visible leaderboard entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPlayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_deck: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league_statistics: Option<Value>,
}

impl FormattedPlayer {
    /// `leagueStatistics.currentSeason.rank`, if present and a non-negative
    /// integer.
    pub fn current_season_rank(&self) -> Option<u64> {
        self.league_statistics
            .as_ref()
            .and_then(|stats| stats.pointer("/currentSeason/rank"))
            .and_then(Value::as_u64)
    }
}

impl From<PlayerDetail> for FormattedPlayer {
    fn from(detail: PlayerDetail) -> Self {
        Self {
            name: detail.name,
            current_deck: detail.current_deck,
            league_statistics: detail.league_statistics,
        }
    }
}

/// Order by current-season rank ascending. Unranked players go last.
fn compare_by_current_rank(a: &FormattedPlayer, b: &FormattedPlayer) -> Ordering {
    match (a.current_season_rank(), b.current_season_rank()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by current-season rank.
pub fn sort_by_current_rank(players: &mut [FormattedPlayer]) {
    players.sort_by(compare_by_current_rank);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ranked(name: &str, rank: Option<u64>) -> FormattedPlayer {
        FormattedPlayer {
            name: Some(name.to_string()),
            current_deck: None,
            league_statistics: Some(match rank {
                Some(rank) => json!({"currentSeason": {"rank": rank, "trophies": 2000}}),
                None => json!({"currentSeason": {"trophies": 2000}}),
            }),
        }
    }

    #[test]
    fn test_detail_drops_unknown_fields() {
        let json = r##"{
            "tag": "#ABC",
            "name": "Ace",
            "expLevel": 60,
            "badges": [{"name": "Classic12Wins"}],
            "currentDeck": [{"name": "Knight", "id": 26000000, "level": 14, "maxLevel": 14,
                             "rarity": "common", "elixirCost": 3,
                             "iconUrls": {"medium": "https://example.com/knight.png"}}],
            "leagueStatistics": {"currentSeason": {"rank": 3, "trophies": 2100}}
        }"##;

        let detail: PlayerDetail = serde_json::from_str(json).unwrap();
        let formatted = FormattedPlayer::from(detail);
        let out = serde_json::to_value(&formatted).unwrap();

        assert_eq!(out["name"], "Ace");
        assert!(out.get("tag").is_none());
        assert!(out.get("badges").is_none());
        assert_eq!(out["currentDeck"][0]["elixirCost"], 3);
        assert_eq!(out["leagueStatistics"]["currentSeason"]["rank"], 3);
        assert_eq!(formatted.current_season_rank(), Some(3));
    }

    #[test]
    fn test_deck_and_league_statistics_pass_through_unchanged() {
        let deck = json!([{
            "name": "Knight",
            "count": 1,
            "level": 14,
            "starLevel": 3,
            "evolutionLevel": 1,
            "iconUrls": {"heroMedium": "h", "medium": "m", "evolutionMedium": "e"},
            "futureField": {"nested": [1, 2.5, null]}
        }]);
        let stats = json!({
            "currentSeason": {"rank": 4, "trophies": 3100, "leagueNumber": 10},
            "bestSeason": {"id": "2022-11", "rank": 99999999999u64}
        });
        let detail: PlayerDetail = serde_json::from_value(json!({
            "name": "Ace",
            "currentDeck": deck.clone(),
            "leagueStatistics": stats.clone(),
        }))
        .unwrap();

        let out = serde_json::to_value(FormattedPlayer::from(detail)).unwrap();

        assert_eq!(out["currentDeck"], deck);
        assert_eq!(out["leagueStatistics"], stats);
    }

    #[test]
    fn test_rank_accessor_tolerates_odd_shapes() {
        let mut player = ranked("a", None);
        assert_eq!(player.current_season_rank(), None);

        player.league_statistics = Some(json!({"currentSeason": {"rank": "first"}}));
        assert_eq!(player.current_season_rank(), None);

        player.league_statistics = Some(json!(["not", "an", "object"]));
        assert_eq!(player.current_season_rank(), None);
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let detail: PlayerDetail = serde_json::from_str(r#"{"expLevel": 1}"#).unwrap();
        let formatted = FormattedPlayer::from(detail);
        assert_eq!(formatted, FormattedPlayer::default());

        let out = serde_json::to_string(&formatted).unwrap();
        assert_eq!(out, "{}");
    }

    #[test]
    fn test_sort_by_current_rank() {
        let mut players = vec![
            ranked("c", Some(30)),
            ranked("a", Some(1)),
            ranked("b", Some(12)),
        ];
        sort_by_current_rank(&mut players);

        let names: Vec<_> = players.iter().map(|p| p.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_unranked_last_and_stable() {
        let mut players = vec![
            ranked("x", None),
            ranked("b", Some(2)),
            FormattedPlayer::default(),
            ranked("a", Some(1)),
            ranked("y", None),
        ];
        sort_by_current_rank(&mut players);

        let names: Vec<_> = players.iter().map(|p| p.name.clone()).collect();
        assert_eq!(
            names,
            vec![
                Some("a".to_string()),
                Some("b".to_string()),
                Some("x".to_string()),
                None,
                Some("y".to_string()),
            ]
        );
    }
}
