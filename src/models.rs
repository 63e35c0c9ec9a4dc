use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::{Gender, GameScore, SetScore, Side};

/// Win/loss counters for a player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
}

/// Normalized player record keyed by ITTF id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub ittf_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    /// Not published by any public source
    pub dob: Option<String>,
    pub nationality: Option<String>,
    pub gender: Option<Gender>,
    pub team: Option<String>,
    pub stats: PlayerStats,
    pub sources: BTreeSet<String>,
    pub last_seen: String,
}

impl Player {
    /// Empty record for an id seen at `now`
    pub fn new(ittf_id: impl Into<String>, now: &str) -> Self {
        Self {
            ittf_id: ittf_id.into(),
            first_name: None,
            last_name: None,
            full_name: None,
            dob: None,
            nationality: None,
            gender: None,
            team: None,
            stats: PlayerStats::default(),
            sources: BTreeSet::new(),
            last_seen: now.to_string(),
        }
    }
}

/// One participant of a match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub ittf_id: Option<String>,
    pub name: Option<String>,
    pub association: Option<String>,
}

/// Both participants, using Fabrik's A/X naming
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlayers {
    pub a: PlayerRef,
    pub x: PlayerRef,
}

/// Where a match record came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub base_url: String,
    pub list_id: String,
}

/// Normalized match record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub year: Option<String>,
    pub tournament: Option<Value>,
    pub event: Option<Value>,
    pub stage: Option<Value>,
    pub round: Option<Value>,
    pub walkover: bool,
    /// Winner code as published by the source
    pub winner_raw: Option<i64>,
    /// Winner derived from per-game points
    pub winner_inferred: Option<Side>,
    pub final_sets: SetScore,
    pub games: Vec<GameScore>,
    pub players: MatchPlayers,
    pub source: MatchSource,
}

/// One row of the WTT individual rankings result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingEntry {
    #[serde(rename = "IttfId", default)]
    pub ittf_id: Option<Value>,
    #[serde(rename = "PlayerName", default)]
    pub player_name: Option<String>,
    #[serde(rename = "CountryCode", default)]
    pub country_code: Option<String>,
    #[serde(rename = "SubEventCode", default)]
    pub sub_event_code: Option<String>,
    #[serde(rename = "RankingPosition", default)]
    pub ranking_position: Option<Value>,
    #[serde(rename = "RankingPointsYTD", default)]
    pub ranking_points: Option<Value>,
    /// Everything else the gateway returns, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Player id found by probing the rankings gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPlayer {
    #[serde(rename = "IttfId")]
    pub ittf_id: String,
    pub name: Option<String>,
    pub source: String,
}

/// Id from a ranking page checked against the rankings gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedPlayer {
    #[serde(rename = "IttfId")]
    pub ittf_id: String,
    pub name: String,
    pub source: String,
    pub verified: bool,
}
