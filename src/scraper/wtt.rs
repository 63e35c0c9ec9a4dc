//! WTT rankings gateway client
//!
//! The gateway answers `GetRankingIndividuals` with `{"Result": [...]}`, one
//! entry per ranked event of the player. An empty or missing result means the
//! id is unknown or unranked.

use super::{query, HttpClient, WTT_BASE_URL};
use crate::core::{infer_gender, normalize_name};
use crate::models::{DiscoveredPlayer, Player, RankingEntry, VerifiedPlayer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const RANKINGS_ENDPOINT: &str = "RankingsCurrentWeek/CurrentWeek/GetRankingIndividuals";

/// Per-player rankings keyed by ITTF id; `None` marks a failed lookup
pub type RankingsMap = BTreeMap<String, Option<Vec<RankingEntry>>>;

/// Aggregate numbers over a rankings batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingsSummary {
    pub total_players: usize,
    pub players_with_rankings: usize,
    pub total_ranking_entries: usize,
    pub event_types: BTreeMap<String, usize>,
    pub scraped_at: String,
}

/// Client for the WTT rankings gateway
pub struct WttClient<'a> {
    http: &'a HttpClient,
    base_url: String,
}

impl<'a> WttClient<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self::with_base_url(http, WTT_BASE_URL)
    }

    pub fn with_base_url(http: &'a HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn rankings_url(&self) -> String {
        format!("{}/{}", self.base_url, RANKINGS_ENDPOINT)
    }

    /// Fetch current rankings for one player
    pub async fn get_player_rankings(&self, ittf_id: &str) -> Option<Vec<RankingEntry>> {
        let params = query(&[("IttfId", ittf_id), ("q", "1")]);

        let data = match self.http.get_json(&self.rankings_url(), &params).await {
            Ok(Some(data)) => data,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!("Error fetching rankings for {}: {}", ittf_id, e);
                return None;
            }
        };

        parse_rankings_payload(&data)
    }

    /// Check whether an id is known to the gateway
    pub async fn test_ittf_id(&self, ittf_id: &str) -> (bool, Option<String>) {
        match self.get_player_rankings(ittf_id).await {
            Some(entries) if !entries.is_empty() => {
                let name = entries[0]
                    .player_name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string());
                (true, Some(name))
            }
            _ => (false, None),
        }
    }

    /// Check each id against the gateway, tagging the result with `source`
    pub async fn verify_ids(&self, ittf_ids: &[String], source: &str) -> Vec<VerifiedPlayer> {
        let mut verified = Vec::with_capacity(ittf_ids.len());
        for ittf_id in ittf_ids {
            let (valid, name) = self.test_ittf_id(ittf_id).await;
            verified.push(VerifiedPlayer {
                ittf_id: ittf_id.clone(),
                name: name.unwrap_or_else(|| "Unknown".to_string()),
                source: source.to_string(),
                verified: valid,
            });
        }
        verified
    }

    /// Fetch rankings for many players; one failure never aborts the batch
    pub async fn batch_fetch_rankings(&self, ittf_ids: &[String]) -> RankingsMap {
        let mut results = RankingsMap::new();
        let total = ittf_ids.len();

        for (i, ittf_id) in ittf_ids.iter().enumerate() {
            tracing::info!("Fetching {} ({}/{})", ittf_id, i + 1, total);

            let rankings = self.get_player_rankings(ittf_id).await;
            if let Some(name) = rankings
                .as_ref()
                .and_then(|r| r.first())
                .and_then(|e| e.player_name.as_deref())
            {
                tracing::info!("  Found: {}", name);
            }
            results.insert(ittf_id.clone(), rankings);
        }

        results
    }

    /// Probe every id in `start..=end`
    pub async fn discover_brute_force(&self, start: u64, end: u64) -> Vec<DiscoveredPlayer> {
        tracing::info!("Starting brute force discovery: {}-{}", start, end);
        let mut discovered = Vec::new();

        for id in start..=end {
            let ittf_id = id.to_string();
            let (valid, name) = self.test_ittf_id(&ittf_id).await;

            if valid {
                tracing::info!("Found: {} (ID: {})", name.as_deref().unwrap_or("Unknown"), id);
                discovered.push(DiscoveredPlayer {
                    ittf_id,
                    name,
                    source: "API_brute_force".to_string(),
                });
            }
        }

        discovered
    }
}

/// Extract the `Result` array from a gateway payload
pub fn parse_rankings_payload(data: &Value) -> Option<Vec<RankingEntry>> {
    let result = data.get("Result")?;
    match serde_json::from_value::<Vec<RankingEntry>>(result.clone()) {
        Ok(entries) => Some(entries),
        Err(e) => {
            tracing::warn!("Unexpected rankings payload: {}", e);
            None
        }
    }
}

/// Summarize a rankings batch by event code
pub fn summarize_rankings(data: &RankingsMap, scraped_at: &str) -> RankingsSummary {
    let mut event_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_entries = 0;

    for entries in data.values().flatten() {
        for entry in entries {
            let code = entry
                .sub_event_code
                .clone()
                .unwrap_or_else(|| "Unknown".to_string());
            *event_types.entry(code).or_default() += 1;
            total_entries += 1;
        }
    }

    RankingsSummary {
        total_players: data.len(),
        players_with_rankings: data.values().filter(|v| v.is_some()).count(),
        total_ranking_entries: total_entries,
        event_types,
        scraped_at: scraped_at.to_string(),
    }
}

/// Build a player profile from ranking entries
///
/// Name and nationality come from the first entry; gender from the first
/// non-mixed event code across all entries.
pub fn build_player_profile(ittf_id: &str, entries: &[RankingEntry], now: &str) -> Option<Player> {
    let first = entries.first()?;
    let display = first.player_name.as_deref().unwrap_or("");
    let name = normalize_name(display);

    let mut player = Player::new(ittf_id, now);
    player.first_name = name.first;
    player.last_name = name.last;
    player.full_name = name.full;
    player.nationality = first
        .country_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    player.gender = infer_gender(entries.iter().filter_map(|e| e.sub_event_code.as_deref()));
    player.sources.insert("rankings_api".to_string());

    Some(player)
}
