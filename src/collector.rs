//! Composed collection pipelines
//!
//! Each collector drives one or more scrapers, accumulates records in memory
//! and writes the resulting JSON tree under an [`OutputLayout`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::Gender;
use crate::data::output::players_envelope;
use crate::data::{load_seed_ids, save_players_by_gender, write_json, OutputLayout, PlayerStore};
use crate::error::AppError;
use crate::models::{MatchRecord, MatchSource, Player, VerifiedPlayer};
use crate::scraper::fabrik::{extract_player_ids, FabrikClient};
use crate::scraper::rankings_pages::PlayerIdDatabase;
use crate::scraper::ttbl::{
    elo_ready_games, game_records, lineup_players, match_state_counts, match_summary,
    top_players, unique_players, GameRecord, PlayerStatsBook, TtblClient,
};
use crate::scraper::wtt::{build_player_profile, summarize_rankings, RankingsMap};
use crate::scraper::{FabrikConfig, HttpClient, TtblConfig, WttClient};

/// Source tag for players seen in match rows
pub const FABRIK_MATCHES_SOURCE: &str = "fabrik_matches";
/// Source tag for players first found while scanning match data
pub const MATCH_DISCOVERY_SOURCE: &str = "match_data_discovery";

fn utc_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Metadata block of the master dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub scraped_at: String,
    pub years: Vec<i32>,
    pub players: usize,
    pub matches: usize,
    pub sources: Vec<MatchSource>,
    pub notes: Vec<String>,
}

/// Players, matches and the player to match index of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterDataset {
    pub metadata: DatasetMetadata,
    pub players: BTreeMap<String, Player>,
    pub matches: Vec<MatchRecord>,
    pub player_match_index: BTreeMap<String, Vec<String>>,
}

impl MasterDataset {
    /// Assemble a dataset from scraped matches
    pub fn from_matches(years: &[i32], matches: Vec<MatchRecord>, source: MatchSource, now: &str) -> Self {
        let mut store = PlayerStore::new(now);
        for m in &matches {
            store.record_match(m, FABRIK_MATCHES_SOURCE);
        }

        Self {
            metadata: DatasetMetadata {
                scraped_at: now.to_string(),
                years: years.to_vec(),
                players: store.len(),
                matches: matches.len(),
                sources: vec![source],
                notes: vec![
                    "DOB/team generally unavailable from public Fabrik match rows; fields left null."
                        .to_string(),
                    "Winner inferred from per-game points where possible.".to_string(),
                ],
            },
            players: store.as_map().clone(),
            matches,
            player_match_index: store.match_index().clone(),
        }
    }

    /// Write `players.json`, `matches.json`, `player_match_index.json` and `dataset.json`
    pub fn save(&self, layout: &OutputLayout) -> Result<(), AppError> {
        let root = layout.root();
        write_json(&root.join("players.json"), &self.players)?;
        write_json(&root.join("matches.json"), &self.matches)?;
        write_json(&root.join("player_match_index.json"), &self.player_match_index)?;
        write_json(&root.join("dataset.json"), self)?;
        tracing::info!("Wrote: {}", root.join("dataset.json").display());
        Ok(())
    }
}

/// Match and player collection straight from the Fabrik list
pub struct MasterCollector<'a> {
    fabrik: FabrikClient<'a>,
    layout: OutputLayout,
}

impl<'a> MasterCollector<'a> {
    pub fn new(http: &'a HttpClient, config: FabrikConfig, layout: OutputLayout) -> Self {
        Self {
            fabrik: FabrikClient::new(http, config),
            layout,
        }
    }

    /// Scrape every year, newest first as given, and save the dataset
    pub async fn run(&self, years: &[i32]) -> Result<MasterDataset, AppError> {
        let mut matches = Vec::new();

        for &year in years {
            tracing::info!(
                "Scraping year={} from Fabrik listid={}",
                year,
                self.fabrik.config().list_id
            );
            let year_matches = self.fabrik.scrape_year(year).await;
            tracing::info!("Year {}: collected {} matches", year, year_matches.len());
            matches.extend(year_matches);
        }

        let dataset = MasterDataset::from_matches(years, matches, self.fabrik.config().source(), &utc_now());
        dataset.save(&self.layout)?;
        Ok(dataset)
    }
}

/// Counts per input of a profile collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSources {
    pub seed_profiles: usize,
    pub match_data_discovery: usize,
    pub matches_scraped: usize,
}

/// Summary written to `collection_report.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReport {
    pub scraped_at: String,
    pub total_players: usize,
    pub by_gender: BTreeMap<String, usize>,
    pub data_sources: DataSources,
    pub years_scraped: Vec<i32>,
    pub summary: String,
}

/// Seed ids to ranking profiles, enriched with players found in match data
pub struct ProfileCollector<'a> {
    wtt: WttClient<'a>,
    http: &'a HttpClient,
    fabrik: FabrikConfig,
    layout: OutputLayout,
    /// Rows scanned per year while discovering players
    pub discovery_cap: usize,
    /// Matches kept per year in the match scrape
    pub match_cap: usize,
}

impl<'a> ProfileCollector<'a> {
    pub fn new(http: &'a HttpClient, wtt: WttClient<'a>, fabrik: FabrikConfig, layout: OutputLayout) -> Self {
        Self {
            wtt,
            http,
            fabrik,
            layout,
            discovery_cap: 200,
            match_cap: 500,
        }
    }

    /// Build ranking profiles for the seed ids and save them
    async fn collect_profiles(&self, store: &mut PlayerStore, ids: &[String]) -> Result<usize, AppError> {
        let mut profiles: Vec<Player> = Vec::new();
        let now = utc_now();

        for ittf_id in ids {
            let Some(entries) = self.wtt.get_player_rankings(ittf_id).await else {
                continue;
            };
            if let Some(player) = build_player_profile(ittf_id, &entries, &now) {
                tracing::info!(
                    "  {}: {} ({})",
                    ittf_id,
                    player.full_name.as_deref().unwrap_or("?"),
                    player.gender.as_ref().map(Gender::label).unwrap_or("unknown")
                );
                store.upsert(player.clone());
                profiles.push(player);
            }
        }

        let path = self.layout.players().join("players_database.json");
        write_json(&path, &players_envelope(&profiles, &now))?;
        tracing::info!("Saved {} player profiles to {}", profiles.len(), path.display());
        Ok(profiles.len())
    }

    /// Add players seen in a capped scan of each year's matches
    async fn discover_from_matches(&self, store: &mut PlayerStore, years: &[i32]) -> usize {
        let config = FabrikConfig {
            max_matches: Some(self.discovery_cap),
            ..self.fabrik.clone()
        };
        let fabrik = FabrikClient::new(self.http, config);
        let mut discovered = BTreeSet::new();

        for &year in years {
            tracing::info!("  Scanning year {}...", year);
            for m in fabrik.scrape_year(year).await {
                for p in [&m.players.a, &m.players.x] {
                    let Some(id) = p.ittf_id.as_deref() else {
                        continue;
                    };
                    if store.contains(id) {
                        continue;
                    }
                    if store.upsert_ref(p, MATCH_DISCOVERY_SOURCE) {
                        tracing::info!("    New player: {} - {}", id, p.name.as_deref().unwrap_or(""));
                        discovered.insert(id.to_string());
                    }
                }
                store.fill_gender_from_event(&m);
            }
        }

        tracing::info!("Discovered {} new players from match data", discovered.len());
        discovered.len()
    }

    /// Run the whole collection and write the report
    pub async fn run(&self, seed_file: Option<&Path>, years: &[i32]) -> Result<CollectionReport, AppError> {
        self.layout.create_all()?;
        let mut store = PlayerStore::new(utc_now());

        let seed_profiles = match seed_file.filter(|p| p.exists()) {
            Some(path) => {
                tracing::info!("[Step 1/4] Reading seed player ids from {}", path.display());
                let ids = load_seed_ids(path)?;
                tracing::info!("Processing {} player ids from file...", ids.len());
                self.collect_profiles(&mut store, &ids).await?
            }
            None => {
                tracing::info!("[Step 1/4] Using empty database (no seed file)");
                0
            }
        };

        let discovered = if years.is_empty() {
            tracing::info!("[Step 2/4] Skipping match data discovery (no years specified)");
            0
        } else {
            tracing::info!("[Step 2/4] Discovering additional players from match data...");
            let n = self.discover_from_matches(&mut store, years).await;
            tracing::info!("Expanded from {} to {} total players", seed_profiles, store.len());
            n
        };

        let config = FabrikConfig {
            max_matches: Some(self.match_cap),
            ..self.fabrik.clone()
        };
        let fabrik = FabrikClient::new(self.http, config);
        let mut matches = Vec::new();
        for &year in years {
            tracing::info!("[Step 3/4] Scraping {} matches...", year);
            matches.extend(fabrik.scrape_year(year).await);
        }

        tracing::info!("[Step 4/4] Generating reports...");
        save_players_by_gender(&self.layout, store.players())?;

        let by_gender: BTreeMap<String, usize> = store
            .gender_counts()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let report = CollectionReport {
            scraped_at: utc_now(),
            total_players: store.len(),
            summary: format!(
                "Collected {} players: {} men, {} women, {} unknown",
                store.len(),
                by_gender["men"],
                by_gender["women"],
                by_gender["unknown"]
            ),
            by_gender,
            data_sources: DataSources {
                seed_profiles,
                match_data_discovery: discovered,
                matches_scraped: matches.len(),
            },
            years_scraped: years.to_vec(),
        };
        write_json(&self.layout.root().join("collection_report.json"), &report)?;

        if !matches.is_empty() {
            let path = self.layout.matches().join("matches_all.json");
            write_json(&path, &matches)?;
            tracing::info!("Saved {} matches to {}", matches.len(), path.display());
        }

        tracing::info!("{}", report.summary);
        Ok(report)
    }
}

/// Session metadata of a TTBL scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtblMetadata {
    pub scrape_date: String,
    pub season: String,
    pub total_matches: usize,
    pub total_gamedays: u32,
    pub unique_players: usize,
    pub players_with_stats: usize,
    pub total_games_processed: usize,
    pub source: String,
    pub version: String,
}

/// Full TTBL season scrape
pub struct TtblCollector<'a> {
    client: TtblClient<'a>,
    layout: OutputLayout,
}

impl<'a> TtblCollector<'a> {
    pub fn new(http: &'a HttpClient, config: TtblConfig, layout: OutputLayout) -> Self {
        Self {
            client: TtblClient::new(http, config),
            layout,
        }
    }

    pub async fn run(&self) -> Result<TtblMetadata, AppError> {
        let config = self.client.config();

        tracing::info!("[1/5] Discovering match ids for season {}...", config.season);
        let match_ids = self.client.discover_match_ids().await;
        tracing::info!("Found {} unique matches", match_ids.len());
        std::fs::create_dir_all(self.layout.root())?;
        let id_list: Vec<&str> = match_ids.iter().map(String::as_str).collect();
        std::fs::write(self.layout.root().join("match_ids.txt"), id_list.join("\n"))?;

        tracing::info!("[2/5] Fetching match data...");
        let mut games: Vec<GameRecord> = Vec::new();
        let mut lineups = Vec::new();
        let mut summaries = Vec::new();

        for (i, match_id) in match_ids.iter().enumerate() {
            let Some(data) = self.client.fetch_match(match_id).await else {
                continue;
            };
            write_json(&self.layout.matches().join(format!("match_{}.json", match_id)), &data)?;

            let match_games = game_records(match_id, &data);
            tracing::info!("[{}/{}] {}: {} games", i + 1, match_ids.len(), match_id, match_games.len());
            games.extend(match_games);
            lineups.extend(lineup_players(match_id, &data));
            summaries.push(match_summary(&data));
        }

        tracing::info!("[3/5] Calculating player statistics...");
        let mut book = PlayerStatsBook::new();
        for game in &games {
            book.record(game);
        }
        let stats = book.finalize();
        write_json(&self.layout.stats().join("player_stats_final.json"), &stats)?;

        tracing::info!("[4/5] Extracting players and summaries...");
        let players = unique_players(&lineups);
        write_json(&self.layout.players().join("all_players.json"), &lineups)?;
        write_json(&self.layout.players().join("unique_players.json"), &players)?;
        write_json(&self.layout.root().join("matches_summary.json"), &summaries)?;
        write_json(&self.layout.stats().join("games_data.json"), &games)?;

        tracing::info!("[5/5] Generating reports...");
        let metadata = TtblMetadata {
            scrape_date: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            season: config.season.clone(),
            total_matches: match_ids.len(),
            total_gamedays: config.gamedays,
            unique_players: players.len(),
            players_with_stats: stats.len(),
            total_games_processed: games.len(),
            source: config.base_url.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        write_json(&self.layout.root().join("metadata.json"), &metadata)?;
        write_json(&self.layout.stats().join("top_players.json"), &top_players(&stats, 5, 20))?;
        write_json(
            &self.layout.stats().join("match_states.json"),
            &match_state_counts(&summaries),
        )?;

        Ok(metadata)
    }
}

/// How many stored games can feed a rating calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EloReadiness {
    pub total_games: usize,
    pub valid_games: usize,
}

impl EloReadiness {
    pub fn excluded(&self) -> usize {
        self.total_games - self.valid_games
    }

    pub fn is_ready(&self) -> bool {
        self.valid_games > 0
    }
}

/// Check a `stats/games_data.json` file written by [`TtblCollector`]
pub fn verify_games_file(path: &Path) -> Result<EloReadiness, AppError> {
    let body = std::fs::read_to_string(path)?;
    let games: Vec<GameRecord> = serde_json::from_str(&body)?;
    Ok(EloReadiness {
        total_games: games.len(),
        valid_games: elo_ready_games(&games).len(),
    })
}

/// Raw rankings output of the `batch` command
pub fn rankings_document(rankings: &RankingsMap, now: &str) -> Value {
    serde_json::json!({
        "summary": summarize_rankings(rankings, now),
        "rankings": rankings,
    })
}

/// Output of the `ranking-pages` command
pub fn ranking_pages_document(db: &PlayerIdDatabase, sample: &[VerifiedPlayer], now: &str) -> Value {
    let categories: Vec<&String> = db.per_category.keys().collect();
    serde_json::json!({
        "metadata": {
            "scraped_at": now,
            "source": "ittf_rankings_pages",
            "categories_scraped": categories,
            "total_unique_players": db.all_ids.len(),
            "men_players": db.men_ids.len(),
            "women_players": db.women_ids.len(),
        },
        "players": {
            "all_ids": db.all_ids,
            "men_ids": db.men_ids,
            "women_ids": db.women_ids,
        },
        "sample_validated": sample,
    })
}

/// Matches of one year as written by the `matches` command
pub fn matches_document(matches: &[MatchRecord], now: &str) -> Value {
    serde_json::json!({
        "scraped_at": now,
        "total_matches": matches.len(),
        "matches": matches,
    })
}

/// Player ids found in match rows, readable back as a seed file
pub fn match_players_document(matches: &[MatchRecord], now: &str) -> Value {
    let players: Vec<Value> = extract_player_ids(matches)
        .into_iter()
        .map(|(id, name)| serde_json::json!({"IttfId": id, "name": name}))
        .collect();
    players_envelope(&players, now)
}
