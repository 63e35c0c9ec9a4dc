//! TTBL (German Bundesliga) schedule and match API
//!
//! Match ids are UUIDs found in the gameday links of the season schedule
//! pages. Each match document from the internal API lists its individual
//! games with home/away players and the winning side.

use super::{HttpClient, TTBL_BASE_URL};
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

/// TTBL scrape configuration
#[derive(Debug, Clone)]
pub struct TtblConfig {
    pub base_url: String,
    pub season: String,
    pub gamedays: u32,
}

impl Default for TtblConfig {
    fn default() -> Self {
        Self {
            base_url: TTBL_BASE_URL.to_string(),
            season: "2025-2026".to_string(),
            gamedays: 18,
        }
    }
}

/// Player reference inside a game record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePlayer {
    pub id: Option<String>,
    pub name: String,
}

/// One individual game of a team match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub match_id: String,
    pub gameday: String,
    pub timestamp: Value,
    pub game_index: Value,
    pub game_state: Option<String>,
    pub winner_side: Option<String>,
    pub home_player: GamePlayer,
    pub away_player: GamePlayer,
}

impl GameRecord {
    pub fn is_finished(&self) -> bool {
        self.game_state.as_deref() == Some("Finished")
    }
}

/// Win/loss record per player over finished games
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtblPlayerStats {
    pub id: String,
    pub name: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub last_match: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_rate: Option<u32>,
}

/// Accumulates player stats in first-seen order
#[derive(Debug, Default)]
pub struct PlayerStatsBook {
    stats: Vec<TtblPlayerStats>,
    index: HashMap<String, usize>,
}

impl PlayerStatsBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn credit(&mut self, player: &GamePlayer, match_id: &str, won: bool) {
        let Some(id) = player.id.as_deref().filter(|id| *id != "null") else {
            return;
        };

        let idx = match self.index.get(id) {
            Some(&idx) => idx,
            None => {
                self.stats.push(TtblPlayerStats {
                    id: id.to_string(),
                    name: player.name.clone(),
                    games_played: 0,
                    wins: 0,
                    losses: 0,
                    last_match: match_id.to_string(),
                    win_rate: None,
                });
                self.index.insert(id.to_string(), self.stats.len() - 1);
                self.stats.len() - 1
            }
        };

        let entry = &mut self.stats[idx];
        entry.games_played += 1;
        entry.last_match = match_id.to_string();
        if won {
            entry.wins += 1;
        } else {
            entry.losses += 1;
        }
    }

    /// Count a game; only finished games are credited
    pub fn record(&mut self, game: &GameRecord) {
        if !game.is_finished() {
            return;
        }
        let winner = game.winner_side.as_deref();
        self.credit(&game.home_player, &game.match_id, winner == Some("Home"));
        self.credit(&game.away_player, &game.match_id, winner == Some("Away"));
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Stats with integer win rate, best first
    pub fn finalize(self) -> Vec<TtblPlayerStats> {
        let mut out: Vec<TtblPlayerStats> = self
            .stats
            .into_iter()
            .map(|mut s| {
                s.win_rate = Some(if s.games_played > 0 {
                    s.wins * 100 / s.games_played
                } else {
                    0
                });
                s
            })
            .collect();
        out.sort_by(|a, b| b.win_rate.cmp(&a.win_rate));
        out
    }
}

/// Team block of a match summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: Value,
    pub name: Value,
    pub rank: Value,
    pub game_wins: Value,
    pub set_wins: Value,
}

/// Condensed match document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub match_id: Value,
    pub match_state: Option<String>,
    pub gameday: Value,
    pub timestamp: Value,
    pub home_team: TeamSummary,
    pub away_team: TeamSummary,
    pub games_count: usize,
    pub venue: Value,
}

/// Lineup player listed on a match document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupPlayer {
    pub id: Value,
    pub first_name: Value,
    pub last_name: Value,
    pub image_url: Value,
    pub match_id: String,
}

/// Count of matches per state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCount {
    pub state: Option<String>,
    pub count: usize,
}

fn uuid_suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-f0-9-]{36}$").unwrap())
}

/// Match UUIDs from the gameday links of a schedule page, in page order
pub fn extract_match_ids(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(link_selector) = Selector::parse("a[href*='/bundesliga/gameday/']") else {
        return Vec::new();
    };

    document
        .select(&link_selector)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| {
            uuid_suffix_pattern()
                .find(href.trim_end_matches('/'))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

fn lookup<'v>(value: &'v Value, key: &str) -> &'v Value {
    value.get(key).unwrap_or(&Value::Null)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn game_player(game: &Value, primary: &str, fallback: &str) -> GamePlayer {
    let player = [primary, fallback]
        .iter()
        .map(|k| lookup(game, k))
        .find(|v| v.as_object().is_some_and(|o| !o.is_empty()));

    match player {
        Some(p) => {
            let first = lookup(p, "firstName").as_str().unwrap_or("");
            let last = lookup(p, "lastName").as_str().unwrap_or("");
            GamePlayer {
                id: id_string(lookup(p, "id")),
                name: format!("{} {}", first, last).trim().to_string(),
            }
        }
        None => GamePlayer {
            id: None,
            name: "Unknown".to_string(),
        },
    }
}

/// Individual games of a match document
pub fn game_records(match_id: &str, match_data: &Value) -> Vec<GameRecord> {
    let gameday = lookup(lookup(match_data, "gameday"), "name")
        .as_str()
        .unwrap_or("Unknown")
        .to_string();
    let timestamp = match_data.get("timeStamp").cloned().unwrap_or(Value::from(0));

    lookup(match_data, "games")
        .as_array()
        .map(|games| {
            games
                .iter()
                .map(|game| GameRecord {
                    match_id: match_id.to_string(),
                    gameday: gameday.clone(),
                    timestamp: timestamp.clone(),
                    game_index: lookup(game, "index").clone(),
                    game_state: lookup(game, "gameState").as_str().map(str::to_string),
                    winner_side: lookup(game, "winnerSide").as_str().map(str::to_string),
                    home_player: game_player(game, "homePlayer", "homeLeaguePlayer"),
                    away_player: game_player(game, "awayPlayer", "awayLeaguePlayer"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn team_summary(match_data: &Value, side: &str) -> TeamSummary {
    let team = lookup(match_data, &format!("{}Team", side));
    TeamSummary {
        id: lookup(team, "id").clone(),
        name: lookup(team, "name").clone(),
        rank: lookup(team, "rank").clone(),
        game_wins: lookup(match_data, &format!("{}GameWins", side)).clone(),
        set_wins: lookup(match_data, &format!("{}SetWins", side)).clone(),
    }
}

/// Summary of a match document
pub fn match_summary(match_data: &Value) -> MatchSummary {
    MatchSummary {
        match_id: lookup(match_data, "id").clone(),
        match_state: lookup(match_data, "matchState").as_str().map(str::to_string),
        gameday: lookup(lookup(match_data, "gameday"), "name").clone(),
        timestamp: lookup(match_data, "timeStamp").clone(),
        home_team: team_summary(match_data, "home"),
        away_team: team_summary(match_data, "away"),
        games_count: lookup(match_data, "games").as_array().map_or(0, Vec::len),
        venue: lookup(lookup(match_data, "venue"), "name").clone(),
    }
}

const LINEUP_KEYS: [&str; 6] = [
    "homePlayerOne",
    "homePlayerTwo",
    "homePlayerThree",
    "guestPlayerOne",
    "guestPlayerTwo",
    "guestPlayerThree",
];

/// Lineup players of a match document
pub fn lineup_players(match_id: &str, match_data: &Value) -> Vec<LineupPlayer> {
    LINEUP_KEYS
        .iter()
        .map(|k| lookup(match_data, k))
        .filter(|p| p.is_object())
        .map(|p| LineupPlayer {
            id: lookup(p, "id").clone(),
            first_name: lookup(p, "firstName").clone(),
            last_name: lookup(p, "lastName").clone(),
            image_url: lookup(p, "imageUrl").clone(),
            match_id: match_id.to_string(),
        })
        .collect()
}

/// First appearance of every lineup player with an id
pub fn unique_players(players: &[LineupPlayer]) -> Vec<LineupPlayer> {
    let mut seen = BTreeSet::new();
    players
        .iter()
        .filter(|p| match id_string(&p.id) {
            Some(id) => seen.insert(id),
            None => false,
        })
        .cloned()
        .collect()
}

/// Matches per state, ordered by first appearance
pub fn match_state_counts(summaries: &[MatchSummary]) -> Vec<StateCount> {
    let mut counts: Vec<StateCount> = Vec::new();
    for s in summaries {
        match counts.iter_mut().find(|c| c.state == s.match_state) {
            Some(c) => c.count += 1,
            None => counts.push(StateCount {
                state: s.match_state.clone(),
                count: 1,
            }),
        }
    }
    counts
}

/// Best players with at least `min_games` games
pub fn top_players(stats: &[TtblPlayerStats], min_games: u32, limit: usize) -> Vec<TtblPlayerStats> {
    stats
        .iter()
        .filter(|s| s.games_played >= min_games)
        .take(limit)
        .cloned()
        .collect()
}

/// Games usable for rating calculations
pub fn elo_ready_games(games: &[GameRecord]) -> Vec<&GameRecord> {
    games
        .iter()
        .filter(|g| {
            g.is_finished()
                && g.winner_side.is_some()
                && g.home_player.name != "Unknown"
                && g.away_player.name != "Unknown"
        })
        .collect()
}

/// Client for TTBL pages and the internal match API
pub struct TtblClient<'a> {
    http: &'a HttpClient,
    config: TtblConfig,
}

impl<'a> TtblClient<'a> {
    pub fn new(http: &'a HttpClient, config: TtblConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &TtblConfig {
        &self.config
    }

    pub fn schedule_url(&self, gameday: u32) -> String {
        format!(
            "{}/bundesliga/gameschedule/{}/{}/all",
            self.config.base_url.trim_end_matches('/'),
            self.config.season,
            gameday
        )
    }

    pub fn match_url(&self, match_id: &str) -> String {
        format!(
            "{}/api/internal/match/{}",
            self.config.base_url.trim_end_matches('/'),
            match_id
        )
    }

    /// Sorted unique match ids over all gamedays of the season
    pub async fn discover_match_ids(&self) -> Vec<String> {
        let mut ids = BTreeSet::new();

        for gameday in 1..=self.config.gamedays {
            let url = self.schedule_url(gameday);
            match self.http.get_text(&url, &[]).await {
                Ok(Some(page)) => {
                    let found = extract_match_ids(&page.body);
                    tracing::info!("Gameday {}/{}: {} match links", gameday, self.config.gamedays, found.len());
                    ids.extend(found);
                }
                Ok(None) => tracing::warn!("Gameday {}: no schedule page", gameday),
                Err(e) => tracing::error!("Gameday {}: {}", gameday, e),
            }
        }

        ids.into_iter().collect()
    }

    /// Raw match document
    pub async fn fetch_match(&self, match_id: &str) -> Option<Value> {
        match self.http.get_json(&self.match_url(match_id), &[]).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Error processing match {}: {}", match_id, e);
                None
            }
        }
    }
}

/// Group stats by id for quick lookups in reports
pub fn stats_by_id(stats: &[TtblPlayerStats]) -> BTreeMap<&str, &TtblPlayerStats> {
    stats.iter().map(|s| (s.id.as_str(), s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UUID_A: &str = "0f8e2b9c-1d3a-4c5b-9e7f-a1b2c3d4e5f6";
    const UUID_B: &str = "a1b2c3d4-e5f6-4a1b-8c2d-3e4f5a6b7c8d";

    fn sample_match() -> Value {
        json!({
            "id": UUID_A,
            "matchState": "Finished",
            "timeStamp": 1760000000,
            "gameday": {"name": "1. Spieltag"},
            "homeTeam": {"id": "h1", "name": "Borussia Düsseldorf", "rank": 1},
            "awayTeam": {"id": "a1", "name": "1. FC Saarbrücken", "rank": 2},
            "homeGameWins": 3,
            "awayGameWins": 1,
            "homeSetWins": 10,
            "awaySetWins": 5,
            "venue": {"name": "ARAG CenterCourt"},
            "homePlayerOne": {"id": "p1", "firstName": "Timo", "lastName": "Boll", "imageUrl": null},
            "guestPlayerOne": {"id": "p2", "firstName": "Patrick", "lastName": "Franziska"},
            "games": [
                {"index": 1, "gameState": "Finished", "winnerSide": "Home",
                 "homePlayer": {"id": "p1", "firstName": "Timo", "lastName": "Boll"},
                 "awayPlayer": {"id": "p2", "firstName": "Patrick", "lastName": "Franziska"}},
                {"index": 2, "gameState": "Finished", "winnerSide": "Away",
                 "homeLeaguePlayer": {"id": 7, "firstName": "Dang", "lastName": "Qiu"},
                 "awayPlayer": {"id": "p2", "firstName": "Patrick", "lastName": "Franziska"}},
                {"index": 3, "gameState": "Inactive", "winnerSide": null}
            ]
        })
    }

    #[test]
    fn test_extract_match_ids() {
        let html = format!(
            r#"<html><body>
                <a href="/bundesliga/gameday/2025-2026/1/{a}">Match</a>
                <a href="/bundesliga/gameday/2025-2026/1/{b}/">Match</a>
                <a href="/bundesliga/gameday/2025-2026/1/no-uuid">Broken</a>
                <a href="/news/{a}">News</a>
            </body></html>"#,
            a = UUID_A,
            b = UUID_B
        );
        assert_eq!(extract_match_ids(&html), vec![UUID_A.to_string(), UUID_B.to_string()]);
    }

    #[test]
    fn test_game_records() {
        let games = game_records(UUID_A, &sample_match());
        assert_eq!(games.len(), 3);
        assert_eq!(games[0].gameday, "1. Spieltag");
        assert_eq!(games[0].home_player.name, "Timo Boll");
        assert_eq!(games[1].home_player.id.as_deref(), Some("7"));
        assert_eq!(games[2].home_player.name, "Unknown");
        assert!(games[2].home_player.id.is_none());
    }

    #[test]
    fn test_game_records_skip_empty_players() {
        let data = json!({
            "games": [{
                "index": 1,
                "gameState": "Finished",
                "winnerSide": "Home",
                "homePlayer": {},
                "homeLeaguePlayer": {"id": "p9", "firstName": "Timo", "lastName": "Boll"},
                "awayPlayer": {}
            }]
        });
        let games = game_records(UUID_A, &data);
        assert_eq!(games[0].home_player.name, "Timo Boll");
        assert_eq!(games[0].home_player.id.as_deref(), Some("p9"));
        assert_eq!(games[0].away_player.name, "Unknown");
        assert!(elo_ready_games(&games).is_empty());
    }

    #[test]
    fn test_player_stats_book() {
        let mut book = PlayerStatsBook::new();
        for game in game_records(UUID_A, &sample_match()) {
            book.record(&game);
        }
        assert_eq!(book.len(), 3);

        let stats = book.finalize();
        let by_id = stats_by_id(&stats);
        assert_eq!(by_id["p1"].wins, 1);
        assert_eq!(by_id["p1"].win_rate, Some(100));
        assert_eq!(by_id["p2"].games_played, 2);
        assert_eq!(by_id["p2"].wins, 1);
        assert_eq!(by_id["p2"].win_rate, Some(50));
        assert_eq!(by_id["7"].losses, 1);
        assert_eq!(by_id["7"].win_rate, Some(0));
        // Sorted by win rate, best first
        assert_eq!(stats[0].id, "p1");
        assert_eq!(stats[2].id, "7");
    }

    #[test]
    fn test_win_rate_floors() {
        let mut book = PlayerStatsBook::new();
        let home = GamePlayer { id: Some("h".into()), name: "H".into() };
        let away = GamePlayer { id: Some("a".into()), name: "A".into() };
        for winner in ["Home", "Home", "Away"] {
            book.record(&GameRecord {
                match_id: "m".into(),
                gameday: "g".into(),
                timestamp: json!(0),
                game_index: json!(1),
                game_state: Some("Finished".into()),
                winner_side: Some(winner.into()),
                home_player: home.clone(),
                away_player: away.clone(),
            });
        }
        let stats = book.finalize();
        assert_eq!(stats[0].id, "h");
        assert_eq!(stats[0].win_rate, Some(66));
        assert_eq!(stats[1].win_rate, Some(33));
    }

    #[test]
    fn test_match_summary() {
        let summary = match_summary(&sample_match());
        assert_eq!(summary.match_state.as_deref(), Some("Finished"));
        assert_eq!(summary.home_team.game_wins, json!(3));
        assert_eq!(summary.away_team.set_wins, json!(5));
        assert_eq!(summary.games_count, 3);
        assert_eq!(summary.venue, json!("ARAG CenterCourt"));

        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("homeTeam").is_some());
        assert!(value["homeTeam"].get("gameWins").is_some());
    }

    #[test]
    fn test_lineup_and_unique_players() {
        let mut players = lineup_players(UUID_A, &sample_match());
        assert_eq!(players.len(), 2);
        players.extend(lineup_players(UUID_B, &sample_match()));
        let unique = unique_players(&players);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].match_id, UUID_A);
    }

    #[test]
    fn test_match_state_counts() {
        let mut other = sample_match();
        other["matchState"] = json!("Upcoming");
        let summaries = vec![
            match_summary(&sample_match()),
            match_summary(&other),
            match_summary(&sample_match()),
        ];
        let counts = match_state_counts(&summaries);
        assert_eq!(counts[0], StateCount { state: Some("Finished".into()), count: 2 });
        assert_eq!(counts[1].count, 1);
    }

    #[test]
    fn test_top_players_and_elo_ready() {
        let games = game_records(UUID_A, &sample_match());
        assert_eq!(elo_ready_games(&games).len(), 2);

        let mut book = PlayerStatsBook::new();
        for g in &games {
            book.record(g);
        }
        let stats = book.finalize();
        assert_eq!(top_players(&stats, 2, 20).len(), 1);
        assert_eq!(top_players(&stats, 1, 2).len(), 2);
    }

    #[test]
    fn test_urls() {
        let http = HttpClient::new(crate::scraper::ScraperConfig::default()).unwrap();
        let client = TtblClient::new(&http, TtblConfig::default());
        assert_eq!(
            client.schedule_url(3),
            "https://www.ttbl.de/bundesliga/gameschedule/2025-2026/3/all"
        );
        assert_eq!(
            client.match_url(UUID_A),
            format!("https://www.ttbl.de/api/internal/match/{}", UUID_A)
        );
    }
}
