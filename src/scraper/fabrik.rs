//! Fabrik list API on results.ittf.link
//!
//! List 31 holds player matches. Rows are flat objects with `vw_matches___*`
//! keys whose values may be strings or numbers. Pagination uses
//! `limitstart<listid>`; some list views ignore it and keep returning the
//! first page, which the paginated loop detects as stagnation.

use super::{FetchedPage, HttpClient, FABRIK_BASE_URL};
use crate::core::{compute_set_score, infer_winner, parse_game_scores, safe_int};
use crate::models::{MatchPlayers, MatchRecord, MatchSource, PlayerRef};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Player matches list
pub const DEFAULT_LIST_ID: &str = "31";

/// Consecutive pages without a new id before pagination is considered stuck
const MAX_STAGNANT_PAGES: u32 = 2;

/// One Fabrik list row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FabrikRow(pub Map<String, Value>);

impl FabrikRow {
    fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(&format!("vw_matches___{}", name))
    }

    /// Field as a trimmed non-empty string
    pub fn text(&self, name: &str) -> Option<String> {
        let value = self.field(name)?;
        let s = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    /// Field passed through verbatim; null and empty strings become `None`
    pub fn raw(&self, name: &str) -> Option<Value> {
        match self.field(name)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            v => Some(v.clone()),
        }
    }

    pub fn match_id(&self) -> Option<String> {
        self.text("id")
    }

    /// Loose truthiness, as Fabrik sends `0`, `"0"`, `1`, `"1"` or nothing
    pub fn flag(&self, name: &str) -> bool {
        match self.field(name) {
            Some(Value::Bool(b)) => *b,
            Some(v) => safe_int(v).map(|n| n != 0).unwrap_or_else(|| {
                v.as_str().map(|s| !s.trim().is_empty()).unwrap_or(false)
            }),
            None => false,
        }
    }
}

/// Fabrik list configuration
#[derive(Debug, Clone)]
pub struct FabrikConfig {
    pub base_url: String,
    pub list_id: String,
    pub page_size: usize,
    pub max_pages: usize,
    /// Optional cap on rows collected per year
    pub max_matches: Option<usize>,
}

impl Default for FabrikConfig {
    fn default() -> Self {
        Self {
            base_url: FABRIK_BASE_URL.to_string(),
            list_id: DEFAULT_LIST_ID.to_string(),
            page_size: 500,
            max_pages: 500,
            max_matches: None,
        }
    }
}

impl FabrikConfig {
    /// Source descriptor written into every match record
    pub fn source(&self) -> MatchSource {
        MatchSource {
            kind: "fabrik_list".to_string(),
            base_url: self.base_url.clone(),
            list_id: self.list_id.clone(),
        }
    }
}

/// List ids known to exist on results.ittf.link
pub const KNOWN_LIST_IDS: [&str; 4] = ["31", "55", "70", "102"];

/// Outcome of probing a list id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListProbe {
    pub list_id: String,
    /// Year filter used for the request, if any
    pub year: Option<i32>,
    pub success: bool,
    pub content_type: Option<String>,
    pub item_count: Option<usize>,
    pub sample: Option<Value>,
    pub error: Option<String>,
}

impl ListProbe {
    /// Report key, e.g. `listid_31_default` or `listid_31_year_2025`
    pub fn key(&self) -> String {
        match self.year {
            Some(year) => format!("listid_{}_year_{}", self.list_id, year),
            None => format!("listid_{}_default", self.list_id),
        }
    }
}

/// Probe outcomes bucketed by failure kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeSummary {
    pub working_endpoints: Vec<String>,
    pub access_denied: Vec<String>,
    pub auth_required: Vec<String>,
    pub unknown_errors: Vec<String>,
}

impl ProbeSummary {
    pub fn from_probes(probes: &[ListProbe]) -> Self {
        let mut summary = Self::default();
        for probe in probes {
            let key = probe.key();
            if probe.success {
                summary.working_endpoints.push(key);
                continue;
            }
            match probe.error.as_deref() {
                Some("not_published") => summary.access_denied.push(key),
                Some("login_required") => summary.auth_required.push(key),
                other => summary
                    .unknown_errors
                    .push(format!("{}: {}", key, other.unwrap_or("no response"))),
            }
        }
        summary
    }
}

/// Query parameters for a list page
pub fn list_params(
    list_id: &str,
    year: Option<i32>,
    limit: usize,
    offset: usize,
    player_id: Option<&str>,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("option".to_string(), "com_fabrik".to_string()),
        ("view".to_string(), "list".to_string()),
        ("listid".to_string(), list_id.to_string()),
        ("format".to_string(), "json".to_string()),
        ("limit".to_string(), limit.to_string()),
    ];

    if let Some(year) = year {
        params.push(("vw_matches___yr[value]".to_string(), year.to_string()));
    }

    params.push((format!("limitstart{}", list_id), offset.to_string()));

    if let Some(pid) = player_id {
        params.push(("vw_matches___player_a_id[value][]".to_string(), pid.to_string()));
    }

    params
}

/// Rows from a list response: `[...]` or `[[...]]`, anything else is empty
pub fn unwrap_rows(value: Value) -> Vec<FabrikRow> {
    let items = match value {
        Value::Array(mut items) => {
            if items.len() == 1 && items[0].is_array() {
                match items.remove(0) {
                    Value::Array(inner) => inner,
                    _ => Vec::new(),
                }
            } else {
                items
            }
        }
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(FabrikRow(map)),
            _ => None,
        })
        .collect()
}

/// Normalize a match row
pub fn row_to_match(row: &FabrikRow, source: &MatchSource) -> MatchRecord {
    let games = parse_game_scores(&row.text("games_raw").unwrap_or_default());
    let final_sets = compute_set_score(&games);

    let a_id = row.text("player_a_id");
    let x_id = row.text("player_x_id");
    // Rows without any player id get no winner
    let winner_inferred = if a_id.is_some() || x_id.is_some() {
        infer_winner(&games)
    } else {
        None
    };

    MatchRecord {
        match_id: row.match_id().unwrap_or_default(),
        year: row.text("yr_raw").or_else(|| row.text("yr")),
        tournament: row.raw("tournament_id"),
        event: row.raw("event"),
        stage: row.raw("stage"),
        round: row.raw("round"),
        walkover: row.flag("wo"),
        winner_raw: row.field("winner").and_then(safe_int),
        winner_inferred,
        final_sets,
        games,
        players: MatchPlayers {
            a: PlayerRef {
                ittf_id: a_id,
                name: row.text("name_a"),
                association: row.text("assoc_a"),
            },
            x: PlayerRef {
                ittf_id: x_id,
                name: row.text("name_x"),
                association: row.text("assoc_x"),
            },
        },
        source: source.clone(),
    }
}

/// Unique player ids and names across matches; first sighting wins
pub fn extract_player_ids(matches: &[MatchRecord]) -> BTreeMap<String, String> {
    let mut players = BTreeMap::new();

    for m in matches {
        for p in [&m.players.a, &m.players.x] {
            if let Some(id) = &p.ittf_id {
                players
                    .entry(id.clone())
                    .or_insert_with(|| p.name.clone().unwrap_or_default());
            }
        }
    }

    players
}

/// Classify a list response that is not JSON
pub fn classify_html(body: &str) -> &'static str {
    if body.contains("Sorry") || body.contains("not published") {
        "not_published"
    } else if body.to_ascii_lowercase().contains("login") || body.contains("sign in") {
        "login_required"
    } else {
        "unknown"
    }
}

/// Client for Fabrik list endpoints
pub struct FabrikClient<'a> {
    http: &'a HttpClient,
    config: FabrikConfig,
}

impl<'a> FabrikClient<'a> {
    pub fn new(http: &'a HttpClient, config: FabrikConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &FabrikConfig {
        &self.config
    }

    /// Fetch one page of match rows; failures yield an empty page
    pub async fn fetch_page(
        &self,
        year: i32,
        offset: usize,
        player_id: Option<&str>,
    ) -> Vec<FabrikRow> {
        let params = list_params(
            &self.config.list_id,
            Some(year),
            self.config.page_size,
            offset,
            player_id,
        );

        match self.http.get_json(&self.config.base_url, &params).await {
            Ok(Some(value)) => unwrap_rows(value),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!("Error fetching matches for year {}: {}", year, e);
                Vec::new()
            }
        }
    }

    /// All match rows for a year, de-duplicated by match id
    ///
    /// Stops on an empty page, on stagnant pagination, at `max_pages` or
    /// once `max_matches` rows are collected.
    pub async fn fetch_year(&self, year: i32) -> Vec<FabrikRow> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut rows = Vec::new();
        let mut offset = 0;
        let mut stagnant_pages = 0;

        for page in 0..self.config.max_pages {
            let page_rows = self.fetch_page(year, offset, None).await;
            if page_rows.is_empty() {
                tracing::info!("Year {}: no more matches after {} pages", year, page);
                break;
            }

            let mut new_count = 0;
            for row in page_rows {
                let Some(id) = row.match_id() else {
                    continue;
                };
                if !seen.insert(id) {
                    continue;
                }
                new_count += 1;
                rows.push(row);

                if self.config.max_matches.is_some_and(|max| rows.len() >= max) {
                    tracing::info!("Year {}: reached cap of {} matches", year, rows.len());
                    return rows;
                }
            }

            if new_count == 0 {
                stagnant_pages += 1;
            } else {
                stagnant_pages = 0;
            }

            if stagnant_pages >= MAX_STAGNANT_PAGES {
                tracing::info!(
                    "Year {}: pagination appears stagnant; stopping after {} pages",
                    year,
                    page + 1
                );
                break;
            }

            tracing::debug!("Year {}: page {} added {} rows", year, page + 1, new_count);
            offset += self.config.page_size;
        }

        rows
    }

    /// Normalized matches for a year
    pub async fn scrape_year(&self, year: i32) -> Vec<MatchRecord> {
        let source = self.config.source();
        let rows = self.fetch_year(year).await;
        rows.iter().map(|row| row_to_match(row, &source)).collect()
    }

    /// Check whether a list id is publicly readable as JSON, optionally
    /// with the year filter applied
    pub async fn probe_list(&self, list_id: &str, year: Option<i32>) -> ListProbe {
        let params = list_params(list_id, year, 10, 0, None);
        let failed = |content_type: Option<&str>, error: String| ListProbe {
            list_id: list_id.to_string(),
            year,
            success: false,
            content_type: content_type.map(str::to_string),
            item_count: None,
            sample: None,
            error: Some(error),
        };

        let page: FetchedPage = match self.http.get_text(&self.config.base_url, &params).await {
            Ok(Some(page)) => page,
            Ok(None) => return failed(None, "request rejected".to_string()),
            Err(e) => return failed(None, e.to_string()),
        };

        if !page.is_json() {
            return failed(Some("html"), classify_html(&page.body).to_string());
        }

        match serde_json::from_str::<Value>(&page.body) {
            Ok(value) => {
                let (count, sample) = match &value {
                    Value::Array(items) => (items.len(), items.first().cloned()),
                    other => (1, Some(other.clone())),
                };
                ListProbe {
                    list_id: list_id.to_string(),
                    year,
                    success: true,
                    content_type: Some("json".to_string()),
                    item_count: Some(count),
                    sample,
                    error: None,
                }
            }
            Err(e) => failed(Some("json"), format!("invalid JSON: {}", e)),
        }
    }

    /// Probe each list without and then with the year filter
    pub async fn probe_lists(&self, list_ids: &[String], year: i32) -> Vec<ListProbe> {
        let mut probes = Vec::with_capacity(list_ids.len() * 2);
        for list_id in list_ids {
            probes.push(self.probe_list(list_id, None).await);
            probes.push(self.probe_list(list_id, Some(year)).await);
        }
        probes
    }
}
