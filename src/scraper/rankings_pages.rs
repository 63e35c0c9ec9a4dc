//! ITTF ranking listing pages
//!
//! The HTML lists link every player with a `player_id_raw=<id>` query
//! parameter; we harvest ids by regex rather than by table structure since
//! the markup changes between categories.

use super::{HttpClient, RANKINGS_BASE_URL};
use crate::core::Gender;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Rows per ranking page
pub const PAGE_SIZE: usize = 50;
/// Hard stop for runaway pagination
pub const MAX_OFFSET: usize = 10_000;

/// Ids checked against the rankings gateway after a full scrape
pub const VERIFY_SAMPLE_SIZE: usize = 10;

/// A ranking list on results.ittf.link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingCategory {
    pub slug: &'static str,
    pub list_id: &'static str,
    pub gender: Gender,
}

/// Singles ranking lists, seniors and youth
pub const CATEGORIES: [RankingCategory; 4] = [
    RankingCategory {
        slug: "ittf-ranking-men-singles",
        list_id: "57",
        gender: Gender::Men,
    },
    RankingCategory {
        slug: "ittf-ranking-women-singles",
        list_id: "58",
        gender: Gender::Women,
    },
    RankingCategory {
        slug: "ittf-ranking-boys-singles",
        list_id: "63",
        gender: Gender::Men,
    },
    RankingCategory {
        slug: "ittf-ranking-girls-singles",
        list_id: "64",
        gender: Gender::Women,
    },
];

/// Ids collected from all ranking lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerIdDatabase {
    pub all_ids: BTreeSet<String>,
    pub men_ids: BTreeSet<String>,
    pub women_ids: BTreeSet<String>,
    pub per_category: BTreeMap<String, BTreeSet<String>>,
}

impl PlayerIdDatabase {
    /// Merge one category's ids, classifying by the category's gender
    pub fn add_category(&mut self, category: &RankingCategory, ids: BTreeSet<String>) {
        let bucket = match category.gender {
            Gender::Men => &mut self.men_ids,
            Gender::Women => &mut self.women_ids,
            Gender::Mixed => &mut self.all_ids,
        };
        bucket.extend(ids.iter().cloned());
        self.all_ids.extend(ids.iter().cloned());
        self.per_category
            .entry(category.slug.to_string())
            .or_default()
            .extend(ids);
    }
}

fn player_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"player_id_raw=(\d+)").unwrap())
}

/// All `player_id_raw` values in a page, unique and sorted
pub fn extract_player_ids(html: &str) -> Vec<String> {
    let ids: BTreeSet<String> = player_id_pattern()
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect();
    ids.into_iter().collect()
}

/// Scraper for the ranking listing pages
pub struct RankingPagesScraper<'a> {
    http: &'a HttpClient,
    base_url: String,
}

impl<'a> RankingPagesScraper<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self::with_base_url(http, RANKINGS_BASE_URL)
    }

    pub fn with_base_url(http: &'a HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of one page of a category
    pub fn page_url(&self, category: &RankingCategory, offset: usize) -> String {
        format!(
            "{}/{}/list/{}?limitstart{}={}",
            self.base_url, category.slug, category.list_id, category.list_id, offset
        )
    }

    /// Ids on one page; failures yield an empty page
    pub async fn scrape_page(&self, category: &RankingCategory, offset: usize) -> Vec<String> {
        let url = self.page_url(category, offset);
        match self.http.get_text(&url, &[]).await {
            Ok(Some(page)) => {
                let ids = extract_player_ids(&page.body);
                tracing::info!("Offset {} ({}): {} players", offset, category.slug, ids.len());
                ids
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!("Error scraping {} offset {}: {}", category.slug, offset, e);
                Vec::new()
            }
        }
    }

    /// Walk a category page by page until an empty page or the offset cap
    pub async fn scrape_category(&self, category: &RankingCategory) -> BTreeSet<String> {
        tracing::info!("Scraping {} (list {})", category.slug, category.list_id);
        let mut ids = BTreeSet::new();
        let mut offset = 0;

        while offset <= MAX_OFFSET {
            let page_ids = self.scrape_page(category, offset).await;
            if page_ids.is_empty() {
                break;
            }
            let before = ids.len();
            ids.extend(page_ids);
            if ids.len() == before {
                // Same page again: the list ignores the offset
                tracing::info!("{}: offset {} returned no new ids; stopping", category.slug, offset);
                break;
            }
            offset += PAGE_SIZE;
        }

        tracing::info!("Completed {}: {} unique players", category.slug, ids.len());
        ids
    }

    /// Scrape every category
    pub async fn scrape_all(&self) -> PlayerIdDatabase {
        let mut db = PlayerIdDatabase::default();
        for category in CATEGORIES.iter() {
            let ids = self.scrape_category(category).await;
            db.add_category(category, ids);
        }
        db
    }
}
