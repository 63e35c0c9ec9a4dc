//! ttscrape - Table tennis data collector
//!
//! This library provides:
//! - A rate-limited HTTP client with retry for every source
//! - WTT rankings gateway, Fabrik match list, ranking page and TTBL scrapers
//! - Name, score and event-code heuristics
//! - Player stores and JSON output layout
//! - Collectors composing the above into full runs
//!
//! # Example
//!
//! ```
//! use ttscrape::core::{infer_winner, normalize_name, parse_game_scores, Side};
//!
//! let games = parse_game_scores("11:7 9:11 11:5 11:8");
//! assert_eq!(infer_winner(&games), Some(Side::A));
//!
//! let name = normalize_name("CALDERANO Hugo");
//! assert_eq!(name.last.as_deref(), Some("CALDERANO"));
//! ```

pub mod collector;
pub mod core;
pub mod data;
pub mod error;
pub mod models;
pub mod scraper;

// Re-export commonly used types
pub use collector::{MasterCollector, ProfileCollector, TtblCollector};
pub use data::{OutputLayout, PlayerStore};
pub use error::AppError;
pub use models::{MatchRecord, Player, PlayerRef, RankingEntry};
pub use scraper::{HttpClient, ScraperConfig, ScraperError};
