//! Scrapers for the public table tennis data sources
//!
//! * [`wtt`]: WTT/ITTF rankings REST gateway (JSON)
//! * [`fabrik`]: results.ittf.link Fabrik list API (JSON, HTML when unpublished)
//! * [`rankings_pages`]: results.ittf.link ranking pages (HTML, ids by regex)
//! * [`ttbl`]: TTBL schedule pages and internal match API
//!
//! # Example
//!
//! ```no_run
//! use ttscrape::scraper::{HttpClient, ScraperConfig, WttClient};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let http = HttpClient::new(ScraperConfig::default())?;
//!     let wtt = WttClient::new(&http);
//!
//!     let (valid, name) = wtt.test_ittf_id("121558").await;
//!     println!("{}: {:?}", valid, name);
//!
//!     Ok(())
//! }
//! ```

mod client;
pub mod fabrik;
pub mod rankings_pages;
pub mod ttbl;
pub mod wtt;

pub use client::{query, FetchedPage, HttpClient, ScraperConfig};
pub use fabrik::{FabrikClient, FabrikConfig, FabrikRow};
pub use rankings_pages::{RankingCategory, RankingPagesScraper};
pub use ttbl::{TtblClient, TtblConfig};
pub use wtt::WttClient;

use thiserror::Error;

/// WTT rankings gateway
pub const WTT_BASE_URL: &str = "https://wttcmsapigateway-new.azure-api.net/internalttu";
/// Fabrik list endpoint on results.ittf.link
pub const FABRIK_BASE_URL: &str = "https://results.ittf.link/index.php";
/// Ranking listing pages on results.ittf.link
pub const RANKINGS_BASE_URL: &str = "https://results.ittf.link/index.php/ittf-rankings";
/// TTBL website
pub const TTBL_BASE_URL: &str = "https://www.ttbl.de";

/// Scraper errors
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Failed to fetch {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}
