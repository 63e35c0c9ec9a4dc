//! HTTP client with rate limiting and retry for all sources

use super::ScraperError;
use reqwest::{header, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Scraper configuration
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Minimum delay between request starts in milliseconds
    pub delay_ms: u64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Max attempts per request
    pub max_retries: u32,
    /// Base backoff for server/transport errors, doubled per attempt
    pub backoff_base_ms: u64,
    /// Wait used for 429 responses without a Retry-After header
    pub retry_after_default_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            timeout_secs: 30,
            max_retries: 3,
            backoff_base_ms: 1000,
            retry_after_default_secs: 5,
            user_agent: format!("ttscrape/{} (Data Collection)", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Raw response body plus the bits callers branch on
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    /// Whether the server declared a JSON body
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }
}

/// Rate-limited HTTP client shared by every scraper
pub struct HttpClient {
    client: reqwest::Client,
    config: ScraperConfig,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl HttpClient {
    /// Create a new client with the given configuration
    pub fn new(config: ScraperConfig) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            config,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Wait for rate limit
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let delay = Duration::from_millis(self.config.delay_ms);

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.backoff_base_ms.saturating_mul(1 << attempt.min(16)))
    }

    /// GET a page with rate limiting and retry
    ///
    /// * 2xx: body returned
    /// * 429: wait `Retry-After` (or the configured default) doubled per attempt, retry
    /// * 401/403/404: terminal, `Ok(None)`
    /// * 5xx or transport error: exponential backoff, retry
    /// * anything else: `Ok(None)`
    pub async fn get_text(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<Option<FetchedPage>, ScraperError> {
        let max = self.config.max_retries.max(1);
        let mut last_error = String::from("no attempt made");

        for attempt in 0..max {
            self.wait_for_rate_limit().await;
            tracing::debug!("GET {} (attempt {}/{})", url, attempt + 1, max);

            let is_last = attempt + 1 >= max;

            match self.client.get(url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = response
                            .headers()
                            .get(header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.trim().parse::<u64>().ok())
                            .unwrap_or(self.config.retry_after_default_secs);
                        let wait = Duration::from_secs(retry_after) * (1u32 << attempt.min(16));
                        tracing::warn!("Rate limited by {}. Waiting {:?} before retry", url, wait);
                        last_error = "HTTP 429".to_string();
                        if !is_last {
                            tokio::time::sleep(wait).await;
                        }
                        continue;
                    }

                    if status.is_success() {
                        let content_type = response
                            .headers()
                            .get(header::CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let body = response.text().await?;
                        return Ok(Some(FetchedPage {
                            status: status.as_u16(),
                            content_type,
                            body,
                        }));
                    }

                    if matches!(
                        status,
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
                    ) {
                        let body = response.text().await.unwrap_or_default();
                        tracing::error!("HTTP {} for {}: {}", status.as_u16(), url, truncate(&body, 200));
                        return Ok(None);
                    }

                    if status.is_server_error() {
                        last_error = format!("Server error: {}", status.as_u16());
                        tracing::warn!(
                            "Request failed with status {} (attempt {}/{})",
                            status,
                            attempt + 1,
                            max
                        );
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        tracing::warn!("HTTP {} for {}: {}", status.as_u16(), url, truncate(&body, 200));
                        return Ok(None);
                    }
                }
                Err(e) => {
                    tracing::warn!("Request failed (attempt {}/{}): {}", attempt + 1, max, e);
                    last_error = e.to_string();
                }
            }

            if !is_last {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
        }

        tracing::error!("All retries exhausted for {}. Last error: {}", url, last_error);
        Err(ScraperError::RetriesExhausted {
            url: url.to_string(),
            attempts: max,
            last_error,
        })
    }

    /// GET a JSON document; an unparseable body is logged and yields `Ok(None)`
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<Option<Value>, ScraperError> {
        let Some(page) = self.get_text(url, query).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Value>(&page.body) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::error!("Failed to parse JSON response from {}: {}", url, e);
                Ok(None)
            }
        }
    }
}

/// First `max` characters of a body for log lines
pub(crate) fn truncate(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}

/// Build an owned query list from string pairs
pub fn query<K: ToString, V: ToString>(pairs: &[(K, V)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
