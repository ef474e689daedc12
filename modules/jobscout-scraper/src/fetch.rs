//! HTTP page fetching with browser-like headers and bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use jobscout_common::JobScoutError;

/// Rotated per request so consecutive fetches do not share a fingerprint.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Max attempts per URL for transient network failures.
const MAX_ATTEMPTS: u32 = 3;
/// Base backoff between attempts. Actual delay is base * attempt (linear).
const RETRY_BASE: Duration = Duration::from_secs(3);

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<String, JobScoutError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(request_timeout)
                .redirect(reqwest::redirect::Policy::limited(5))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    fn request(&self, url: &str, referer: Option<&str>) -> reqwest::RequestBuilder {
        let ua = USER_AGENTS[rand::rng().random_range(0..USER_AGENTS.len())];
        let mut req = self
            .client
            .get(url)
            .header("User-Agent", ua)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Cache-Control", "max-age=0")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("DNT", "1");
        if let Some(referer) = referer {
            req = req.header("Referer", referer);
        }
        req
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetch a page, retrying transient failures (timeouts, connection
    /// errors, 5xx) up to MAX_ATTEMPTS with linear backoff. 4xx responses
    /// are surfaced immediately, without retry.
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<String, JobScoutError> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.request(url, referer).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_server_error() {
                        last_error = format!("server returned {status}");
                        warn!(url, attempt, %status, "Server error, retrying");
                    } else if status.is_client_error() {
                        return Err(JobScoutError::Network(format!(
                            "request rejected with {status}"
                        )));
                    } else {
                        let body = resp
                            .text()
                            .await
                            .map_err(|e| JobScoutError::Network(e.to_string()))?;
                        info!(url, bytes = body.len(), "Fetched page");
                        return Ok(body);
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(url, attempt, error = %e, "Fetch failed, retrying");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(RETRY_BASE * attempt).await;
            }
        }

        Err(JobScoutError::Network(format!(
            "failed after {MAX_ATTEMPTS} attempts: {last_error}"
        )))
    }
}
