use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Result, SearchError};

/// Upper bound on how long a `Retry-After` is honoured.
const MAX_RETRY_AFTER_SECS: u64 = 30;

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// A GET-only client that spaces requests by `min_interval` and retries
/// transport failures and 429s a bounded number of times.
pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
}

impl RateLimitedClient {
    pub fn new(
        min_interval: Duration,
        max_retries: u32,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            max_retries,
        })
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            debug!(url, attempt, "GET");
            match self.client.get(url).send().await {
                Ok(r) if r.status() == 429 => {
                    if attempt >= self.max_retries {
                        return Err(SearchError::Api(
                            url.to_string(),
                            "HTTP 429: rate limited".to_string(),
                        ));
                    }
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(1)
                        .min(MAX_RETRY_AFTER_SECS);
                    warn!(url, wait, "rate limited, backing off");
                    sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r) if !r.status().is_success() => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(SearchError::Api(
                        url.to_string(),
                        format!("HTTP {status}: {body}"),
                    ));
                }
                Ok(r) => return r.text().await.map_err(SearchError::Http),
                Err(e) => {
                    if attempt >= self.max_retries || e.is_timeout() {
                        return Err(SearchError::Http(e));
                    }
                    let backoff = 2u64.pow(attempt);
                    sleep(Duration::from_secs(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get(url).await?;
        serde_json::from_str(&text).map_err(|e| SearchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;
    use serde::Deserialize;

    use super::*;

    fn client() -> RateLimitedClient {
        RateLimitedClient::new(
            Duration::from_millis(1),
            0,
            "chapters-search-test",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[derive(Deserialize)]
    struct Ping {
        ok: bool,
    }

    #[tokio::test]
    async fn get_json_decodes_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let ping: Ping = client().get_json(&format!("{}/ping", server.url())).await.unwrap();
        assert!(ping.ok);
    }

    #[tokio::test]
    async fn non_success_is_api_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client().get(&format!("{}/ping", server.url())).await.unwrap_err();
        assert!(matches!(err, SearchError::Api(_, ref msg) if msg.starts_with("HTTP 500")));
    }

    #[tokio::test]
    async fn retries_exhausted_on_429() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(429)
            .create_async()
            .await;

        let err = client().get(&format!("{}/ping", server.url())).await.unwrap_err();
        assert!(matches!(err, SearchError::Api(_, ref msg) if msg.contains("429")));
    }
}
