use std::sync::Arc;
use std::time::Duration;

use log::warn;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use url::Url;

use crate::error::{PushLensError, Result};

const MAX_RETRIES: u32 = 5;
const RETRY_DELAY_SECONDS: u64 = 10;
const MAX_CONCURRENT_REQUESTS: usize = 50;

/// Base URLs of the services backing a Mozilla CI push.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// hg.mozilla.org root (e.g. <https://hg.mozilla.org>)
    pub hgmo_url: String,
    /// Path segment between the root and the branch (e.g. "integration")
    pub repo_prefix: String,
    /// ActiveData query endpoint
    pub activedata_url: String,
    /// Taskcluster root URL
    pub taskcluster_url: String,
}

/// HTTP client for hg.mozilla.org, ActiveData and Taskcluster.
pub struct MozillaClient {
    client: Client,
    pub(super) hgmo_url: Url,
    pub(super) repo_prefix: String,
    pub(super) activedata_url: Url,
    pub(super) taskcluster_url: Url,
    retry_delay: Duration,
    semaphore: Arc<Semaphore>,
}

impl MozillaClient {
    pub fn new(endpoints: &Endpoints) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pushlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PushLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            hgmo_url: parse_base_url(&endpoints.hgmo_url, "hg.mozilla.org")?,
            repo_prefix: endpoints.repo_prefix.trim_matches('/').to_string(),
            activedata_url: Url::parse(&endpoints.activedata_url)
                .map_err(|e| PushLensError::Config(format!("Invalid ActiveData URL: {e}")))?,
            taskcluster_url: parse_base_url(&endpoints.taskcluster_url, "Taskcluster")?,
            retry_delay: Duration::from_secs(RETRY_DELAY_SECONDS),
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        })
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub(super) async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send_with_retry(|| self.client.get(url.clone())).await?;
        Ok(response.json().await?)
    }

    pub(super) async fn post_json<T>(&self, url: Url, body: &impl serde::Serialize) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send_with_retry(|| self.client.post(url.clone()).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// Sends a request, retrying on network errors, rate limits and server errors.
    async fn send_with_retry<F>(&self, build_request: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| PushLensError::Config(format!("Request limiter closed: {e}")))?;

        let mut retry_count = 0;
        loop {
            let response = match build_request().send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    if retry_count >= MAX_RETRIES {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({e}), retrying in {}s ({}/{MAX_RETRIES})...",
                        self.retry_delay.as_secs(),
                        retry_count + 1,
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(PushLensError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: MAX_RETRIES,
                    });
                }

                warn!(
                    "API error (status {status}) from {}. Retrying in {}s ({}/{MAX_RETRIES})...",
                    response.url(),
                    self.retry_delay.as_secs(),
                    retry_count + 1,
                );

                tokio::time::sleep(self.retry_delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(PushLensError::ApiError {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response);
        }
    }
}

/// Parses a root URL so that relative joins land below it.
fn parse_base_url(raw: &str, service: &str) -> Result<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };

    Url::parse(&with_slash).map_err(|e| PushLensError::Config(format!("Invalid {service} URL: {e}")))
}
