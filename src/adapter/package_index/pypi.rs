//! PyPI JSON API Client
//!
//! `GET {base}/{name}/json` で公開済みバージョンを取得する

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

use super::retry::{
    calculate_retry_delay, error_chain_to_string, is_retryable_error, is_retryable_status,
    MAX_RETRIES,
};
use crate::domain::repositories::package_index::PackageIndex;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Outcome of a single request against the index
enum Attempt {
    Found(Vec<String>),
    NotFound,
    Retry(anyhow::Error),
    Fail(anyhow::Error),
}

/// Package index backed by a PyPI-compatible JSON API
pub struct PypiIndex {
    client: Client,
    base_url: String,
}

impl PypiIndex {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("finchat-bootstrap/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client for package index")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn project_url(&self, name: &str) -> String {
        format!("{}/{}/json", self.base_url, name)
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let retryable = is_retryable_error(&e);
                let err = anyhow!(e).context(format!("Request to {} failed", url));
                return if retryable {
                    Attempt::Retry(err)
                } else {
                    Attempt::Fail(err)
                };
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Attempt::NotFound;
        }
        if is_retryable_status(status.as_u16()) {
            return Attempt::Retry(anyhow!("{} returned {}", url, status));
        }
        if !status.is_success() {
            return Attempt::Fail(anyhow!("{} returned {}", url, status));
        }

        let document = match response.json::<Value>().await {
            Ok(document) => document,
            Err(e) => {
                return Attempt::Fail(
                    anyhow!(e).context(format!("Invalid JSON document from {}", url)),
                )
            }
        };

        match parse_releases(&document) {
            Ok(versions) => Attempt::Found(versions),
            Err(e) => Attempt::Fail(e.context(format!("Unexpected document from {}", url))),
        }
    }
}

/// Extracts installable release versions from a project document
///
/// Releases without files, or whose files are all yanked, are skipped.
pub fn parse_releases(document: &Value) -> Result<Vec<String>> {
    let Some(releases) = document.get("releases").and_then(|r| r.as_object()) else {
        bail!("missing \"releases\" object");
    };

    let versions = releases
        .iter()
        .filter(|(_, files)| match files.as_array() {
            Some(files) => files
                .iter()
                .any(|f| !f.get("yanked").and_then(|y| y.as_bool()).unwrap_or(false)),
            None => false,
        })
        .map(|(version, _)| version.clone())
        .collect();

    Ok(versions)
}

#[async_trait]
impl PackageIndex for PypiIndex {
    async fn releases(&self, name: &str) -> Result<Option<Vec<String>>> {
        let url = self.project_url(name);
        let mut retry_count = 0;

        loop {
            match self.attempt(&url).await {
                Attempt::Found(versions) => {
                    debug!("{}: {} releases", name, versions.len());
                    return Ok(Some(versions));
                }
                Attempt::NotFound => return Ok(None),
                Attempt::Retry(e) if retry_count < MAX_RETRIES => {
                    retry_count += 1;
                    let delay = calculate_retry_delay(retry_count);
                    warn!(
                        "⚠ Package index lookup for {} failed (attempt {}), retrying in {}ms: {}",
                        name,
                        retry_count,
                        delay,
                        error_chain_to_string(&e)
                    );
                    sleep(Duration::from_millis(delay)).await;
                }
                Attempt::Retry(e) | Attempt::Fail(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "Package index lookup for {} failed after {} retries",
                            name, retry_count
                        )
                    });
                }
            }
        }
    }
}
