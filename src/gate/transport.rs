//! Retrieval of raw response bodies for a locator.

use crate::error::{Result, SiteError};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send + Sync {
    fn fetch(&self, locator: &str) -> impl Future<Output = Result<RawResponse>> + Send;
}

pub fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Fetches `http(s)://` locators over the network and resolves anything
/// else as a path below the site root, the way relative URLs resolve on the
/// published page.
pub struct SiteTransport {
    client: reqwest::Client,
    site_root: PathBuf,
    token: Option<String>,
}

impl SiteTransport {
    pub fn new(site_root: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("mcsite/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SiteError::Network {
                locator: "client".to_string(),
                source,
            })?;

        let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        if token.is_some() {
            tracing::debug!("Using GITHUB_TOKEN");
        }

        Ok(Self {
            client,
            site_root: site_root.into(),
            token,
        })
    }

    async fn fetch_remote(&self, locator: &str) -> Result<RawResponse> {
        let mut request = self
            .client
            .get(locator)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {}", token));
        }

        let network_err = |source| SiteError::Network {
            locator: locator.to_string(),
            source,
        };
        let response = request.send().await.map_err(network_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network_err)?;
        Ok(RawResponse { status, body })
    }

    async fn fetch_local(&self, locator: &str) -> Result<RawResponse> {
        let path = Path::new(locator);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.site_root.join(path)
        };
        tracing::trace!("Reading local resource {}", path.display());
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SiteError::Io {
                locator: path.display().to_string(),
                source,
            })?;
        Ok(RawResponse::ok(body))
    }
}

impl Transport for SiteTransport {
    async fn fetch(&self, locator: &str) -> Result<RawResponse> {
        tracing::debug!("Fetching {}", locator);
        if is_remote(locator) {
            self.fetch_remote(locator).await
        } else {
            self.fetch_local(locator).await
        }
    }
}
