//! Docker Hub tag metadata client

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use appmarket_core::{ImageReference, ManifestSource, TagManifest};

use crate::error::{RegistryError, Result};

/// Client for `GET {base}/v2/repositories/{namespace}/{name}/tags/{tag}`
pub struct DockerHubClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DockerHubClient {
    /// Create a client; every request is bounded by `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| RegistryError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("appmarket/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the tag metadata of one image
    pub async fn tag_manifest(&self, image: &ImageReference) -> Result<TagManifest> {
        let url = image.tag_url(&self.base_url);
        tracing::debug!(%url, "fetching tag metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RegistryError::from_transport(e, self.timeout.as_secs()))?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::TagNotFound {
                image: image.hub_path(),
                tag: image.tag.clone(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(RegistryError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(RegistryError::HttpError {
                status: status.as_u16(),
                message: format!("Request to {} failed", url),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::from_transport(e, self.timeout.as_secs()))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ManifestSource for DockerHubClient {
    async fn tag_manifest(&self, image: &ImageReference) -> appmarket_core::Result<TagManifest> {
        DockerHubClient::tag_manifest(self, image)
            .await
            .map_err(Into::into)
    }
}
