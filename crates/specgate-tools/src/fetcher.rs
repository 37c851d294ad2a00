//! HTTP artifact downloads.

use async_trait::async_trait;
use specgate_core::{ArtifactFetcher, Error, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Downloads artifacts with reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
    auth_token: Option<String>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("specgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            auth_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request, for private
    /// mirrors.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    async fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        let download_error = |message: String| Error::Download {
            url: url.to_string(),
            message,
        };

        let mut request = self.client.get(url);
        if let Some(token) = &self.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_error(format!(
                "server returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(format!("failed to read body: {}", e)))?;

        // Write beside the destination and rename, so an interrupted
        // download never leaves a truncated file at the final path.
        let staging = destination.with_extension("partial");
        tokio::fs::write(&staging, &bytes)
            .await
            .map_err(|e| download_error(format!("failed to write {}: {}", staging.display(), e)))?;
        tokio::fs::rename(&staging, destination)
            .await
            .map_err(|e| {
                download_error(format!("failed to move into {}: {}", destination.display(), e))
            })?;

        info!(url = %url, path = %destination.display(), bytes = bytes.len(), "Downloaded artifact");
        Ok(())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        debug!(url = %url, "Downloading");

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled { program: format!("download of {}", url) }),
            result = self.fetch(url, destination) => result,
        }
    }
}
