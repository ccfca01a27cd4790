//! Presigned artifact transfer.
//!
//! Uploads are a single PUT of the whole payload. Downloads stream the
//! response body to disk and report progress whenever the server sends a
//! `content-length`. Presigned URLs are short-lived, so nothing here
//! retries: a stale URL must be re-fetched from the job.

use std::path::Path;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;

use helio_core::config::TransferConfig;
use helio_core::error::HelioError;
use helio_core::naming::redact_query;
use helio_core::progress::{progress_percent, ProgressSink};

/// Characters of a failed transfer's body kept in the error.
const ERROR_BODY_EXCERPT: usize = 300;

/// HTTP client for presigned storage URLs.
///
/// Carries no credentials: presigned URLs authorize themselves.
#[derive(Debug, Clone)]
pub struct ArtifactTransfer {
    http: reqwest::Client,
    config: TransferConfig,
}

impl ArtifactTransfer {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(http: reqwest::Client, config: TransferConfig) -> Self {
        Self { http, config }
    }

    /// PUT `bytes` to a presigned write URL.
    pub async fn upload(&self, url: &str, bytes: Vec<u8>) -> Result<(), HelioError> {
        let size = bytes.len();
        tracing::info!(url = redact_query(url), bytes = size, "Uploading artifact");

        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .timeout(self.config.upload_timeout)
            .body(bytes)
            .send()
            .await
            .map_err(|e| HelioError::Transport {
                operation: "Upload",
                message: format!("Network error: {e}"),
                correlation_id: String::new(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HelioError::UploadFailed {
                status: status.as_u16(),
                body: body_excerpt(response).await,
            });
        }

        tracing::info!(bytes = size, "Upload complete");
        Ok(())
    }

    /// Read a local file in full and PUT it to a presigned write URL.
    pub async fn upload_file(&self, url: &str, path: &Path) -> Result<u64, HelioError> {
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len() as u64;
        self.upload(url, bytes).await?;
        Ok(size)
    }

    /// Stream a URL to `dest`, returning the number of bytes written.
    ///
    /// A 404 is reported as [`HelioError::ArtifactNotFound`]; every other
    /// non-2xx status as [`HelioError::TransferFailed`]. A partially
    /// written file is removed if the stream breaks.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<u64, HelioError> {
        tracing::info!(url = redact_query(url), path = %dest.display(), "Downloading artifact");

        let mut response = self
            .http
            .get(url)
            .timeout(self.config.download_timeout)
            .send()
            .await
            .map_err(|e| HelioError::Transport {
                operation: "Download",
                message: format!("Network error: {e}"),
                correlation_id: String::new(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(HelioError::ArtifactNotFound {
                url: redact_query(url).to_string(),
            });
        }
        if !status.is_success() {
            return Err(HelioError::TransferFailed {
                status: status.as_u16(),
                body: body_excerpt(response).await,
            });
        }

        let total = response.content_length().filter(|t| *t > 0);
        let mut file = tokio::fs::File::create(dest).await?;

        match self.stream_to(&mut response, &mut file, total, progress).await {
            Ok(written) => {
                file.flush().await?;
                tracing::info!(path = %dest.display(), bytes = written, "Download complete");
                Ok(written)
            }
            Err(e) => {
                drop(file);
                if let Err(rm) = tokio::fs::remove_file(dest).await {
                    tracing::warn!(
                        path = %dest.display(),
                        error = %rm,
                        "Failed to remove partial download",
                    );
                }
                Err(e)
            }
        }
    }

    async fn stream_to(
        &self,
        response: &mut reqwest::Response,
        file: &mut tokio::fs::File,
        total: Option<u64>,
        progress: &dyn ProgressSink,
    ) -> Result<u64, HelioError> {
        let chunk_size = self.config.chunk_size.max(1);
        let mut written: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(|e| HelioError::Transport {
            operation: "Download",
            message: format!("Network error: {e}"),
            correlation_id: String::new(),
        })? {
            for piece in chunk.chunks(chunk_size) {
                file.write_all(piece).await?;
                written += piece.len() as u64;
                if let Some(pct) = progress_percent(written, total) {
                    progress.report(pct);
                }
            }
        }

        Ok(written)
    }
}

async fn body_excerpt(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string())
        .chars()
        .take(ERROR_BODY_EXCERPT)
        .collect()
}
