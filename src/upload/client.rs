/// HTTP client for the species identification endpoint
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::scratch::ScratchCopy;
use crate::config::Config;
use crate::state::data::IdentificationResult;

/// Multipart field carrying the photo
const IMAGE_FIELD: &str = "image";
const IMAGE_FILENAME: &str = "photo.jpg";
const IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload superseded by a newer capture")]
    Cancelled,
    #[error("scratch copy failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint answered {0}")]
    Status(StatusCode),
    #[error("malformed identification response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client bound to one endpoint and one scratch directory
///
/// Clone is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct SpeciesClient {
    http: reqwest::Client,
    endpoint: String,
    scratch_dir: PathBuf,
}

impl SpeciesClient {
    pub fn new(config: &Config) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            endpoint: config.identify_url(),
            scratch_dir: config.scratch_dir.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload the photo at `photo` and decode the identification
    ///
    /// Returns `UploadError::Cancelled` as soon as `token` fires, dropping
    /// the request. The scratch copy is gone by the time this returns.
    pub async fn identify(
        &self,
        photo: &Path,
        token: &CancellationToken,
    ) -> Result<IdentificationResult, UploadError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(UploadError::Cancelled),
            result = self.attempt(photo) => result,
        }
    }

    /// One upload from a fresh scratch copy
    async fn attempt(&self, photo: &Path) -> Result<IdentificationResult, UploadError> {
        let scratch = ScratchCopy::create(&self.scratch_dir, photo).await?;
        self.post(&scratch).await
    }

    async fn post(&self, scratch: &ScratchCopy) -> Result<IdentificationResult, UploadError> {
        let bytes = scratch.read().await?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(IMAGE_FILENAME)
            .mime_str(IMAGE_MIME)?;
        let form = Form::new().part(IMAGE_FIELD, part);

        tracing::info!(
            "📤 Uploading {} ({} KB) to {}",
            scratch.path().display(),
            size / 1024,
            self.endpoint
        );

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status));
        }

        let body = response.bytes().await?;
        let result: IdentificationResult = serde_json::from_slice(&body)?;

        tracing::info!(
            "🔎 Identified {} ({})",
            result.common_name,
            result.scientific_name
        );
        Ok(result)
    }
}
