//! Upload client for `groundwater analyze`.
//!
//! Every local check (file type, size) runs before any network call.

use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use groundwater_core::{detect_mime_type, AccessSnapshot, SurveyFileKind, MAX_UPLOAD_BYTES};

use crate::progress::CancellationPolicy;

/// Extracted PDF text shorter than this is treated as no text layer.
pub const MIN_EXTRACTED_TEXT_CHARS: usize = 50;

const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Unsupported file type ({0}). Please upload an image or a PDF.")]
    UnsupportedFileType(String),

    #[error("File is too large ({size_mb:.1}MB). Maximum size is {limit_mb}MB.")]
    FileTooLarge { size_mb: f64, limit_mb: usize },

    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("The analysis request timed out after {0}s. Please check your connection and try again.")]
    Timeout(u64),

    #[error("Could not reach the analysis server ({0}). Please try again.")]
    Network(String),

    #[error("Analysis failed ({status}): {message}")]
    Server {
        status: u16,
        message: String,
        raw_response: Option<String>,
    },

    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),

    #[error("Invalid server URL {0}")]
    InvalidUrl(String),

    #[error("Could not prepare the upload: {0}")]
    InvalidUpload(String),
}

impl ClientError {
    /// Failures worth simply trying again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Timeout(_) | ClientError::Network(_))
    }
}

/// A survey file read from disk and ready to upload.
#[derive(Debug, Clone)]
pub struct SurveyFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub extracted_text: Option<String>,
}

impl SurveyFile {
    /// Check the type by extension and the size from metadata.
    pub fn check(path: &Path, size_bytes: u64) -> Result<SurveyFileKind, ClientError> {
        let mime = detect_mime_type(path);
        let kind = SurveyFileKind::from_mime(mime)
            .ok_or_else(|| ClientError::UnsupportedFileType(mime.to_string()))?;
        if size_bytes > MAX_UPLOAD_BYTES as u64 {
            return Err(ClientError::FileTooLarge {
                size_mb: size_bytes as f64 / BYTES_PER_MB as f64,
                limit_mb: MAX_UPLOAD_BYTES / BYTES_PER_MB,
            });
        }
        Ok(kind)
    }

    pub async fn load(path: &Path) -> Result<Self, ClientError> {
        let read_err = |source| ClientError::Read {
            path: path.to_path_buf(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(read_err)?.len();
        let kind = Self::check(path, size)?;
        let data = tokio::fs::read(path).await.map_err(read_err)?;

        let extracted_text = match kind {
            SurveyFileKind::Pdf => extract_pdf_text(data.clone()).await,
            SurveyFileKind::Image => None,
        };

        Ok(Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "survey".to_string()),
            mime_type: detect_mime_type(path).to_string(),
            data,
            extracted_text,
        })
    }
}

/// Trimmed text if it is long enough to be worth sending.
pub fn usable_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (trimmed.chars().count() > MIN_EXTRACTED_TEXT_CHARS).then(|| trimmed.to_string())
}

/// Best-effort text layer extraction. Failures (including panics inside the
/// PDF parser) are logged and yield `None`.
pub async fn extract_pdf_text(data: Vec<u8>) -> Option<String> {
    let outcome = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data)).await;
    match outcome {
        Ok(Ok(text)) => {
            let usable = usable_text(&text);
            debug!(chars = text.len(), usable = usable.is_some(), "Extracted PDF text");
            usable
        }
        Ok(Err(e)) => {
            warn!(error = %e, "PDF text extraction failed; sending file only");
            None
        }
        Err(e) => {
            warn!(error = %e, "PDF text extraction aborted; sending file only");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    access: AccessSnapshot,
}

/// HTTP client for the analysis API.
pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: String,
    policy: CancellationPolicy,
}

impl AnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy: CancellationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CancellationPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn transport_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(self.policy.request_timeout.as_secs())
        } else {
            ClientError::Network(e.to_string())
        }
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let invalid = || ClientError::InvalidUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Advisory quota lookup. The server enforces the quota on its own.
    pub async fn check_access(&self, user_id: &str) -> Result<AccessSnapshot, ClientError> {
        let url = self.endpoint(&["api", "check-access", user_id])?;
        let response = self
            .policy
            .apply(self.http.get(url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(server_error(status.as_u16(), &body));
        }
        serde_json::from_value::<AccessResponse>(body)
            .map(|r| r.access)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Upload one survey file and return the model's analysis JSON.
    pub async fn analyze(&self, file: &SurveyFile, user_id: Option<&str>) -> Result<Value, ClientError> {
        let part = Part::bytes(file.data.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| ClientError::InvalidUpload(e.to_string()))?;
        let url = self.endpoint(&["api", "analyze-survey"])?;
        let mut form = Form::new().part("surveyFile", part);
        if let Some(user_id) = user_id {
            form = form.text("user_id", user_id.to_string());
        }
        if let Some(text) = &file.extracted_text {
            form = form.text("extractedText", text.clone());
        }

        let response = self
            .policy
            .apply(self.http.post(url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let body: Value = serde_json::from_str(&text).map_err(|_| ClientError::Server {
            status: status.as_u16(),
            message: text.trim().to_string(),
            raw_response: None,
        })?;

        if !status.is_success() || body["success"] != Value::Bool(true) {
            return Err(server_error(status.as_u16(), &body));
        }
        body.get("surveyAnalysis")
            .cloned()
            .ok_or_else(|| ClientError::InvalidResponse("missing surveyAnalysis".into()))
    }
}

fn server_error(status: u16, body: &Value) -> ClientError {
    let message = body["error"]
        .as_str()
        .or_else(|| body["message"].as_str())
        .unwrap_or("unknown error")
        .to_string();
    ClientError::Server {
        status,
        message,
        raw_response: body["rawResponse"].as_str().map(str::to_string),
    }
}
