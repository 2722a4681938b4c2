//! Config validation with field paths in every message.

use crate::defaults::MAX_UPLOAD_MB;
use crate::schema::GroundwaterConfig;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &GroundwaterConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.server.port == 0 {
        report.error("server.port", "Port must be non-zero");
    }
    if config.server.max_upload_mb == 0 {
        report.error("server.maxUploadMb", "Upload limit must be at least 1 MB");
    } else if config.server.max_upload_mb > MAX_UPLOAD_MB {
        report.error(
            "server.maxUploadMb",
            format!("Upload limit must not exceed {MAX_UPLOAD_MB} MB"),
        );
    }
    if config.provider.timeout_secs == 0 {
        report.error("provider.timeoutSecs", "Provider timeout must be at least 1 second");
    }
    if !config.provider.base_url.starts_with("http://")
        && !config.provider.base_url.starts_with("https://")
    {
        report.error("provider.baseUrl", "Base URL must start with http:// or https://");
    }
    if config.provider.model.trim().is_empty() {
        report.error("provider.model", "Model name must not be empty");
    }
    if !(0.0..=2.0).contains(&config.provider.temperature) {
        report.warn("provider.temperature", "Temperature outside 0.0..=2.0");
    }
    if config.provider.api_key.is_none() {
        report.warn(
            "provider.apiKey",
            "No OpenRouter API key configured; survey analysis will fail with 500",
        );
    }
    if config.payments.razorpay_key_secret.is_none() {
        report.warn(
            "payments.razorpayKeySecret",
            "No Razorpay key secret; payments are approved without signature verification",
        );
    }

    report
}
