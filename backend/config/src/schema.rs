//! Groundwater runtime configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section is optional in
//! the file; missing fields take the values from [`crate::defaults`].

use serde::{Deserialize, Serialize};

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the survey analyzer server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundwaterConfig {
    /// HTTP listener and upload limits
    pub server: ServerConfig,

    /// External AI provider (OpenRouter)
    pub provider: ProviderConfig,

    /// Payment verification
    pub payments: PaymentsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl GroundwaterConfig {
    /// `bind_address:port`, ready for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Deployment label echoed by `/api/health` (e.g. "development", "production").
    pub environment: String,
    /// Largest accepted survey file, in megabytes.
    pub max_upload_mb: usize,
}

impl ServerConfig {
    /// Upload limit in bytes, saturating for limits validation would reject.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: defaults::DEFAULT_BIND_ADDRESS.to_string(),
            port: defaults::DEFAULT_PORT,
            environment: defaults::DEFAULT_ENVIRONMENT.to_string(),
            max_upload_mb: defaults::DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Upper bound on one provider call.
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: defaults::DEFAULT_MODEL.to_string(),
            base_url: defaults::DEFAULT_OPENROUTER_BASE_URL.to_string(),
            timeout_secs: defaults::DEFAULT_PROVIDER_TIMEOUT_SECS,
            max_tokens: defaults::DEFAULT_MAX_TOKENS,
            temperature: defaults::DEFAULT_TEMPERATURE,
        }
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentsConfig {
    /// Razorpay key secret. When unset, payments are approved without verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_key_secret: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the rolling NDJSON log; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}
