//! Config defaults.

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_ENVIRONMENT: &str = "development";

pub const DEFAULT_MAX_UPLOAD_MB: usize = 25;

/// Largest upload limit the validator accepts.
pub const MAX_UPLOAD_MB: usize = 1024;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Must stay above the client's 45s request timeout.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_MAX_TOKENS: u32 = 2048;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

pub const DEFAULT_LOG_LEVEL: &str = "info";
