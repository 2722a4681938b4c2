//! `groundwater-config` — runtime configuration for the survey analyzer.
//!
//! Provides:
//! - Typed config schema with defaults
//! - Optional YAML file with `${ENV_VAR}` substitution
//! - Environment variable overrides
//! - Redaction for safe logging
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{apply_env_overrides, process_env, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_file_path, load_config_value};
pub use redact::{redact, redact_config};
pub use schema::{GroundwaterConfig, LoggingConfig, PaymentsConfig, ProviderConfig, ServerConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load the config file, substitute env references, apply env overrides, and validate.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<GroundwaterConfig> {
    let value = load_config_value(path).await?;
    prepare(value, &process_env())
}

/// Everything after the file read, driven by an explicit environment.
pub fn prepare(value: Value, env: &HashMap<String, String>) -> Result<GroundwaterConfig> {
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;

    let config: GroundwaterConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    let config = apply_env_overrides(config, env)?;

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!("{} config error(s); first: {}", report.errors.len(), report.errors[0]);
    }

    Ok(config)
}
