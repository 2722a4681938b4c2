//! Environment handling for config values.
//!
//! Two passes, both driven by a plain `HashMap` so tests never touch the
//! process environment:
//! - `${VAR_NAME}` references inside string values of the config file are
//!   substituted (uppercase `[A-Z_][A-Z0-9_]*` names only).
//! - Well-known variables (`OPENROUTER_API_KEY`, `PORT`, ...) override the
//!   typed config after it is parsed.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

use crate::schema::GroundwaterConfig;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_MODEL: &str = "OPENROUTER_MODEL";
pub const ENV_BASE_URL: &str = "OPENROUTER_BASE_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND: &str = "GROUNDWATER_BIND";
pub const ENV_ENVIRONMENT: &str = "GROUNDWATER_ENV";
pub const ENV_MAX_UPLOAD_MB: &str = "GROUNDWATER_MAX_UPLOAD_MB";
pub const ENV_PROVIDER_TIMEOUT: &str = "GROUNDWATER_PROVIDER_TIMEOUT_SECS";
pub const ENV_RAZORPAY_SECRET: &str = "RAZORPAY_KEY_SECRET";
pub const ENV_LOG_DIR: &str = "GROUNDWATER_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "RUST_LOG";

/// Error returned for a `${VAR}` reference with no value.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Snapshot of the process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Substitute `${VAR}` references in every string leaf of `value`.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing: Option<String> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        match env.get(&caps[1]) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| caps[1].to_string());
                String::new()
            }
        }
    });

    if let Some(var_name) = missing {
        bail!(MissingEnvVarError {
            var_name,
            config_path: path.to_string(),
        });
    }
    Ok(substituted.into_owned())
}

/// Overlay well-known environment variables onto a parsed config.
///
/// Empty values are treated as unset. Numeric variables that fail to parse are
/// reported rather than silently ignored.
pub fn apply_env_overrides(
    mut config: GroundwaterConfig,
    env: &HashMap<String, String>,
) -> Result<GroundwaterConfig> {
    let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(key) = get(ENV_API_KEY) {
        config.provider.api_key = Some(key.to_string());
    }
    if let Some(model) = get(ENV_MODEL) {
        config.provider.model = model.to_string();
    }
    if let Some(url) = get(ENV_BASE_URL) {
        config.provider.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(port) = get(ENV_PORT) {
        config.server.port = parse_var(ENV_PORT, port)?;
    }
    if let Some(bind) = get(ENV_BIND) {
        config.server.bind_address = bind.to_string();
    }
    if let Some(environment) = get(ENV_ENVIRONMENT) {
        config.server.environment = environment.to_string();
    }
    if let Some(mb) = get(ENV_MAX_UPLOAD_MB) {
        config.server.max_upload_mb = parse_var(ENV_MAX_UPLOAD_MB, mb)?;
    }
    if let Some(secs) = get(ENV_PROVIDER_TIMEOUT) {
        config.provider.timeout_secs = parse_var(ENV_PROVIDER_TIMEOUT, secs)?;
    }
    if let Some(secret) = get(ENV_RAZORPAY_SECRET) {
        config.payments.razorpay_key_secret = Some(secret.to_string());
    }
    if let Some(dir) = get(ENV_LOG_DIR) {
        config.logging.dir = Some(dir.to_string());
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = level.to_string();
    }

    Ok(config)
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .with_context(|| format!("{name} must be a number, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = json!({"provider": {"apiKey": "${OPENROUTER_API_KEY}"}});
        let result =
            resolve_env_vars_with(&v, &env(&[("OPENROUTER_API_KEY", "sk-or-abc")])).unwrap();
        assert_eq!(result["provider"]["apiKey"], "sk-or-abc");
    }

    #[test]
    fn error_names_missing_var_and_path() {
        let v = json!({"payments": {"razorpayKeySecret": "${RZP_SECRET}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("RZP_SECRET"));
        assert!(err.contains("payments.razorpayKeySecret"));
    }

    #[test]
    fn overrides_take_precedence_over_file() {
        let mut config = GroundwaterConfig::default();
        config.provider.model = "from-file".into();
        let config = apply_env_overrides(
            config,
            &env(&[
                ("OPENROUTER_API_KEY", "sk-or-env"),
                ("OPENROUTER_MODEL", "anthropic/claude-3.5-sonnet"),
                ("PORT", "5000"),
                ("GROUNDWATER_ENV", "production"),
            ]),
        )
        .unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-or-env"));
        assert_eq!(config.provider.model, "anthropic/claude-3.5-sonnet");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.environment, "production");
    }

    #[test]
    fn empty_values_are_unset() {
        let config =
            apply_env_overrides(GroundwaterConfig::default(), &env(&[("OPENROUTER_API_KEY", "")]))
                .unwrap();
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn bad_port_is_an_error() {
        let result = apply_env_overrides(GroundwaterConfig::default(), &env(&[("PORT", "http")]));
        assert!(result.unwrap_err().to_string().contains("PORT"));
    }
}
