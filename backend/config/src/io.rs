//! Config file reading.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the config file path.
/// Priority: `GROUNDWATER_CONFIG` env > `~/.groundwater/config.yaml` > `./.groundwater/config.yaml`
pub fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("GROUNDWATER_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .map(|home| home.join(".groundwater"))
        .unwrap_or_else(|| PathBuf::from(".groundwater"))
        .join(CONFIG_FILE_NAME)
}

/// Read the config file as an untyped JSON tree.
///
/// Returns an empty object if the file doesn't exist; the server runs on
/// defaults and environment variables alone.
pub async fn load_config_value(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Value = if raw.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?
    };

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let value = load_config_value(&dir.path().join("nope.yaml")).await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_reads_yaml_into_json_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(&path, "server:\n  port: 4000\n").await.unwrap();
        let value = load_config_value(&path).await.unwrap();
        assert_eq!(value["server"]["port"], 4000);
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(&path, "server: [unclosed\n").await.unwrap();
        let err = load_config_value(&path).await.unwrap_err().to_string();
        assert!(err.contains("Failed to parse config YAML"));
    }
}
