use anyhow::Result;
use tracing::debug;

use groundwater_config::{config_file_path, load_and_prepare, redact_config, GroundwaterConfig};

/// Load `~/.groundwater/config.yaml` (or `$GROUNDWATER_CONFIG`) and apply env overrides.
pub async fn load(port_override: Option<u16>) -> Result<GroundwaterConfig> {
    let path = config_file_path();
    let mut config = load_and_prepare(&path).await?;
    if let Some(port) = port_override {
        config.server.port = port;
    }
    debug!(path = %path.display(), config = %redact_config(&config), "Loaded configuration");
    Ok(config)
}

/// Base URL a local client should use to reach this server.
pub fn local_base_url(config: &GroundwaterConfig) -> String {
    format!("http://127.0.0.1:{}", config.server.port)
}
