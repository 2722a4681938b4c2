//! CLI Status Command
//!
//! Asks a running server for `/api/health` and prints the answer.

use anyhow::Result;
use serde_json::Value;

use crate::terminal_output::{note_error, note_success};

pub async fn run(base_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    match client.get(format!("{base_url}/api/health")).send().await {
        Ok(resp) => {
            let body: Value = resp.json().await?;
            note_success(&format!("Groundwater API is up at {base_url}"));
            println!("  Environment   : {}", body["environment"].as_str().unwrap_or("-"));
            println!("  Model         : {}", body["model"].as_str().unwrap_or("-"));
            println!(
                "  API key       : {}",
                if body["apiKeyConfigured"].as_bool().unwrap_or(false) {
                    "configured"
                } else {
                    "missing"
                }
            );
            println!("  Uptime        : {}s", body["uptimeSeconds"].as_u64().unwrap_or(0));
            println!("  Version       : {}", body["version"].as_str().unwrap_or("-"));
        }
        Err(_) => {
            note_error(&format!("Groundwater API is not running at {base_url}"));
        }
    }
    Ok(())
}
