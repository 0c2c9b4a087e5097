//! Configuration for the hosted collaborators.
//!
//! Lives at `~/.actaplan/config.json`. Carries the row-store endpoint and key
//! plus the text-oracle credential — these are deployment configuration, not
//! constants baked into the source.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration stored in ~/.actaplan/config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the hosted backend (row storage + auth live under it).
    pub store_url: String,
    /// Publishable API key sent with every store/auth request.
    pub store_key: String,
    /// API key for the generative-text service.
    pub oracle_api_key: String,
    #[serde(default = "default_oracle_model")]
    pub oracle_model: String,
}

fn default_oracle_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Get the canonical config file path (~/.actaplan/config.json)
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".actaplan").join("config.json"))
}

/// Load configuration from ~/.actaplan/config.json
pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

/// Load configuration from an explicit path. Useful for testing.
pub(crate) fn load_config_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        return Err(format!(
            "Config file not found at {}. Create it with: {{ \"storeUrl\": \"https://...\", \"storeKey\": \"...\", \"oracleApiKey\": \"...\" }}",
            path.display()
        ));
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Write configuration back to disk, creating ~/.actaplan/ if needed.
pub fn save_config(config: &Config) -> Result<(), String> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))
}
