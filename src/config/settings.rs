// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration, one section per concern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub server: ServerConfig,
    pub resources: ResourcesConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Wire the lexical sentiment step into the detector
    pub sentiment_enabled: bool,
    /// JSON rule tables replacing the built-in ones
    pub rules_path: Option<PathBuf>,
    /// Server-side budget for one detection before falling back
    pub detect_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sentiment_enabled: true,
            rules_path: None,
            detect_timeout_ms: 250,
        }
    }
}

/// Configuration for the HTTP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8088")
    pub bind_address: String,
    /// Require an API key on every route except /health
    pub auth_enabled: bool,
    /// Valid API keys for authentication
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8088".to_string(),
            auth_enabled: false,
            api_keys: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Country used when a request does not name one
    pub default_country: String,
    /// JSON resource directory replacing the built-in one
    pub resources_path: Option<PathBuf>,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            default_country: "US".to_string(),
            resources_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the detection log
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_dir: home.join(".haven"),
        }
    }
}
