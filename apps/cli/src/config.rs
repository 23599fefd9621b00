//! Environment-driven configuration.

use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_WS_URL: &str = "ws://localhost:5000/ws";
const DEFAULT_DATA_DIR: &str = ".chipper";

fn env_url(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub ws_url: String,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_url: env_url("CHIPPER_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            ws_url: env_url("CHIPPER_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
            data_dir: std::env::var("CHIPPER_DATA_DIR")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }
}
