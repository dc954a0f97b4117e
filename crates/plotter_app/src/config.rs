//! `csvplot.ron` configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use engine_logging::{engine_info, LogDestination};
use plotter_engine::ClientSettings;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "csvplot.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogTarget {
    File,
    #[default]
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub channel_url: String,
    pub request_connection_id_on_open: bool,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// How long `upload` waits for a connection id before submitting anyway.
    pub connect_grace_secs: u64,
    /// How long `upload` waits for result URLs after processing started.
    pub result_wait_secs: u64,
    pub log_destination: LogTarget,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            api_base_url: client.api_base_url,
            channel_url: client.channel_url,
            request_connection_id_on_open: true,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            connect_grace_secs: 5,
            result_wait_secs: 120,
            log_destination: LogTarget::Terminal,
            log_file: PathBuf::from("csvplot.log"),
        }
    }
}

impl AppConfig {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_base_url: self.api_base_url.clone(),
            channel_url: self.channel_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Loads the config file. A missing file falls back to defaults unless it was
/// named explicitly.
pub fn load(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILENAME), false),
    };
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()));
        }
    };
    let config = parse(&content).with_context(|| format!("invalid config {}", path.display()))?;
    engine_info!("loaded config from {:?}", path);
    Ok(config)
}

fn parse(content: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = ron::from_str(content)?;
    if config.api_base_url.trim().is_empty() {
        bail!("api_base_url must not be empty");
    }
    if config.channel_url.trim().is_empty() {
        bail!("channel_url must not be empty");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = parse(
            r#"(
                channel_url: "wss://ws.example.com/prod/",
                result_wait_secs: 30,
                log_destination: Both,
            )"#,
        )
        .unwrap();

        assert_eq!(config.channel_url, "wss://ws.example.com/prod/");
        assert_eq!(config.result_wait_secs, 30);
        assert_eq!(config.log_destination, LogTarget::Both);
        assert_eq!(config.api_base_url, AppConfig::default().api_base_url);
        assert!(config.request_connection_id_on_open);
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        assert!(parse(r#"(api_base_url: " ")"#).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.ron");

        assert!(load(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("csvplot.ron");
        fs::write(&path, r#"(api_base_url: "https://api.example.com/Prod")"#).unwrap();

        let config = load(Some(&path)).unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com/Prod");
        assert_eq!(
            config.client_settings().request_timeout,
            Duration::from_secs(AppConfig::default().request_timeout_secs)
        );
    }
}
