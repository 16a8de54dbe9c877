//! Observer configuration.
//!
//! Configuration can be loaded from:
//! - The file named by `BEACON_CONFIG`
//! - `beacon.toml` or `~/.config/beacon/beacon.toml`
//! - Environment variables (`BEACON_URL`, `BEACON_TOKEN`) for unset fields

use anyhow::{Context, Result};
use beacon_transport::WebSocketConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Observer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server WebSocket URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Authentication token sent during the handshake.
    #[serde(default = "default_token")]
    pub token: Option<String>,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Network timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Socket open plus handshake, in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Wait for the join reply, in milliseconds.
    #[serde(default = "default_join_timeout")]
    pub join_ms: u64,
}

/// How observed events are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per event.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_url() -> String {
    std::env::var("BEACON_URL").unwrap_or_else(|_| "ws://127.0.0.1:8080/ws".to_string())
}

fn default_token() -> Option<String> {
    std::env::var("BEACON_TOKEN").ok().filter(|t| !t.is_empty())
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_join_timeout() -> u64 {
    10_000
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: default_token(),
            timeouts: TimeoutConfig::default(),
            output: OutputConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            join_ms: default_join_timeout(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or if
    /// `BEACON_CONFIG` names a file that cannot be read.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("BEACON_CONFIG") {
            return Self::from_file(shellexpand::tilde(&path).as_ref());
        }

        let config_paths = ["beacon.toml", "~/.config/beacon/beacon.toml"];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Transport settings derived from this configuration.
    #[must_use]
    pub fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig {
            url: self.url.clone(),
            token: self.token.clone(),
            connect_timeout: Duration::from_millis(self.timeouts.connect_ms),
            join_timeout: Duration::from_millis(self.timeouts.join_ms),
            ..WebSocketConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timeouts.connect_ms, 10_000);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(!config.metrics.enabled);
        assert_eq!(config.metrics.port, 9090);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            url = "wss://beacon.example.test/ws"
            token = "secret"

            [timeouts]
            join_ms = 2500

            [output]
            format = "json"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.url, "wss://beacon.example.test/ws");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeouts.connect_ms, 10_000);
        assert_eq!(config.timeouts.join_ms, 2500);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_websocket_config() {
        let config: Config = toml::from_str(
            r#"
            url = "ws://10.0.0.5:4000/ws"

            [timeouts]
            connect_ms = 1500
        "#,
        )
        .unwrap();

        let ws = config.websocket_config();
        assert_eq!(ws.url, "ws://10.0.0.5:4000/ws");
        assert_eq!(ws.connect_timeout, Duration::from_millis(1500));
        assert_eq!(ws.join_timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(Config::from_file("/nonexistent/beacon.toml").is_err());
    }
}
