//! Configuration for the `flowctl` command-line client.

use std::path::Path;

use flowctl_core::{ClientOptions, ListenerConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowctlConfig {
    /// Service address and timeouts.
    pub network: ClientOptions,
    /// Push listener sizing.
    pub listener: ListenerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive, e.g. "info" or "flowctl_core=debug".
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl FlowctlConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::debug!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `--host` / `--port` overrides.
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.network.host = host;
        }
        if let Some(port) = port {
            self.network.port = port;
        }
        self
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&FlowctlConfig::default()).unwrap();
        assert!(text.contains("[network]"));
        assert!(text.contains("reply_timeout_secs"));
        assert!(text.contains("transport = \"zmq\""));
        assert!(text.contains("[listener]"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = FlowctlConfig::parse(
            r#"
            [network]
            host = "10.20.0.5"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.network.host, "10.20.0.5");
        assert_eq!(cfg.network.port, 5555);
        assert_eq!(cfg.listener.workers, 4);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = FlowctlConfig::load(Path::new("/nonexistent/flowctl.toml"));
        assert_eq!(cfg.network.endpoint().to_string(), "tcp://127.0.0.1:5555");
    }

    #[test]
    fn cli_overrides_win() {
        let cfg = FlowctlConfig::default().with_overrides(Some("svc.local".into()), Some(6000));
        assert_eq!(cfg.network.endpoint().to_string(), "tcp://svc.local:6000");
    }
}
