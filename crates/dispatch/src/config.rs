//! Dispatcher configuration from the `[dispatch]` table of `config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 5;

/// How notifications leave the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Write each notification to the tracing log
    #[default]
    Log,
    /// POST each notification as JSON to `webhook_url`
    Webhook,
}

/// Dispatcher configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub transport: TransportKind,

    /// Required when `transport = "webhook"`
    pub webhook_url: Option<String>,

    /// Per-request timeout for the webhook (seconds)
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    dispatch: Option<DispatchConfig>,
}

impl DispatchConfig {
    /// Load the `[dispatch]` table from `<root>/config.toml`.
    ///
    /// A missing file or table yields the log transport. Other tables in the
    /// file belong to the core and are ignored here.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config from {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let config = file.dispatch.unwrap_or_default();
        if config.transport == TransportKind::Webhook && config.webhook_url.is_none() {
            anyhow::bail!("dispatch.webhook_url is required when transport = \"webhook\"");
        }
        Ok(config)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_WEBHOOK_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_table_defaults_to_log() {
        let config = DispatchConfig::parse("[escalation]\nstale_after_days = 5\n").unwrap();
        assert_eq!(config.transport, TransportKind::Log);
        assert_eq!(config.timeout_secs(), 5);
    }

    #[test]
    fn test_webhook_requires_url() {
        let err = DispatchConfig::parse("[dispatch]\ntransport = \"webhook\"\n").unwrap_err();
        assert!(err.to_string().contains("webhook_url"));

        let config = DispatchConfig::parse(
            "[dispatch]\ntransport = \"webhook\"\nwebhook_url = \"http://127.0.0.1:9/hook\"\ntimeout_secs = 2\n",
        )
        .unwrap();
        assert_eq!(config.transport, TransportKind::Webhook);
        assert_eq!(config.timeout_secs(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = DispatchConfig::load(temp.path()).unwrap();
        assert_eq!(config.transport, TransportKind::Log);
    }
}
