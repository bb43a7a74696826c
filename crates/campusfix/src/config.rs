//! Configuration file loading and parsing.
//!
//! CampusFix supports data-directory configuration through `config.toml`.
//! If no config file exists, the system falls back to defaults matching the
//! campus deployment (3-day staleness window, IST clock, Mess/Academic shared).

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_STALE_AFTER_DAYS: i64 = 3;
/// Ten years
pub const MAX_STALE_AFTER_DAYS: i64 = 3650;
/// +05:30
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
const DEFAULT_RESOLVED_REWARD: f64 = 1.0;
const DEFAULT_DEFECTED_PENALTY: f64 = 0.5;
const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Root configuration structure loaded from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampusConfig {
    /// Priority escalation settings (optional).
    pub escalation: Option<EscalationConfig>,
    /// Student visibility settings (optional).
    pub visibility: Option<VisibilityConfig>,
    /// Trust score deltas (optional).
    pub trust: Option<TrustConfig>,
    /// Notification settings (optional).
    pub notifications: Option<NotificationsConfig>,
    /// REST server settings (optional).
    pub server: Option<ServerConfig>,
}

/// Priority escalation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EscalationConfig {
    /// Age after which an open issue is escalated to High (default: 3).
    pub stale_after_days: Option<i64>,
    /// Offset of the campus local clock from UTC in minutes (default: 330).
    pub utc_offset_minutes: Option<i32>,
}

/// Student visibility settings.
#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityConfig {
    /// Categories every student can see (default: ["Mess", "Academic"]).
    pub shared_categories: Option<Vec<String>>,
}

/// Trust score deltas applied on staff transitions.
#[derive(Debug, Clone, Deserialize)]
pub struct TrustConfig {
    /// Added when staff resolve an issue (default: 1.0).
    pub resolved_reward: Option<f64>,
    /// Subtracted when staff mark an issue defected (default: 0.5).
    pub defected_penalty: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Send owner notifications at all (default: true).
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on (default: "0.0.0.0:3000").
    pub bind: Option<String>,
}

impl CampusConfig {
    /// Load configuration from `<root>/config.toml` if it exists.
    ///
    /// Returns the default config if the file doesn't exist.
    /// Returns an error if the file exists but is malformed.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join("config.toml");

        if !config_path.exists() {
            return Ok(CampusConfig::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: CampusConfig = toml::from_str(content).context("Failed to parse config.toml")?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        let days = self.configured_stale_after_days();
        if !(0..=MAX_STALE_AFTER_DAYS).contains(&days) {
            anyhow::bail!(
                "escalation.stale_after_days must be between 0 and {}, got {}",
                MAX_STALE_AFTER_DAYS,
                days
            );
        }
        // FixedOffset accepts strictly less than a day in either direction
        if self.local_offset_checked().is_none() {
            anyhow::bail!("escalation.utc_offset_minutes is out of range");
        }
        Ok(())
    }

    fn configured_stale_after_days(&self) -> i64 {
        self.escalation
            .as_ref()
            .and_then(|e| e.stale_after_days)
            .unwrap_or(DEFAULT_STALE_AFTER_DAYS)
    }

    /// Staleness window in days, always within `0..=MAX_STALE_AFTER_DAYS`.
    pub fn stale_after_days(&self) -> i64 {
        self.configured_stale_after_days()
            .clamp(0, MAX_STALE_AFTER_DAYS)
    }

    fn local_offset_checked(&self) -> Option<FixedOffset> {
        let minutes = self
            .escalation
            .as_ref()
            .and_then(|e| e.utc_offset_minutes)
            .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES);
        FixedOffset::east_opt(minutes.checked_mul(60)?)
    }

    /// Campus local time zone.
    pub fn local_offset(&self) -> FixedOffset {
        self.local_offset_checked().unwrap_or_else(|| Utc.fix())
    }

    pub fn shared_categories(&self) -> Vec<String> {
        self.visibility
            .as_ref()
            .and_then(|v| v.shared_categories.clone())
            .unwrap_or_else(|| vec!["Mess".to_string(), "Academic".to_string()])
    }

    pub fn resolved_reward(&self) -> f64 {
        self.trust
            .as_ref()
            .and_then(|t| t.resolved_reward)
            .unwrap_or(DEFAULT_RESOLVED_REWARD)
    }

    pub fn defected_penalty(&self) -> f64 {
        self.trust
            .as_ref()
            .and_then(|t| t.defected_penalty)
            .unwrap_or(DEFAULT_DEFECTED_PENALTY)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications
            .as_ref()
            .and_then(|n| n.enabled)
            .unwrap_or(true)
    }

    pub fn bind_address(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = CampusConfig::load(temp.path()).unwrap();

        assert_eq!(config.stale_after_days(), 3);
        assert_eq!(config.local_offset().local_minus_utc(), 330 * 60);
        assert_eq!(config.shared_categories(), vec!["Mess", "Academic"]);
        assert_eq!(config.resolved_reward(), 1.0);
        assert_eq!(config.defected_penalty(), 0.5);
        assert!(config.notifications_enabled());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            r#"
[escalation]
stale_after_days = 5

[visibility]
shared_categories = ["Mess"]

[notifications]
enabled = false
"#,
        )
        .unwrap();

        let config = CampusConfig::load(temp.path()).unwrap();
        assert_eq!(config.stale_after_days(), 5);
        assert_eq!(config.local_offset().local_minus_utc(), 330 * 60);
        assert_eq!(config.shared_categories(), vec!["Mess"]);
        assert!(!config.notifications_enabled());
        assert_eq!(config.resolved_reward(), 1.0);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[escalation\nbroken").unwrap();

        let err = CampusConfig::load(temp.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config.toml"));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert!(CampusConfig::parse("[escalation]\nstale_after_days = -1").is_err());
        assert!(CampusConfig::parse("[escalation]\nstale_after_days = 3650").is_ok());
        let err = CampusConfig::parse("[escalation]\nstale_after_days = 9223372036854775807").unwrap_err();
        assert!(err.to_string().contains("between 0 and 3650"));
        assert!(CampusConfig::parse("[escalation]\nutc_offset_minutes = 1440").is_err());
        assert!(CampusConfig::parse("[escalation]\nutc_offset_minutes = -300").is_ok());
    }

    #[test]
    fn test_escalator_from_unchecked_config_does_not_panic() {
        let config = CampusConfig {
            escalation: Some(EscalationConfig {
                stale_after_days: Some(i64::MAX),
                utc_offset_minutes: None,
            }),
            ..CampusConfig::default()
        };

        assert_eq!(config.stale_after_days(), MAX_STALE_AFTER_DAYS);
        let escalator = crate::escalation::PriorityEscalator::from_config(&config);
        let now = Utc::now();
        assert!(escalator.cutoff(now).with_timezone(&Utc) < now);
    }
}
