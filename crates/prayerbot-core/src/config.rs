//! prayerbot configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PrayerError, Result};

/// Bounds for the poll loop interval, in seconds.
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;
pub const MAX_POLL_INTERVAL_SECS: u64 = 300;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrayerBotConfig {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl PrayerBotConfig {
    /// Load config from the default path (~/.prayerbot/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PrayerError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PrayerError::Config(format!("Failed to parse config: {e}")))
    }

    /// Let environment variables override secrets from the file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override secrets using `lookup` (SLACK_BOT_TOKEN, SLACK_APP_TOKEN).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("SLACK_BOT_TOKEN").filter(|t| !t.is_empty()) {
            self.slack.bot_token = token;
        }
        if let Some(token) = lookup("SLACK_APP_TOKEN").filter(|t| !t.is_empty()) {
            self.slack.app_token = token;
        }
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the prayerbot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".prayerbot")
    }
}

/// Slack credentials and bot naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`) for the Web API.
    #[serde(default)]
    pub bot_token: String,
    /// App-level token (`xapp-...`) for Socket Mode.
    #[serde(default)]
    pub app_token: String,
    /// Name users type after `@` to reach the bot.
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

fn default_bot_name() -> String { "prayerbot".into() }
fn default_api_base() -> String { "https://slack.com/api".into() }
fn default_reconnect_delay() -> u64 { 5 }

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            app_token: String::new(),
            bot_name: default_bot_name(),
            api_base: default_api_base(),
            reconnect_delay_secs: default_reconnect_delay(),
        }
    }
}

/// Poll loop and schedule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Fixed offset from UTC, in minutes, that `trigger_hour` is expressed in.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Users allowed to run `schedule`, `groups` and `trigger`. Empty allows everyone.
    #[serde(default)]
    pub admin_users: Vec<String>,
}

fn default_poll_interval() -> u64 { 30 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            utc_offset_minutes: 0,
            admin_users: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Poll interval clamped to the supported range.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS),
        )
    }
}

/// Roster database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String { "~/.prayerbot/prayerbot.db".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    /// Database path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PrayerBotConfig::default();
        assert_eq!(config.slack.bot_name, "prayerbot");
        assert_eq!(config.scheduler.poll_interval_secs, 30);
        assert_eq!(config.scheduler.utc_offset_minutes, 0);
        assert!(config.scheduler.admin_users.is_empty());
        assert_eq!(config.store.path, "~/.prayerbot/prayerbot.db");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = PrayerBotConfig::from_toml(
            r#"
            [slack]
            bot_token = "xoxb-test"

            [scheduler]
            poll_interval_secs = 60
            admin_users = ["U1"]
            "#,
        )
        .unwrap();
        assert_eq!(config.slack.bot_token, "xoxb-test");
        assert_eq!(config.slack.bot_name, "prayerbot");
        assert_eq!(config.scheduler.poll_interval_secs, 60);
        assert_eq!(config.scheduler.admin_users, vec!["U1".to_string()]);
        assert_eq!(config.store.path, "~/.prayerbot/prayerbot.db");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = PrayerBotConfig::from_toml("[slack\nbot_token = ").unwrap_err();
        assert!(matches!(err, PrayerError::Config(_)));
    }

    #[test]
    fn test_poll_interval_is_clamped() {
        let mut scheduler = SchedulerConfig::default();
        scheduler.poll_interval_secs = 0;
        assert_eq!(scheduler.poll_interval(), Duration::from_secs(MIN_POLL_INTERVAL_SECS));
        scheduler.poll_interval_secs = 86_400;
        assert_eq!(scheduler.poll_interval(), Duration::from_secs(MAX_POLL_INTERVAL_SECS));
        scheduler.poll_interval_secs = 45;
        assert_eq!(scheduler.poll_interval(), Duration::from_secs(45));
    }

    #[test]
    fn test_env_overrides_tokens() {
        let mut config = PrayerBotConfig::default();
        config.slack.bot_token = "from-file".into();
        config.apply_overrides(|key| match key {
            "SLACK_BOT_TOKEN" => Some("xoxb-env".into()),
            "SLACK_APP_TOKEN" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.slack.bot_token, "xoxb-env");
        assert!(config.slack.app_token.is_empty());
    }

    #[test]
    fn test_store_path_absolute_unchanged() {
        let store = StoreConfig {
            path: "/var/lib/prayerbot/roster.db".into(),
        };
        assert_eq!(store.resolved_path(), PathBuf::from("/var/lib/prayerbot/roster.db"));
    }
}
