//! Configuration management for campaign-digest
//!
//! Settings come from environment-style key/value pairs and are validated once
//! at startup. The resulting [`Config`] is immutable and passed explicitly to
//! every component; nothing in the core reads the environment on its own.

pub mod thresholds;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use thresholds::{EngagementPolicy, Thresholds};

/// Default reporting time zone
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

/// Default deadline for each outbound connection attempt
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 30;

/// Delivery channel for a digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// HTML email over SMTP
    Email,
    /// Slack chat message
    Slack,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Slack => "slack",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which settings must be present for the command being run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirements {
    /// Database connection string
    pub database: bool,
    /// SMTP and recipient settings
    pub email: bool,
    /// Slack token and channel
    pub slack: bool,
}

impl Requirements {
    /// Requirements for publishing (or previewing) on the given channels
    pub fn for_channels(channels: &[Channel], database: bool) -> Self {
        Self {
            database,
            email: channels.contains(&Channel::Email),
            slack: channels.contains(&Channel::Slack),
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration (present when required)
    pub database: Option<DatabaseConfig>,

    /// Email configuration (present when required)
    pub email: Option<EmailConfig>,

    /// Slack configuration (present when required)
    pub slack: Option<SlackConfig>,

    /// Alert thresholds
    pub thresholds: Thresholds,

    /// Report configuration
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env(requirements: Requirements) -> Result<Self> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok(), requirements)
    }

    /// Load configuration from an arbitrary key/value lookup.
    ///
    /// Every missing required key and every invalid value is reported in a
    /// single error.
    pub fn from_lookup(
        lookup: &dyn Fn(&str) -> Option<String>,
        requirements: Requirements,
    ) -> Result<Self> {
        let mut settings = Settings::new(lookup);

        let report = ReportConfig::load(&mut settings);

        let database = requirements.database.then(|| DatabaseConfig {
            url: settings
                .optional("SUPABASE_DB_URL")
                .or_else(|| settings.optional("DATABASE_URL"))
                .unwrap_or_else(|| {
                    settings.missing.push("SUPABASE_DB_URL");
                    String::new()
                }),
            connect_timeout: report.network_timeout,
        });

        let email = if requirements.email {
            Some(EmailConfig::load(&mut settings, report.network_timeout))
        } else {
            None
        };

        let slack = requirements.slack.then(|| SlackConfig {
            token: settings.required("SLACK_BOT_TOKEN"),
            channel_id: settings.required("SLACK_CHANNEL_ID"),
            api_url: settings
                .optional("SLACK_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| SlackConfig::DEFAULT_API_URL.to_string()),
        });

        let thresholds = match Thresholds::from_lookup(lookup) {
            Ok(thresholds) => Some(thresholds),
            Err(Error::Config(problem)) => {
                settings.invalid.push(problem);
                None
            }
            Err(e) => return Err(e),
        };

        let mut problems = Vec::new();
        if !settings.missing.is_empty() {
            problems.push(format!(
                "missing required settings: {}",
                settings.missing.join(", ")
            ));
        }
        problems.append(&mut settings.invalid);

        let Some(thresholds) = thresholds.filter(|_| problems.is_empty()) else {
            return Err(Error::config(problems.join("; ")));
        };

        Ok(Self {
            database,
            email,
            slack,
            thresholds,
            report,
        })
    }

    /// Database settings, or a configuration error if they were not loaded
    pub fn database(&self) -> Result<&DatabaseConfig> {
        self.database
            .as_ref()
            .ok_or_else(|| Error::config("database settings were not loaded"))
    }

    /// Email settings, or a configuration error if they were not loaded
    pub fn email(&self) -> Result<&EmailConfig> {
        self.email
            .as_ref()
            .ok_or_else(|| Error::config("email settings were not loaded"))
    }

    /// Slack settings, or a configuration error if they were not loaded
    pub fn slack(&self) -> Result<&SlackConfig> {
        self.slack
            .as_ref()
            .ok_or_else(|| Error::config("slack settings were not loaded"))
    }
}

/// Lookup wrapper that records absent required keys and invalid values
struct Settings<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
    missing: Vec<&'static str>,
    invalid: Vec<String>,
}

impl<'a> Settings<'a> {
    fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
            invalid: Vec::new(),
        }
    }

    /// Trimmed value; blank counts as absent
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, key: &'static str) -> String {
        self.optional(key).unwrap_or_else(|| {
            self.missing.push(key);
            String::new()
        })
    }

    /// Parsed value or `default`; an unparseable value is recorded
    fn parsed<T: FromStr>(&mut self, key: &str, default: T) -> T
    where
        T::Err: fmt::Display,
    {
        let Some(raw) = self.optional(key) else {
            return default;
        };
        raw.parse().unwrap_or_else(|e| {
            self.invalid.push(format!("{key}='{raw}' is invalid: {e}"));
            default
        })
    }
}

/// Split a comma-separated address list, dropping blank entries
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string
    pub url: String,
    /// Deadline for establishing the connection
    pub connect_timeout: Duration,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// SMTP and recipient configuration
#[derive(Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub from_name: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    /// Deadline for each connection attempt
    pub timeout: Duration,
}

impl EmailConfig {
    pub const DEFAULT_PORT: u16 = 587;
    pub const DEFAULT_FROM_NAME: &'static str = "Campaign Updates";

    fn load(settings: &mut Settings<'_>, timeout: Duration) -> Self {
        let host = settings.required("EMAIL_SMTP_HOST");
        let username = settings.required("EMAIL_USERNAME");
        let password = settings.required("EMAIL_PASSWORD");
        let from_address = settings.required("EMAIL_FROM");

        let to = parse_recipients(&settings.optional("EMAIL_TO").unwrap_or_default());
        if to.is_empty() {
            settings.missing.push("EMAIL_TO");
        }
        let cc = parse_recipients(&settings.optional("EMAIL_CC").unwrap_or_default());

        Self {
            host,
            port: settings.parsed("EMAIL_SMTP_PORT", Self::DEFAULT_PORT),
            username,
            password,
            from_address,
            from_name: settings
                .optional("EMAIL_FROM_NAME")
                .unwrap_or_else(|| Self::DEFAULT_FROM_NAME.to_string()),
            to,
            cc,
            timeout,
        }
    }

    /// All envelope recipients (To followed by Cc)
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to.iter().chain(self.cc.iter()).map(String::as_str)
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("to", &self.to)
            .field("cc", &self.cc)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Slack configuration
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot token sent as a bearer credential
    pub token: String,
    /// Target channel id
    pub channel_id: String,
    /// Web API base URL without a trailing slash
    pub api_url: String,
}

impl SlackConfig {
    pub const DEFAULT_API_URL: &'static str = "https://slack.com/api";
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Report configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Zone whose calendar defines the business date
    pub timezone: Tz,
    /// Deadline applied to every outbound connection
    pub network_timeout: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            network_timeout: Duration::from_secs(DEFAULT_NETWORK_TIMEOUT_SECS),
        }
    }
}

impl ReportConfig {
    fn load(settings: &mut Settings<'_>) -> Self {
        let timezone = settings.parsed::<Tz>("REPORT_TIMEZONE", DEFAULT_TIMEZONE);

        let mut secs = settings.parsed("NETWORK_TIMEOUT_SECS", DEFAULT_NETWORK_TIMEOUT_SECS);
        if secs == 0 {
            settings
                .invalid
                .push("NETWORK_TIMEOUT_SECS must be greater than zero".to_string());
            secs = DEFAULT_NETWORK_TIMEOUT_SECS;
        }

        Self {
            timezone,
            network_timeout: Duration::from_secs(secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const EMAIL_ENV: &[(&str, &str)] = &[
        ("SUPABASE_DB_URL", "postgres://u:p@db.example.com/postgres"),
        ("EMAIL_SMTP_HOST", "smtp.example.com"),
        ("EMAIL_USERNAME", "mailer"),
        ("EMAIL_PASSWORD", "hunter2"),
        ("EMAIL_FROM", "alerts@example.com"),
        ("EMAIL_TO", " ops@example.com, ,sales@example.com ,"),
        ("EMAIL_CC", "boss@example.com"),
    ];

    #[test]
    fn test_parse_recipients() {
        assert_eq!(
            parse_recipients(" a@x.com, ,b@x.com ,,"),
            vec!["a@x.com".to_string(), "b@x.com".to_string()]
        );
        assert!(parse_recipients("  , ").is_empty());
    }

    #[test]
    fn test_email_config_loads() {
        let config = Config::from_lookup(
            &lookup_from(EMAIL_ENV),
            Requirements::for_channels(&[Channel::Email], true),
        )
        .unwrap();

        let email = config.email().unwrap();
        assert_eq!(email.port, 587);
        assert_eq!(email.from_name, "Campaign Updates");
        assert_eq!(email.to, vec!["ops@example.com", "sales@example.com"]);
        assert_eq!(
            email.recipients().collect::<Vec<_>>(),
            vec!["ops@example.com", "sales@example.com", "boss@example.com"]
        );
        assert_eq!(email.timeout, Duration::from_secs(30));
        assert!(config.slack.is_none());
        assert_eq!(config.report.timezone, chrono_tz::Asia::Kolkata);
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn test_missing_settings_are_reported_together() {
        let err = Config::from_lookup(
            &lookup_from(&[("EMAIL_TO", " , ")]),
            Requirements::for_channels(&[Channel::Email, Channel::Slack], true),
        )
        .unwrap_err();

        let message = err.to_string();
        for key in [
            "SUPABASE_DB_URL",
            "EMAIL_SMTP_HOST",
            "EMAIL_USERNAME",
            "EMAIL_PASSWORD",
            "EMAIL_FROM",
            "EMAIL_TO",
            "SLACK_BOT_TOKEN",
            "SLACK_CHANNEL_ID",
        ] {
            assert!(message.contains(key), "{key} not reported in: {message}");
        }
    }

    #[test]
    fn test_database_url_fallback() {
        let config = Config::from_lookup(
            &lookup_from(&[("DATABASE_URL", "postgres://localhost/app")]),
            Requirements::for_channels(&[], true),
        )
        .unwrap();

        assert_eq!(config.database().unwrap().url, "postgres://localhost/app");
    }

    #[test]
    fn test_slack_config_trims_api_url() {
        let config = Config::from_lookup(
            &lookup_from(&[
                ("SLACK_BOT_TOKEN", "xoxb-123"),
                ("SLACK_CHANNEL_ID", "C0123"),
                ("SLACK_API_URL", "http://localhost:9999/api/"),
            ]),
            Requirements::for_channels(&[Channel::Slack], false),
        )
        .unwrap();

        let slack = config.slack().unwrap();
        assert_eq!(slack.api_url, "http://localhost:9999/api");
        assert!(config.database.is_none());
        assert!(!format!("{slack:?}").contains("xoxb"));
    }

    #[test]
    fn test_invalid_port_and_timezone_are_errors() {
        let mut env = EMAIL_ENV.to_vec();
        env.push(("EMAIL_SMTP_PORT", "smtp"));
        let err = Config::from_lookup(
            &lookup_from(&env),
            Requirements::for_channels(&[Channel::Email], true),
        )
        .unwrap_err();
        assert!(err.to_string().contains("EMAIL_SMTP_PORT"));

        let err = Config::from_lookup(
            &lookup_from(&[("REPORT_TIMEZONE", "Mars/Olympus")]),
            Requirements::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_values_are_reported_with_missing_keys() {
        let err = Config::from_lookup(
            &lookup_from(&[
                ("EMAIL_SMTP_PORT", "smtp"),
                ("NETWORK_TIMEOUT_SECS", "0"),
                ("LOW_ENGAGEMENT_POLICY", "both"),
            ]),
            Requirements::for_channels(&[Channel::Email, Channel::Slack], false),
        )
        .unwrap_err();

        let message = err.to_string();
        for fragment in [
            "EMAIL_TO",
            "SLACK_BOT_TOKEN",
            "SLACK_CHANNEL_ID",
            "EMAIL_SMTP_PORT='smtp' is invalid",
            "NETWORK_TIMEOUT_SECS must be greater than zero",
            "LOW_ENGAGEMENT_POLICY",
        ] {
            assert!(message.contains(fragment), "{fragment} not reported in: {message}");
        }
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_password_is_redacted() {
        let config = Config::from_lookup(
            &lookup_from(EMAIL_ENV),
            Requirements::for_channels(&[Channel::Email], true),
        )
        .unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("u:p@db"));
    }
}
