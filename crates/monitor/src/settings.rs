//! Monitor Settings
//!
//! Loaded from an optional TOML file, then overridden by `FAULTMON_*`
//! environment variables (`__` separates sections, e.g.
//! `FAULTMON_POLL__INTERVAL_SECS=10`).

use config::{Config, Environment, File};
use fault_notify::{MessageFormat, SmtpConfig};
use fault_poller::PollerConfig;
use fault_source::cause::THRESHOLD_CROSSED;
use fault_source::QueryFilter;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix
const ENV_PREFIX: &str = "FAULTMON";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Kind of fault source to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON snapshot file
    Replay,
}

/// Fault source settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    pub kind: SourceKind,
    /// Snapshot file for the replay source
    pub path: PathBuf,
    /// Name of the monitored system, used in notification subjects
    pub label: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Replay,
            path: PathBuf::from("faults.json"),
            label: "UCS".to_string(),
        }
    }
}

/// Poll loop settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    /// Seconds between poll cycles
    pub interval_secs: u64,
    /// Fault cause to monitor
    pub cause: String,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            cause: THRESHOLD_CROSSED.to_string(),
        }
    }
}

/// How notifications are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    /// Email through an SMTP relay
    Smtp,
    /// Write to the log only
    Log,
}

/// Notification settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifySettings {
    pub kind: NotifyKind,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub from: String,
    pub to: Option<String>,
    pub timeout_secs: u64,
    /// Management console link added to notifications
    pub console_url: Option<String>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            kind: NotifyKind::Log,
            smtp_host: None,
            smtp_port: 25,
            smtp_user: None,
            smtp_password: None,
            from: "faultmon@localhost".to_string(),
            to: None,
            timeout_secs: 15,
            console_url: None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Maximum level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Metrics settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsSettings {
    /// Prometheus scrape endpoint; disabled when unset
    pub listen: Option<SocketAddr>,
}

/// Complete monitor settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub source: SourceSettings,
    pub poll: PollSettings,
    pub notify: NotifySettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
}

impl Settings {
    /// Load settings from `path` (optional) and the process environment
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: &Path, env: Environment) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env.prefix_separator("_").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the monitor cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.poll.interval_secs == 0 {
            return Err(SettingsError::Invalid("poll.interval_secs must be positive".into()));
        }
        if self.poll.cause.trim().is_empty() {
            return Err(SettingsError::Invalid("poll.cause must not be empty".into()));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(SettingsError::Invalid(format!(
                "unknown logging.level '{}'",
                self.logging.level
            )));
        }
        if self.notify.kind == NotifyKind::Smtp {
            if self.notify.smtp_host.is_none() {
                return Err(SettingsError::Invalid("notify.smtp_host is required for smtp".into()));
            }
            if self.notify.to.is_none() {
                return Err(SettingsError::Invalid("notify.to is required for smtp".into()));
            }
        }
        Ok(())
    }

    /// Poll loop configuration
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(self.poll.interval_secs),
            filter: QueryFilter::cause(self.poll.cause.as_str()),
        }
    }

    /// Notification wording
    pub fn message_format(&self) -> MessageFormat {
        MessageFormat {
            source_label: self.source.label.clone(),
            cause: self.poll.cause.clone(),
            console_url: self.notify.console_url.clone(),
        }
    }

    /// SMTP notifier configuration, when SMTP delivery is configured
    pub fn smtp_config(&self) -> Option<SmtpConfig> {
        let notify = &self.notify;
        match (&notify.smtp_host, &notify.to) {
            (Some(host), Some(to)) if notify.kind == NotifyKind::Smtp => Some(SmtpConfig {
                host: host.clone(),
                port: notify.smtp_port,
                from: notify.from.clone(),
                to: to.clone(),
                username: notify.smtp_user.clone(),
                password: notify.smtp_password.clone(),
                timeout: Duration::from_secs(notify.timeout_secs),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new()))
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let settings =
            Settings::load_with_env(Path::new("/nonexistent/faultmon.toml"), no_env()).unwrap();
        assert_eq!(settings.poll.interval_secs, 30);
        assert_eq!(settings.poll.cause, "threshold-crossed");
        assert_eq!(settings.notify.kind, NotifyKind::Log);
        assert_eq!(settings.source.label, "UCS");
        assert!(settings.metrics.listen.is_none());
    }

    #[test]
    fn test_file_values() {
        let file = toml_file(
            r#"
            [source]
            path = "/var/lib/faultmon/faults.json"

            [poll]
            interval_secs = 60

            [notify]
            kind = "smtp"
            smtp_host = "mail.example.com"
            to = "ops@example.com"
            console_url = "https://10.4.8.20/app/ucsm/index.html"

            [metrics]
            listen = "127.0.0.1:9102"
            "#,
        );
        let settings = Settings::load_with_env(file.path(), no_env()).unwrap();

        assert_eq!(settings.poller_config().interval, Duration::from_secs(60));
        assert_eq!(
            settings.message_format().console_url.as_deref(),
            Some("https://10.4.8.20/app/ucsm/index.html")
        );
        let smtp = settings.smtp_config().unwrap();
        assert_eq!(smtp.host, "mail.example.com");
        assert_eq!(smtp.port, 25);
        assert_eq!(smtp.timeout, Duration::from_secs(15));
        assert_eq!(settings.metrics.listen, Some("127.0.0.1:9102".parse().unwrap()));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = toml_file("[poll]\ninterval_secs = 60\n");
        let env = Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::from([
            ("FAULTMON_POLL__INTERVAL_SECS".to_string(), "5".to_string()),
            ("FAULTMON_SOURCE__LABEL".to_string(), "UCS-LAB".to_string()),
        ])));
        let settings = Settings::load_with_env(file.path(), env).unwrap();

        assert_eq!(settings.poll.interval_secs, 5);
        assert_eq!(settings.source.label, "UCS-LAB");
    }

    #[test]
    fn test_console_url_from_notify_section() {
        let file = toml_file(
            "[notify]\nconsole_url = \"https://ucsm.example/app/ucsm/index.html\"\n",
        );
        let settings = Settings::load_with_env(file.path(), no_env()).unwrap();
        assert_eq!(
            settings.message_format().console_url.as_deref(),
            Some("https://ucsm.example/app/ucsm/index.html")
        );
    }

    #[test]
    fn test_console_url_from_env() {
        let env = Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::from([(
            "FAULTMON_NOTIFY__CONSOLE_URL".to_string(),
            "https://ucsm.example/app/ucsm/index.html".to_string(),
        )])));
        let settings =
            Settings::load_with_env(Path::new("/nonexistent/faultmon.toml"), env).unwrap();
        assert_eq!(
            settings.notify.console_url.as_deref(),
            Some("https://ucsm.example/app/ucsm/index.html")
        );
    }

    #[test]
    fn test_misplaced_key_rejected() {
        let file = toml_file(
            "[source]\nconsole_url = \"https://ucsm.example/app/ucsm/index.html\"\n",
        );
        let err = Settings::load_with_env(file.path(), no_env()).unwrap_err();
        assert!(matches!(err, SettingsError::Load(_)));
    }

    #[test]
    fn test_smtp_requires_host_and_recipient() {
        let file = toml_file("[notify]\nkind = \"smtp\"\n");
        let err = Settings::load_with_env(file.path(), no_env()).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let file = toml_file("[poll]\ninterval_secs = 0\n");
        assert!(Settings::load_with_env(file.path(), no_env()).is_err());
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut settings = Settings::default();
        settings.logging.level = "chatty".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_log_notify_has_no_smtp_config() {
        assert!(Settings::default().smtp_config().is_none());
    }
}
