//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `thermotwin.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use thermotwin_adapter_mqtt::MqttConfig;
use thermotwin_app::reconciler::FetchFailurePolicy;
use thermotwin_domain::target_state::{Mode, TargetDefaults};
use thermotwin_domain::validation::validate_defaults;

const CONFIG_FILE: &str = "thermotwin.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Target state materialized for devices seen for the first time.
    pub defaults: TargetDefaults,
    /// Device channel settings.
    pub mqtt: MqttConfig,
    /// Metrics exposition.
    pub metrics: MetricsConfig,
    /// Report ingestion.
    pub ingest: IngestConfig,
    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unknown log format {other:?}, expected text or json"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
    /// `text` or `json`.
    pub format: LogFormat,
}

/// Metrics configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    pub enabled: bool,
}

/// Ingestion configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Accept a report when the stored state cannot be read, instead of rejecting it.
    pub accept_on_fetch_failure: bool,
}

/// Shutdown configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds granted to in-flight work before it is abandoned.
    pub grace_period_secs: u64,
}

impl Config {
    /// Load configuration from `thermotwin.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(CONFIG_FILE)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("THERMOTWIN_HOST") {
            self.server.host = val;
        }
        if let Some(val) = var("THERMOTWIN_PORT") {
            self.server.port = parse_value("THERMOTWIN_PORT", &val)?;
        }
        if let Some(val) = var("THERMOTWIN_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("THERMOTWIN_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("THERMOTWIN_LOG_FORMAT") {
            self.logging.format = val.parse()?;
        }
        if let Some(val) = var("THERMOTWIN_DEFAULT_MODE") {
            self.defaults.mode = Mode::from_str(&val)
                .map_err(|err| ConfigError::Validation(err.to_string()))?;
        }
        if let Some(val) = var("THERMOTWIN_DEFAULT_TARGET_TEMPERATURE") {
            self.defaults.target_temperature =
                parse_value("THERMOTWIN_DEFAULT_TARGET_TEMPERATURE", &val)?;
        }
        if let Some(val) = var("THERMOTWIN_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(val) = var("THERMOTWIN_MQTT_PORT") {
            self.mqtt.broker_port = parse_value("THERMOTWIN_MQTT_PORT", &val)?;
        }
        if let Some(val) = var("THERMOTWIN_MQTT_CLIENT_ID") {
            self.mqtt.client_id = val;
        }
        if let Some(val) = var("THERMOTWIN_MQTT_USERNAME") {
            self.mqtt.username = Some(val);
        }
        if let Some(val) = var("THERMOTWIN_MQTT_PASSWORD") {
            self.mqtt.password = Some(val);
        }
        if let Some(val) = var("THERMOTWIN_METRICS_ENABLED") {
            self.metrics.enabled = parse_value("THERMOTWIN_METRICS_ENABLED", &val)?;
        }
        if let Some(val) = var("THERMOTWIN_SHUTDOWN_GRACE_SECS") {
            self.shutdown.grace_period_secs = parse_value("THERMOTWIN_SHUTDOWN_GRACE_SECS", &val)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        validate_defaults(&self.defaults)
            .map_err(|err| ConfigError::Validation(format!("defaults: {err}")))?;
        if self.mqtt.qos > 2 {
            return Err(ConfigError::Validation(format!(
                "mqtt qos must be 0, 1 or 2, got {}",
                self.mqtt.qos
            )));
        }
        if self.mqtt.inbound_topics.is_empty() {
            return Err(ConfigError::Validation(
                "at least one mqtt inbound topic is required".to_string(),
            ));
        }
        if self.mqtt.inbound_topics.iter().any(|topic| topic.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "mqtt inbound topics must not be empty".to_string(),
            ));
        }
        if self.mqtt.outbound_topic.trim().is_empty() {
            return Err(ConfigError::Validation(
                "mqtt outbound topic must not be empty".to_string(),
            ));
        }
        if self.mqtt.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "mqtt channel capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Policy applied when the stored report cannot be read during ingestion.
    #[must_use]
    pub fn fetch_failure_policy(&self) -> FetchFailurePolicy {
        if self.ingest.accept_on_fetch_failure {
            FetchFailurePolicy::Accept
        } else {
            FetchFailurePolicy::Reject
        }
    }

    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown.grace_period_secs)
    }
}

fn parse_value<T: FromStr>(key: &str, val: &str) -> Result<T, ConfigError> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key} has an invalid value: {val:?}")))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:thermotwin.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "thermotwind=info,thermotwin=info,tower_http=debug".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 5,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
