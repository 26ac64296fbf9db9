use crate::error::ConfigError;
use crate::record::Level;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Environment variable names recognised by [`ConfigOverrides::from_env`].
pub const LOG_RELAY_ENABLED_ENV: &str = "LOG_RELAY_ENABLED";
pub const LOG_RELAY_APPLICATION_ID_ENV: &str = "LOG_RELAY_APPLICATION_ID";
pub const LOG_RELAY_SERVICE_NAME_ENV: &str = "LOG_RELAY_SERVICE_NAME";
pub const LOG_RELAY_DAEMON_URL_ENV: &str = "LOG_RELAY_DAEMON_URL";
pub const LOG_RELAY_MIN_LEVEL_ENV: &str = "LOG_RELAY_MIN_LEVEL";
pub const LOG_RELAY_MAX_BUFFER_SIZE_ENV: &str = "LOG_RELAY_MAX_BUFFER_SIZE";
pub const LOG_RELAY_BATCH_SIZE_ENV: &str = "LOG_RELAY_BATCH_SIZE";
pub const LOG_RELAY_FLUSH_INTERVAL_MS_ENV: &str = "LOG_RELAY_FLUSH_INTERVAL_MS";
pub const LOG_RELAY_HTTP_TIMEOUT_MS_ENV: &str = "LOG_RELAY_HTTP_TIMEOUT_MS";
pub const LOG_RELAY_MAX_RETRIES_ENV: &str = "LOG_RELAY_MAX_RETRIES";
pub const LOG_RELAY_RETRY_BACKOFF_MS_ENV: &str = "LOG_RELAY_RETRY_BACKOFF_MS";
pub const LOG_RELAY_CIRCUIT_RESET_MS_ENV: &str = "LOG_RELAY_CIRCUIT_RESET_MS";
pub const LOG_RELAY_SHUTDOWN_TIMEOUT_MS_ENV: &str = "LOG_RELAY_SHUTDOWN_TIMEOUT_MS";

/// Where [`ClientConfig::from_env`] looks for a stored config file.
pub const DEFAULT_STORED_CONFIG_PATH: &str = ".log-relay/config.json";

pub const DEFAULT_DAEMON_URL: &str = "http://localhost:8001/logs/ingest";
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(100);
pub const MIN_HTTP_TIMEOUT: Duration = Duration::from_millis(10);
pub const MIN_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

/// Fully resolved client settings.
///
/// Build one with [`ClientConfig::new`] and struct update syntax, or resolve
/// one from overrides, environment and a stored file with
/// [`ClientConfig::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// When `false` the client accepts no records and performs no I/O.
    pub enabled: bool,
    pub application_id: String,
    pub service_name: Option<String>,
    /// Collector URL; `/logs/ingest` is appended when missing.
    pub daemon_url: String,
    /// Records below this level are discarded before queueing.
    pub min_level: Level,
    /// Queue capacity, `0` for unbounded.
    pub max_buffer_size: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    /// Timeout applied to each individual send attempt.
    pub http_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub circuit_reset_interval: Duration,
    /// Upper bound on the final flush when the client shuts down.
    pub shutdown_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            application_id: String::new(),
            service_name: None,
            daemon_url: DEFAULT_DAEMON_URL.to_string(),
            min_level: Level::Debug,
            max_buffer_size: crate::queue::DEFAULT_MAX_BUFFER_SIZE,
            batch_size: 50,
            flush_interval: Duration::from_millis(1000),
            http_timeout: Duration::from_millis(1000),
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
            circuit_reset_interval: Duration::from_millis(30_000),
            shutdown_timeout: Duration::from_millis(2000),
        }
    }
}

impl ClientConfig {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            ..Self::default()
        }
    }

    /// Resolve from the process environment and the stored config file at
    /// [`DEFAULT_STORED_CONFIG_PATH`], with no explicit overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(
            ConfigOverrides::default(),
            ConfigOverrides::from_env(),
            ConfigOverrides::from_json_file(DEFAULT_STORED_CONFIG_PATH)?,
        )
    }

    /// Merge the layers (explicit > environment > stored > default) and validate.
    pub fn resolve(
        explicit: ConfigOverrides,
        env: ConfigOverrides,
        stored: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        explicit.or(env).or(stored).apply(Self::default()).validate()
    }

    /// Check required fields and clamp tunables to their minimums.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let trimmed = self.application_id.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingApplicationId);
        }
        self.application_id = trimmed.to_string();
        self.service_name = self.service_name.filter(|s| !s.trim().is_empty());

        validate_daemon_url(&self.daemon_url)?;

        if self.batch_size == 0 {
            tracing::warn!("batch_size 0 raised to 1");
            self.batch_size = 1;
        }
        if self.flush_interval < MIN_FLUSH_INTERVAL {
            tracing::warn!(
                requested = ?self.flush_interval,
                "flush interval raised to {:?}",
                MIN_FLUSH_INTERVAL
            );
            self.flush_interval = MIN_FLUSH_INTERVAL;
        }
        if self.http_timeout < MIN_HTTP_TIMEOUT {
            tracing::warn!(
                requested = ?self.http_timeout,
                "http timeout raised to {:?}",
                MIN_HTTP_TIMEOUT
            );
            self.http_timeout = MIN_HTTP_TIMEOUT;
        }
        if self.shutdown_timeout < MIN_SHUTDOWN_TIMEOUT {
            tracing::warn!(
                requested = ?self.shutdown_timeout,
                "shutdown timeout raised to {:?}",
                MIN_SHUTDOWN_TIMEOUT
            );
            self.shutdown_timeout = MIN_SHUTDOWN_TIMEOUT;
        }

        Ok(self)
    }
}

fn validate_daemon_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDaemonUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) url like http://localhost:8001/logs/ingest"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}

/// One layer of optional settings.
///
/// Also the schema of the stored JSON config, which accepts snake_case or
/// camelCase keys, either at the top level or nested under `"logRelay"`.
/// A field with an unusable value is skipped with a warning, like an
/// unparseable environment variable; only malformed JSON is an error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(deserialize_with = "lenient_enabled")]
    pub enabled: Option<bool>,
    #[serde(alias = "applicationId", deserialize_with = "lenient")]
    pub application_id: Option<String>,
    #[serde(alias = "serviceName", deserialize_with = "lenient")]
    pub service_name: Option<String>,
    #[serde(alias = "daemonUrl", deserialize_with = "lenient")]
    pub daemon_url: Option<String>,
    #[serde(alias = "minLevel", deserialize_with = "lenient")]
    pub min_level: Option<Level>,
    #[serde(alias = "maxBufferSize", deserialize_with = "lenient")]
    pub max_buffer_size: Option<usize>,
    #[serde(alias = "batchSize", deserialize_with = "lenient")]
    pub batch_size: Option<usize>,
    #[serde(alias = "flushIntervalMs", deserialize_with = "lenient")]
    pub flush_interval_ms: Option<u64>,
    #[serde(alias = "httpTimeoutMs", deserialize_with = "lenient")]
    pub http_timeout_ms: Option<u64>,
    #[serde(alias = "maxRetries", deserialize_with = "lenient")]
    pub max_retries: Option<u32>,
    #[serde(alias = "retryBackoffMs", deserialize_with = "lenient")]
    pub retry_backoff_ms: Option<u64>,
    #[serde(alias = "circuitResetIntervalMs", deserialize_with = "lenient")]
    pub circuit_reset_interval_ms: Option<u64>,
    #[serde(alias = "shutdownTimeoutMs", deserialize_with = "lenient")]
    pub shutdown_timeout_ms: Option<u64>,
}

/// Strings go through `FromStr`, so `"50"` and `"warning"` both work.
fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + DeserializeOwned,
{
    let value = serde_json::Value::deserialize(d)?;
    let parsed = match &value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::String(raw) => raw.trim().parse().ok(),
        other => serde_json::from_value(other.clone()).ok(),
    };
    if parsed.is_none() {
        tracing::warn!(%value, "ignoring unusable stored config value");
    }
    Ok(parsed)
}

fn lenient_enabled<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Bool(v) => Ok(Some(v)),
        serde_json::Value::String(raw) => Ok(Some(parse_enabled(&raw))),
        other => {
            tracing::warn!(value = %other, "ignoring unusable stored enabled value");
            Ok(None)
        }
    }
}

impl ConfigOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Values that fail to parse
    /// are ignored with a warning so a lower layer can supply them.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            enabled: var(LOG_RELAY_ENABLED_ENV).map(|v| parse_enabled(&v)),
            application_id: var(LOG_RELAY_APPLICATION_ID_ENV),
            service_name: var(LOG_RELAY_SERVICE_NAME_ENV),
            daemon_url: var(LOG_RELAY_DAEMON_URL_ENV),
            min_level: parse_var(LOG_RELAY_MIN_LEVEL_ENV, var(LOG_RELAY_MIN_LEVEL_ENV)),
            max_buffer_size: parse_var(LOG_RELAY_MAX_BUFFER_SIZE_ENV, var(LOG_RELAY_MAX_BUFFER_SIZE_ENV)),
            batch_size: parse_var(LOG_RELAY_BATCH_SIZE_ENV, var(LOG_RELAY_BATCH_SIZE_ENV)),
            flush_interval_ms: parse_var(LOG_RELAY_FLUSH_INTERVAL_MS_ENV, var(LOG_RELAY_FLUSH_INTERVAL_MS_ENV)),
            http_timeout_ms: parse_var(LOG_RELAY_HTTP_TIMEOUT_MS_ENV, var(LOG_RELAY_HTTP_TIMEOUT_MS_ENV)),
            max_retries: parse_var(LOG_RELAY_MAX_RETRIES_ENV, var(LOG_RELAY_MAX_RETRIES_ENV)),
            retry_backoff_ms: parse_var(LOG_RELAY_RETRY_BACKOFF_MS_ENV, var(LOG_RELAY_RETRY_BACKOFF_MS_ENV)),
            circuit_reset_interval_ms: parse_var(LOG_RELAY_CIRCUIT_RESET_MS_ENV, var(LOG_RELAY_CIRCUIT_RESET_MS_ENV)),
            shutdown_timeout_ms: parse_var(LOG_RELAY_SHUTDOWN_TIMEOUT_MS_ENV, var(LOG_RELAY_SHUTDOWN_TIMEOUT_MS_ENV)),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut value: serde_json::Value = serde_json::from_str(raw)?;
        for key in ["logRelay", "log_relay"] {
            if let Some(nested) = value.get_mut(key).map(serde_json::Value::take) {
                return Ok(serde_json::from_value(nested)?);
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// A missing file yields an empty layer.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::StoredConfigIo {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Field-wise merge: values in `self` win over `lower`.
    pub fn or(self, lower: Self) -> Self {
        Self {
            enabled: self.enabled.or(lower.enabled),
            application_id: self.application_id.or(lower.application_id),
            service_name: self.service_name.or(lower.service_name),
            daemon_url: self.daemon_url.or(lower.daemon_url),
            min_level: self.min_level.or(lower.min_level),
            max_buffer_size: self.max_buffer_size.or(lower.max_buffer_size),
            batch_size: self.batch_size.or(lower.batch_size),
            flush_interval_ms: self.flush_interval_ms.or(lower.flush_interval_ms),
            http_timeout_ms: self.http_timeout_ms.or(lower.http_timeout_ms),
            max_retries: self.max_retries.or(lower.max_retries),
            retry_backoff_ms: self.retry_backoff_ms.or(lower.retry_backoff_ms),
            circuit_reset_interval_ms: self.circuit_reset_interval_ms.or(lower.circuit_reset_interval_ms),
            shutdown_timeout_ms: self.shutdown_timeout_ms.or(lower.shutdown_timeout_ms),
        }
    }

    pub fn apply(self, mut base: ClientConfig) -> ClientConfig {
        let ms = Duration::from_millis;

        if let Some(v) = self.enabled {
            base.enabled = v;
        }
        if let Some(v) = self.application_id {
            base.application_id = v;
        }
        if self.service_name.is_some() {
            base.service_name = self.service_name;
        }
        if let Some(v) = self.daemon_url {
            base.daemon_url = v;
        }
        if let Some(v) = self.min_level {
            base.min_level = v;
        }
        if let Some(v) = self.max_buffer_size {
            base.max_buffer_size = v;
        }
        if let Some(v) = self.batch_size {
            base.batch_size = v;
        }
        if let Some(v) = self.flush_interval_ms {
            base.flush_interval = ms(v);
        }
        if let Some(v) = self.http_timeout_ms {
            base.http_timeout = ms(v);
        }
        if let Some(v) = self.max_retries {
            base.max_retries = v;
        }
        if let Some(v) = self.retry_backoff_ms {
            base.retry_backoff = ms(v);
        }
        if let Some(v) = self.circuit_reset_interval_ms {
            base.circuit_reset_interval = ms(v);
        }
        if let Some(v) = self.shutdown_timeout_ms {
            base.shutdown_timeout = ms(v);
        }
        base
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(variable = key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

/// Unrecognised values disable the client.
fn parse_enabled(raw: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            tracing::warn!(value = other, "unrecognised {} value, disabling", LOG_RELAY_ENABLED_ENV);
            false
        }
    }
}
