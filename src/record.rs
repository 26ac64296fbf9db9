use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Module name used when the producer does not set one.
pub const DEFAULT_MODULE: &str = "default";

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    #[default]
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "critical" => Ok(Level::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        if *level == tracing::Level::ERROR {
            Level::Error
        } else if *level == tracing::Level::WARN {
            Level::Warn
        } else if *level == tracing::Level::INFO {
            Level::Info
        } else {
            Level::Debug
        }
    }
}

/// A log record as it travels through the queue and onto the wire.
///
/// Records are immutable once built by the client; the application id is
/// shared with every other record of the same client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    #[serde(rename = "ts", serialize_with = "serialize_epoch_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(serialize_with = "serialize_arc_str")]
    pub application_id: Arc<str>,
    pub module_name: String,
    pub level: Level,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_opt_arc_str")]
    pub service_name: Option<Arc<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_no: Option<u32>,
}

impl LogRecord {
    /// Seconds since the Unix epoch with microsecond precision.
    pub fn epoch_seconds(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }
}

fn serialize_epoch_seconds<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(ts.timestamp_micros() as f64 / 1_000_000.0)
}

fn serialize_arc_str<S: Serializer>(value: &Arc<str>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value)
}

fn serialize_opt_arc_str<S: Serializer>(value: &Option<Arc<str>>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => s.serialize_str(v),
        None => s.serialize_none(),
    }
}

/// What a producer hands to [`LogClient::record`](crate::client::LogClient::record).
///
/// The client stamps it with the timestamp, application id and service name
/// when it is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
    pub module_name: Option<String>,
    pub context: Option<Map<String, Value>>,
    pub file_path: Option<String>,
    pub line_no: Option<u32>,
}

impl LogEntry {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            module_name: None,
            context: None,
            file_path: None,
            line_no: None,
        }
    }

    pub fn module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    pub fn location(mut self, file_path: impl Into<String>, line_no: u32) -> Self {
        self.file_path = Some(file_path.into());
        self.line_no = Some(line_no);
        self
    }

    /// Attach one context field.
    ///
    /// A value that cannot be represented as JSON is dropped with a warning;
    /// the entry itself is still usable.
    pub fn field<T: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &T) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.context.get_or_insert_with(Map::new).insert(key, value);
            }
            Err(e) => {
                tracing::warn!(field = %key, error = %e, "dropping unserializable context field");
            }
        }
        self
    }

    pub fn context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub(crate) fn into_record(
        self,
        application_id: &Arc<str>,
        service_name: Option<&Arc<str>>,
    ) -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            application_id: Arc::clone(application_id),
            module_name: self
                .module_name
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODULE.to_string()),
            level: self.level,
            message: self.message,
            context: self.context.filter(|c| !c.is_empty()),
            service_name: service_name.cloned(),
            file_path: self.file_path,
            line_no: self.line_no,
        }
    }
}
