use crate::client::LogClient;
use crate::record::{Level, LogEntry};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets whose events are never relayed: the client's own diagnostics and
/// the HTTP stack underneath it. Relaying them would feed the pipeline with
/// records about shipping records.
pub const DEFAULT_IGNORED_TARGETS: &[&str] = &[
    env!("CARGO_CRATE_NAME"),
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
];

/// `tracing_subscriber` layer that turns events into [`LogEntry`]s and
/// records them on a [`LogClient`].
///
/// The event target becomes the module name, fields other than `message`
/// become the record context, and the source location is kept when the
/// callsite has one. Recording is non-blocking, so the layer adds no
/// network latency to the instrumented code.
#[derive(Clone, Debug)]
pub struct RelayLayer {
    client: LogClient,
    ignored_targets: Vec<String>,
}

impl RelayLayer {
    pub fn new(client: LogClient) -> Self {
        Self {
            client,
            ignored_targets: DEFAULT_IGNORED_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Also skip events whose target starts with `prefix`.
    pub fn ignore_target(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_targets.push(prefix.into());
        self
    }

    pub fn client(&self) -> &LogClient {
        &self.client
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.ignored_targets.iter().any(|prefix| {
            target
                .strip_prefix(prefix.as_str())
                .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
        })
    }
}

impl<S> Layer<S> for RelayLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !self.client.is_enabled() {
            return;
        }
        let meta = event.metadata();
        if self.is_ignored(meta.target()) {
            return;
        }

        let mut fields = Map::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let current = std::thread::current();
        let thread = current
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", current.id()));
        fields.insert("thread".to_string(), Value::String(thread));

        let mut entry = LogEntry::new(Level::from(meta.level()), message.unwrap_or_default())
            .module(meta.target())
            .context(fields);
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            entry = entry.location(file, line);
        }

        self.client.record(entry);
    }
}

/// Collects event fields into a JSON map, pulling `message` out separately.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Map<String, Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN and infinities have no JSON form
        let value = serde_json::Number::from_f64(value).map_or_else(|| Value::String(value.to_string()), Value::Number);
        self.insert(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // format_args! messages arrive here rather than through record_str
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, Value::String(format!("{:?}", value)));
        }
    }
}
