//! Bridge from `tracing` events into the pipeline
//!
//! ```no_run
//! use policylog::{Logger, PolicyLayer};
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let logger = Logger::builder().build().unwrap();
//! let subscriber = tracing_subscriber::registry().with(PolicyLayer::new(logger));
//! tracing::subscriber::set_global_default(subscriber).unwrap();
//!
//! tracing::warn!(target: "auth", user = "u123", "failed login");
//! ```

use crate::level::Level;
use crate::logger::Logger;
use crate::record::CallContext;
use crate::value::{Arg, Args, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const CRATE_TARGET: &str = "policylog";

/// `tracing_subscriber` layer that feeds events through a [`Logger`].
///
/// The event target becomes the category and the `message` field the text.
/// `request_id`, `correlation_id` and `error_code` fields fill the matching
/// record metadata; all other fields become structured fields and go through
/// redaction like any other. Events emitted by this crate are ignored.
#[derive(Debug, Clone)]
pub struct PolicyLayer {
    logger: Logger,
}

impl PolicyLayer {
    /// Wrap a logger.
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// The wrapped logger.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

fn is_own_target(target: &str) -> bool {
    target == CRATE_TARGET
        || target
            .strip_prefix(CRATE_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}

fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::INFO => Level::Info,
        _ => Level::Debug,
    }
}

/// Literal braces in event text must not read as placeholders.
fn escape_template(message: &str) -> String {
    message.replace('{', "{{").replace('}', "}}")
}

impl<S: Subscriber> Layer<S> for PolicyLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_target(metadata.target()) {
            return;
        }

        let level = map_level(metadata.level());
        if !self.logger.is_enabled(metadata.target(), level) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let template = escape_template(visitor.message.as_deref().unwrap_or(""));
        self.logger.log(
            level,
            metadata.target(),
            &template,
            Args::new(),
            &visitor.context,
        );
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    context: CallContext,
}

impl EventVisitor {
    fn record_value(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "request_id" => self.context.request_id = Some(value.to_string()),
            "correlation_id" => self.context.correlation_id = Some(value.to_string()),
            "error_code" => self.context.error_code = Some(value.to_string()),
            name => self.context.fields.push(Arg::new(name, value)),
        }
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_value(field, Value::Str(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::U64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, Value::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::Bool(value));
    }
}
