//! The call-site entry point
//!
//! A [`Logger`] runs every record through the same fixed sequence:
//! level gate, enrichment, redaction, formatting and sink hand-off. None of
//! these steps can fail the caller. Problems surface as diagnostic records,
//! counters in [`StatsSnapshot`] and `tracing` events.

use crate::config::PipelineConfig;
use crate::diagnostic::{
    format_mismatch_record, internal_failure_record, rejection_record, DiagnosticKind,
    DIAGNOSTIC_CATEGORY,
};
use crate::enrich::{Clock, MetadataEnricher};
use crate::error::{ConfigResult, SinkResult};
use crate::format::{render_message, JsonFormatter, LogFormatter};
use crate::identity::ProcessIdentity;
use crate::level::{Level, LevelFilter};
use crate::record::{CallContext, LogRecord, PartialRecord};
use crate::redact::{Redactor, Scrubbed};
use crate::sink::{Sink, WriterSink};
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::value::Args;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Structured logging pipeline.
///
/// Cheap to clone; clones share the same sink and counters.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use policylog::{args, CallContext, InMemorySink, Level, Logger};
///
/// let sink = Arc::new(InMemorySink::new());
/// let logger = Logger::builder().sink(sink.clone()).build().unwrap();
///
/// logger.log(
///     Level::Warn,
///     "auth",
///     "User: [{0}] failed login attempt {1}",
///     args!["user" => "u123", "attempt" => 3],
///     &CallContext::new().request_id("req-7"),
/// );
///
/// let line = &sink.json_lines()[0];
/// assert_eq!(line["message"], "User: [u123] failed login attempt 3");
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    filter: LevelFilter,
    enricher: MetadataEnricher,
    redactor: Redactor,
    formatter: Box<dyn LogFormatter>,
    sink: Arc<dyn Sink>,
    stats: PipelineStats,
    report_format_mismatch: bool,
}

impl Logger {
    /// Start building a logger.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Log a record.
    ///
    /// Never fails and never panics: rejected, malformed or unwritable
    /// records are reported through diagnostics instead.
    pub fn log(
        &self,
        level: Level,
        category: &str,
        template: &str,
        args: Args,
        context: &CallContext,
    ) {
        if !self.inner.filter.should_emit(category, level) {
            self.inner.stats.record_filtered();
            return;
        }

        let partial = PartialRecord::new(level, category, template, args, context.clone());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.inner.process(partial)));
        if outcome.is_err() {
            self.inner.internal_failure(category);
        }
    }

    /// Log at DEBUG with an empty context.
    pub fn debug(&self, category: &str, template: &str, args: Args) {
        self.log(Level::Debug, category, template, args, &CallContext::default());
    }

    /// Log at INFO with an empty context.
    pub fn info(&self, category: &str, template: &str, args: Args) {
        self.log(Level::Info, category, template, args, &CallContext::default());
    }

    /// Log at WARN with an empty context.
    pub fn warn(&self, category: &str, template: &str, args: Args) {
        self.log(Level::Warn, category, template, args, &CallContext::default());
    }

    /// Log at ERROR with an empty context.
    pub fn error(&self, category: &str, template: &str, args: Args) {
        self.log(Level::Error, category, template, args, &CallContext::default());
    }

    /// Whether a record would pass the level gate.
    ///
    /// Lets callers skip building expensive arguments.
    pub fn is_enabled(&self, category: &str, level: Level) -> bool {
        self.inner.filter.should_emit(category, level)
    }

    /// Flush the sink.
    pub fn flush(&self) -> SinkResult<()> {
        self.inner.sink.flush()
    }

    /// Current counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("filter", &self.inner.filter)
            .field("enricher", &self.inner.enricher)
            .field("rules", &self.inner.redactor.rules().len())
            .field("stats", &self.inner.stats.snapshot())
            .finish()
    }
}

impl Inner {
    fn process(&self, partial: PartialRecord) {
        let record = self.enricher.enrich(partial);

        match self.redactor.scrub(record) {
            Scrubbed::Clean(record) => self.write_record(&record),
            Scrubbed::Rejected(rejection) => {
                self.stats.record_rejected();
                tracing::debug!(
                    category = %rejection.record.category,
                    rule_index = rejection.rule_index,
                    field = %rejection.field,
                    "record rejected by redaction rule"
                );
                self.write_line(&self.formatter.render(&rejection_record(rejection)));
            }
        }
    }

    fn write_record(&self, record: &LogRecord) {
        self.write_line(&self.formatter.render(record));

        if let Some(mismatch) = render_message(&record.template, &record.args).mismatch {
            self.stats.record_format_mismatch();
            if self.report_format_mismatch {
                let diagnostic = format_mismatch_record(record, mismatch);
                self.write_line(&self.formatter.render(&diagnostic));
            }
        }
    }

    fn write_line(&self, line: &str) {
        match self.sink.emit(line) {
            Ok(()) => self.stats.record_emitted(),
            Err(e) => {
                self.stats.record_sink_failure();
                tracing::warn!(
                    kind = %DiagnosticKind::SinkUnavailable,
                    error = %e,
                    "sink refused a log line"
                );
            }
        }
    }

    /// Replace a call that panicked with a diagnostic built from scratch.
    fn internal_failure(&self, source_category: &str) {
        self.stats.record_internal_failure();
        tracing::error!(
            kind = %DiagnosticKind::InternalFailure,
            category = source_category,
            "logging pipeline panicked"
        );

        // The sink itself may be what panicked
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            let base = self.enricher.enrich(PartialRecord::new(
                Level::Error,
                DIAGNOSTIC_CATEGORY,
                "",
                Args::new(),
                CallContext::default(),
            ));
            let record = internal_failure_record(base, source_category);
            self.write_line(&self.formatter.render(&record));
        }));
    }
}

/// Builder for [`Logger`].
#[derive(Default)]
pub struct LoggerBuilder {
    config: PipelineConfig,
    sink: Option<Arc<dyn Sink>>,
    identity: Option<Arc<ProcessIdentity>>,
    clock: Option<Arc<dyn Clock>>,
    formatter: Option<Box<dyn LogFormatter>>,
}

impl LoggerBuilder {
    /// Use a configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the sink. Standard output when unset.
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Override the process identity captured at startup.
    pub fn identity(mut self, identity: Arc<ProcessIdentity>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Override the timestamp source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the JSON formatter.
    pub fn formatter<F: LogFormatter + 'static>(mut self, formatter: F) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    /// Compile the configuration and assemble the pipeline.
    ///
    /// This is the only fallible step: bad level names, directives or
    /// redaction rules are reported here.
    pub fn build(self) -> ConfigResult<Logger> {
        let thresholds = self.config.thresholds()?;
        let rules = self.config.redaction_rules()?;

        for setting in self.config.defaults_applied() {
            tracing::debug!(
                kind = %DiagnosticKind::ConfigurationDefaultApplied,
                setting,
                "configuration default applied"
            );
        }

        let sink = match self.sink {
            Some(sink) => sink,
            None => {
                tracing::debug!(
                    kind = %DiagnosticKind::ConfigurationDefaultApplied,
                    setting = "sink",
                    "configuration default applied"
                );
                Arc::new(WriterSink::stdout())
            }
        };

        let mut redactor = Redactor::new(rules);
        if let Some(salt) = &self.config.redaction.hash_salt {
            redactor = redactor.with_salt(salt);
        }

        let identity = self.identity.unwrap_or_else(ProcessIdentity::global);
        let mut enricher =
            MetadataEnricher::new(identity).with_static_fields(self.config.static_field_args());
        if let Some(clock) = self.clock {
            enricher = enricher.with_clock(clock);
        }

        Ok(Logger {
            inner: Arc::new(Inner {
                filter: LevelFilter::new(thresholds),
                enricher,
                redactor,
                formatter: self
                    .formatter
                    .unwrap_or_else(|| Box::new(JsonFormatter::new())),
                sink,
                stats: PipelineStats::new(),
                report_format_mismatch: self.config.report_format_mismatch,
            }),
        })
    }
}
