//! Records the pipeline emits about itself
//!
//! Diagnostic records are fixed-text: they name categories, rule indices and
//! field names, never the values that caused them.

use crate::format::FormatMismatch;
use crate::level::Level;
use crate::record::LogRecord;
use crate::redact::Rejection;
use crate::value::Arg;
use serde::Serialize;
use std::fmt;

/// Category of every diagnostic record.
pub const DIAGNOSTIC_CATEGORY: &str = "policylog.diagnostic";

/// Field carrying the [`DiagnosticKind`] of a diagnostic record.
pub const DIAGNOSTIC_FIELD: &str = "diagnostic";

/// Conditions the pipeline reports instead of failing the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A missing setting was replaced by its default
    ConfigurationDefaultApplied,
    /// Template and arguments disagree
    FormatMismatch,
    /// A REJECT_RECORD rule discarded a record
    RedactionRejection,
    /// The sink refused a line
    SinkUnavailable,
    /// The pipeline panicked while handling a record
    InternalFailure,
}

impl DiagnosticKind {
    /// Snake-case name used in the `diagnostic` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::ConfigurationDefaultApplied => "configuration_default_applied",
            DiagnosticKind::FormatMismatch => "format_mismatch",
            DiagnosticKind::RedactionRejection => "redaction_rejection",
            DiagnosticKind::SinkUnavailable => "sink_unavailable",
            DiagnosticKind::InternalFailure => "internal_failure",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn into_diagnostic(
    mut base: LogRecord,
    kind: DiagnosticKind,
    level: Level,
    template: &str,
    args: Vec<Arg>,
) -> LogRecord {
    base.level = level;
    base.category = DIAGNOSTIC_CATEGORY.to_string();
    base.template = template.to_string();
    base.args = args;
    base.error_code = None;
    base.cause = None;
    base.fields = vec![Arg::new(DIAGNOSTIC_FIELD, kind.as_str())];
    base
}

/// Replacement for a record refused by a REJECT_RECORD rule.
pub fn rejection_record(rejection: Rejection) -> LogRecord {
    let Rejection {
        rule_index,
        field,
        record,
    } = rejection;
    let level = record.level.max(Level::Warn);
    let category = record.category.clone();

    into_diagnostic(
        record,
        DiagnosticKind::RedactionRejection,
        level,
        "log record in category {0} rejected by redaction rule {1} on field {2}",
        vec![
            Arg::new("source_category", category),
            Arg::new("rule_index", rule_index),
            Arg::new("field", field),
        ],
    )
}

/// Companion record reporting a template/argument mismatch.
pub fn format_mismatch_record(source: &LogRecord, mismatch: FormatMismatch) -> LogRecord {
    let mut base = source.clone();
    base.args.clear();
    base.static_fields.clear();

    into_diagnostic(
        base,
        DiagnosticKind::FormatMismatch,
        Level::Warn,
        "log template in category {0} has {1} placeholders but {2} arguments",
        vec![
            Arg::new("source_category", source.category.clone()),
            Arg::new("placeholders", mismatch.placeholders),
            Arg::new("args", mismatch.args),
        ],
    )
}

/// Record emitted when the pipeline itself failed on a call.
///
/// `base` must already be free of caller data; the pipeline builds it from an
/// empty context.
pub fn internal_failure_record(base: LogRecord, source_category: &str) -> LogRecord {
    into_diagnostic(
        base,
        DiagnosticKind::InternalFailure,
        Level::Error,
        "logging pipeline failed while handling a record in category {0}",
        vec![Arg::new("source_category", source_category)],
    )
}
