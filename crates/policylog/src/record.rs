//! Log records and the caller-supplied context that feeds them

use crate::level::Level;
use crate::value::{Arg, Args, Value};
use chrono::{DateTime, FixedOffset};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::backtrace::{Backtrace, BacktraceStatus};

/// Written in place of an empty cause type name.
pub const UNKNOWN_CAUSE_TYPE: &str = "error";

/// Written in place of an empty cause message.
pub const EMPTY_CAUSE_MESSAGE: &str = "<no message>";

/// One link of an error cause chain.
///
/// Serializes as `{"type", "message", "stack_frames"}`; empty type names and
/// messages are written as [`UNKNOWN_CAUSE_TYPE`] and [`EMPTY_CAUSE_MESSAGE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CauseLink {
    /// Error type name
    pub kind: String,
    /// Error message
    pub message: String,
    /// Captured stack frames, outermost call last
    pub stack_frames: Vec<String>,
}

impl CauseLink {
    /// Create a link without stack frames.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stack_frames: Vec::new(),
        }
    }

    /// Add a stack frame.
    pub fn frame(mut self, frame: impl Into<String>) -> Self {
        self.stack_frames.push(frame.into());
        self
    }
}

impl Serialize for CauseLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut link = serializer.serialize_struct("CauseLink", 3)?;
        link.serialize_field("type", or_placeholder(&self.kind, UNKNOWN_CAUSE_TYPE))?;
        link.serialize_field("message", or_placeholder(&self.message, EMPTY_CAUSE_MESSAGE))?;
        link.serialize_field("stack_frames", &self.stack_frames)?;
        link.end()
    }
}

fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.is_empty() {
        placeholder
    } else {
        text
    }
}

/// An error cause chain, outermost error first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Cause {
    links: Vec<CauseLink>,
}

impl Cause {
    /// Empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a link (it becomes the cause of the previous one).
    pub fn link(mut self, link: CauseLink) -> Self {
        self.links.push(link);
        self
    }

    /// Build a chain by walking [`std::error::Error::source`].
    ///
    /// The root link is named after `E`; source links are named after the
    /// leading identifier of their `Debug` output. When backtraces are enabled
    /// (`RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`) the root carries the frames of
    /// the capture point.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut root = CauseLink::new(std::any::type_name::<E>(), err.to_string());
        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            root.stack_frames = backtrace
                .to_string()
                .lines()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect();
        }

        let mut links = vec![root];
        let mut source = err.source();
        while let Some(current) = source {
            let debug = format!("{:?}", current);
            links.push(CauseLink::new(debug_type_hint(&debug), current.to_string()));
            source = current.source();
        }

        Self { links }
    }

    /// Links, outermost first.
    pub fn links(&self) -> &[CauseLink] {
        &self.links
    }

    /// Mutable access for in-place redaction.
    pub(crate) fn links_mut(&mut self) -> &mut [CauseLink] {
        &mut self.links
    }

    /// Chain length.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

fn debug_type_hint(debug: &str) -> String {
    let hint: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if hint.is_empty() {
        UNKNOWN_CAUSE_TYPE.to_string()
    } else {
        hint
    }
}

/// Context passed explicitly by the caller. Nothing here is ever inferred.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Request identifier
    pub request_id: Option<String>,
    /// Cross-service correlation identifier
    pub correlation_id: Option<String>,
    /// Application error code
    pub error_code: Option<String>,
    /// Error cause chain
    pub cause: Option<Cause>,
    /// Extra structured fields not referenced by the template
    pub fields: Vec<Arg>,
}

impl CallContext {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request ID.
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Set the correlation ID.
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the error code.
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Attach a cause chain.
    pub fn cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Attach the cause chain of an error.
    pub fn error<E>(self, err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        self.cause(Cause::from_error(err))
    }

    /// Add an extra structured field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push(Arg::new(name, value));
        self
    }
}

/// What the caller provides before enrichment.
#[derive(Debug, Clone)]
pub struct PartialRecord {
    /// Severity
    pub level: Level,
    /// Category the threshold is looked up by
    pub category: String,
    /// Message template with `{N}` placeholders
    pub template: String,
    /// Template arguments
    pub args: Args,
    /// Caller context
    pub context: CallContext,
}

impl PartialRecord {
    /// Create a partial record.
    pub fn new(
        level: Level,
        category: impl Into<String>,
        template: impl Into<String>,
        args: Args,
        context: CallContext,
    ) -> Self {
        Self {
            level,
            category: category.into(),
            template: template.into(),
            args,
            context,
        }
    }
}

/// A fully enriched log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Severity
    pub level: Level,
    /// Category
    pub category: String,
    /// Message template with `{N}` placeholders
    pub template: String,
    /// Template arguments in caller order
    pub args: Vec<Arg>,
    /// Creation time with explicit offset
    pub timestamp: DateTime<FixedOffset>,
    /// Host identifier
    pub host_id: String,
    /// Process identifier
    pub process_id: u32,
    /// Thread identifier
    pub thread_id: String,
    /// Request identifier
    pub request_id: Option<String>,
    /// Correlation identifier
    pub correlation_id: Option<String>,
    /// Application error code
    pub error_code: Option<String>,
    /// Error cause chain
    pub cause: Option<Cause>,
    /// Extra caller fields
    pub fields: Vec<Arg>,
    /// Service-wide fields from configuration
    pub static_fields: Vec<Arg>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection reset")
        }
    }

    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("query failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_cause_from_error_walks_sources() {
        let cause = Cause::from_error(&Outer(Inner));
        assert_eq!(cause.len(), 2);
        assert!(cause.links()[0].kind.ends_with("Outer"));
        assert_eq!(cause.links()[0].message, "query failed");
        assert_eq!(cause.links()[1].kind, "Inner");
        assert_eq!(cause.links()[1].message, "connection reset");
    }

    #[test]
    fn test_debug_type_hint() {
        assert_eq!(debug_type_hint("Io(Custom { kind: Other })"), "Io");
        assert_eq!(debug_type_hint("sqlx::Error"), "sqlx::Error");
        assert_eq!(debug_type_hint("\"plain\""), "error");
    }

    #[test]
    fn test_manual_chain() {
        let cause = Cause::new()
            .link(CauseLink::new("DbError", "insert failed").frame("repo::insert"))
            .link(CauseLink::new("IoError", "broken pipe"));
        assert_eq!(cause.len(), 2);
        assert_eq!(cause.links()[0].stack_frames, vec!["repo::insert"]);
    }

    #[test]
    fn test_cause_link_serializes_type_key() {
        let json = serde_json::to_value(CauseLink::new("E", "m")).unwrap();
        assert_eq!(json["type"], "E");
        assert_eq!(json["message"], "m");
        assert!(json["stack_frames"].as_array().unwrap().is_empty());
    }

    #[derive(Debug)]
    struct Silent;

    impl fmt::Display for Silent {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Ok(())
        }
    }

    impl std::error::Error for Silent {}

    #[test]
    fn test_empty_type_and_message_are_never_serialized() {
        let cause = Cause::new()
            .link(CauseLink::new("Outer", ""))
            .link(CauseLink::new("", "inner"));
        let json = serde_json::to_value(&cause).unwrap();
        assert_eq!(json[0]["type"], "Outer");
        assert_eq!(json[0]["message"], EMPTY_CAUSE_MESSAGE);
        assert_eq!(json[1]["type"], UNKNOWN_CAUSE_TYPE);
        assert_eq!(json[1]["message"], "inner");

        let silent = serde_json::to_value(Cause::from_error(&Silent)).unwrap();
        assert_eq!(silent[0]["message"], EMPTY_CAUSE_MESSAGE);
    }

    #[test]
    fn test_context_builder() {
        let ctx = CallContext::new()
            .request_id("req-1")
            .correlation_id("corr-1")
            .error_code("E42")
            .field("tenant", "acme");
        assert_eq!(ctx.request_id.as_deref(), Some("req-1"));
        assert_eq!(ctx.correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(ctx.error_code.as_deref(), Some("E42"));
        assert_eq!(ctx.fields.len(), 1);
        assert!(ctx.cause.is_none());
    }
}
