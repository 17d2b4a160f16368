//! # policylog
//!
//! Structured logging pipeline that enforces a logging policy before anything
//! leaves the process.
//!
//! Every call runs through a fixed sequence:
//!
//! ```text
//! caller -> LevelFilter -> MetadataEnricher -> Redactor -> Formatter -> Sink
//! ```
//!
//! - [`LevelFilter`] drops records below their category threshold (INFO by default)
//! - [`MetadataEnricher`] attaches timestamp, host, process and thread identity
//! - [`Redactor`] drops, hashes or rejects sensitive fields; session
//!   identifiers are always hashed at minimum
//! - [`JsonFormatter`] renders `{N}` templates and writes one JSON object per line
//! - a [`Sink`] receives the finished line
//!
//! Logging never fails the caller. Malformed templates, rejected records,
//! sink failures and internal panics turn into diagnostic records in the
//! `policylog.diagnostic` category, counters and `tracing` events.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use policylog::{args, CallContext, InMemorySink, Level, Logger, PipelineConfig};
//!
//! let sink = Arc::new(InMemorySink::new());
//! let logger = Logger::builder()
//!     .config(PipelineConfig::production())
//!     .sink(sink.clone())
//!     .build()
//!     .unwrap();
//!
//! logger.log(
//!     Level::Warn,
//!     "auth",
//!     "User: [{0}] failed login attempt {1}",
//!     args!["user" => "u123", "attempt" => 3],
//!     &CallContext::new().field("session_id", "sess-abc"),
//! );
//!
//! let line = &sink.lines()[0];
//! assert!(line.contains(r#""fields":{"user":"u123","attempt":3,"session_id":"sha256:"#));
//! assert!(!line.contains("sess-abc"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `tracing-layer` | yes | [`PolicyLayer`] feeding `tracing` events through a logger |
//! | `async-sink` | yes | [`ChannelSink`] draining lines on a tokio task |

pub mod config;
pub mod diagnostic;
pub mod enrich;
pub mod error;
pub mod format;
pub mod identity;
#[cfg(feature = "tracing-layer")]
mod layer;
pub mod level;
mod logger;
pub mod record;
pub mod redact;
pub mod sink;
pub mod stats;
pub mod value;

// Public API
pub use config::{
    Environment, PipelineConfig, PipelineConfigBuilder, RedactionConfig, RedactionRuleConfig,
};
pub use diagnostic::{DiagnosticKind, DIAGNOSTIC_CATEGORY, DIAGNOSTIC_FIELD};
pub use enrich::{Clock, FixedClock, MetadataEnricher, SystemClock};
pub use error::{ConfigError, ConfigResult, SinkError, SinkResult};
pub use format::{render_message, FormatMismatch, JsonFormatter, LogFormatter, RenderedMessage};
pub use identity::ProcessIdentity;
#[cfg(feature = "tracing-layer")]
pub use layer::PolicyLayer;
pub use level::{Level, LevelFilter, LevelThresholds};
pub use logger::{Logger, LoggerBuilder};
pub use record::{
    CallContext, Cause, CauseLink, LogRecord, PartialRecord, EMPTY_CAUSE_MESSAGE, UNKNOWN_CAUSE_TYPE,
};
pub use redact::{RedactionAction, RedactionRule, Redactor, Rejection, Scrubbed};
#[cfg(feature = "async-sink")]
pub use sink::ChannelSink;
pub use sink::{InMemorySink, InMemorySinkConfig, Sink, WriterSink};
pub use stats::{PipelineStats, StatsSnapshot};
pub use value::{Arg, Args, Value};
