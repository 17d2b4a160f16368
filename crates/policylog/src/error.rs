//! Error types
//!
//! Only pipeline construction and sinks can fail. The call-site API never
//! returns these to the code that is logging.

use std::io;
use thiserror::Error;

/// Result type for configuration and pipeline construction.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors raised while compiling a [`PipelineConfig`](crate::PipelineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A level name that is not one of debug, info, warn or error.
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// A malformed `category=level` directive.
    #[error("Invalid level directive: {0}")]
    InvalidDirective(String),

    /// A redaction value pattern that does not compile.
    #[error("Invalid redaction pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compiler error.
        #[source]
        source: regex::Error,
    },

    /// A redaction rule with no matcher or more than one matcher.
    #[error("Invalid redaction rule: {0}")]
    InvalidRule(String),
}

/// Errors reported by a [`Sink`](crate::Sink).
#[derive(Debug, Error)]
pub enum SinkError {
    /// Underlying writer failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The sink no longer accepts lines.
    #[error("Sink is closed")]
    Closed,

    /// A lock guarding the sink was poisoned by a panicking writer.
    #[error("Sink lock poisoned: {0}")]
    Poisoned(String),

    /// A bounded sink refused the line.
    #[error("Sink is full")]
    Full,
}
