//! Destinations for finished lines
//!
//! A sink receives one complete JSON line per call and owns any
//! serialization of concurrent writes.

#[cfg(feature = "async-sink")]
mod channel;
mod memory;
mod writer;

#[cfg(feature = "async-sink")]
pub use channel::ChannelSink;
pub use memory::{InMemorySink, InMemorySinkConfig};
pub use writer::WriterSink;

use crate::error::SinkResult;
use std::sync::Arc;

/// Receives finished structured lines.
pub trait Sink: Send + Sync {
    /// Hand off one line (without trailing newline).
    fn emit(&self, line: &str) -> SinkResult<()>;

    /// Flush any buffered lines.
    fn flush(&self) -> SinkResult<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn emit(&self, line: &str) -> SinkResult<()> {
        (**self).emit(line)
    }

    fn flush(&self) -> SinkResult<()> {
        (**self).flush()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&self, line: &str) -> SinkResult<()> {
        (**self).emit(line)
    }

    fn flush(&self) -> SinkResult<()> {
        (**self).flush()
    }
}
