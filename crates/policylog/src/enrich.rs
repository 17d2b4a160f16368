//! Metadata enrichment

use crate::identity::{current_thread_id, ProcessIdentity};
use crate::record::{LogRecord, PartialRecord};
use crate::value::Arg;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;

/// Source of record timestamps.
pub trait Clock: Send + Sync {
    /// Current time with an explicit offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in UTC (`+00:00`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        DateTime::<FixedOffset>::from(Utc::now())
    }
}

/// Clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Attaches identity, timing and configured static fields to records.
#[derive(Clone)]
pub struct MetadataEnricher {
    identity: Arc<ProcessIdentity>,
    clock: Arc<dyn Clock>,
    static_fields: Arc<[Arg]>,
}

impl MetadataEnricher {
    /// Enricher over an identity, using the system clock.
    pub fn new(identity: Arc<ProcessIdentity>) -> Self {
        Self {
            identity,
            clock: Arc::new(SystemClock),
            static_fields: Arc::from(Vec::new()),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fields attached to every record.
    pub fn with_static_fields(mut self, fields: Vec<Arg>) -> Self {
        self.static_fields = Arc::from(fields);
        self
    }

    /// Build a complete record from what the caller supplied.
    pub fn enrich(&self, partial: PartialRecord) -> LogRecord {
        let PartialRecord {
            level,
            category,
            template,
            args,
            context,
        } = partial;

        LogRecord {
            level,
            category,
            template,
            args: args.into_vec(),
            timestamp: self.clock.now(),
            host_id: self.identity.host_id().to_string(),
            process_id: self.identity.process_id(),
            thread_id: current_thread_id(),
            request_id: context.request_id,
            correlation_id: context.correlation_id,
            error_code: context.error_code,
            cause: context.cause,
            fields: context.fields,
            static_fields: self.static_fields.to_vec(),
        }
    }

    /// The identity this enricher reads.
    pub fn identity(&self) -> &ProcessIdentity {
        &self.identity
    }
}

impl Default for MetadataEnricher {
    fn default() -> Self {
        Self::new(ProcessIdentity::global())
    }
}

impl std::fmt::Debug for MetadataEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataEnricher")
            .field("identity", &self.identity)
            .field("static_fields", &self.static_fields.len())
            .finish()
    }
}
