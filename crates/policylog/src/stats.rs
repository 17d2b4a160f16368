//! Pipeline counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by the pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    emitted: AtomicU64,
    filtered: AtomicU64,
    rejected: AtomicU64,
    format_mismatches: AtomicU64,
    sink_failures: AtomicU64,
    internal_failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Lines accepted by the sink, diagnostics included
    pub emitted: u64,
    /// Records below their category threshold
    pub filtered: u64,
    /// Records discarded by a REJECT_RECORD rule
    pub rejected: u64,
    /// Records whose template and arguments disagreed
    pub format_mismatches: u64,
    /// Lines the sink refused
    pub sink_failures: u64,
    /// Calls that panicked inside the pipeline
    pub internal_failures: u64,
}

impl PipelineStats {
    /// Fresh zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_format_mismatch(&self) {
        self.format_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_internal_failure(&self) {
        self.internal_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            emitted: self.emitted.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            format_mismatches: self.format_mismatches.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            internal_failures: self.internal_failures.load(Ordering::Relaxed),
        }
    }
}
