//! In-memory sink

use super::Sink;
use crate::error::{SinkError, SinkResult};
use std::collections::VecDeque;
use std::sync::RwLock;

/// Configuration for [`InMemorySink`].
#[derive(Debug, Clone)]
pub struct InMemorySinkConfig {
    /// Maximum number of lines kept.
    pub max_lines: usize,
    /// Whether to drop the oldest line when full (ring buffer behavior).
    pub evict_oldest: bool,
}

impl Default for InMemorySinkConfig {
    fn default() -> Self {
        Self {
            max_lines: 10_000,
            evict_oldest: true,
        }
    }
}

/// Keeps emitted lines in memory (for tests and inspection endpoints).
#[derive(Debug)]
pub struct InMemorySink {
    lines: RwLock<VecDeque<String>>,
    config: InMemorySinkConfig,
}

impl InMemorySink {
    /// Create a sink with default configuration.
    pub fn new() -> Self {
        Self::with_config(InMemorySinkConfig::default())
    }

    /// Create a sink with custom configuration.
    pub fn with_config(config: InMemorySinkConfig) -> Self {
        Self {
            lines: RwLock::new(VecDeque::with_capacity(config.max_lines.min(1000))),
            config,
        }
    }

    /// Create a bounded ring buffer of `max_lines`.
    pub fn bounded(max_lines: usize) -> Self {
        Self::with_config(InMemorySinkConfig {
            max_lines,
            evict_oldest: true,
        })
    }

    /// Copy of all stored lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .read()
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Stored lines parsed as JSON. Unparseable lines are skipped.
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Number of stored lines.
    pub fn len(&self) -> usize {
        self.lines.read().map(|lines| lines.len()).unwrap_or(0)
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all stored lines.
    pub fn clear(&self) -> SinkResult<()> {
        let mut lines = self
            .lines
            .write()
            .map_err(|e| SinkError::Poisoned(e.to_string()))?;
        lines.clear();
        Ok(())
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for InMemorySink {
    fn emit(&self, line: &str) -> SinkResult<()> {
        let mut lines = self
            .lines
            .write()
            .map_err(|e| SinkError::Poisoned(e.to_string()))?;

        if lines.len() >= self.config.max_lines {
            if !self.config.evict_oldest {
                return Err(SinkError::Full);
            }
            lines.pop_front();
        }

        lines.push_back(line.to_string());
        Ok(())
    }
}
