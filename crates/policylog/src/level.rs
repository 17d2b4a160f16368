//! Severity levels and per-category thresholds

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Severity of a log record, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Diagnostic detail for developers
    #[serde(alias = "debug")]
    Debug,
    /// Normal operation
    #[default]
    #[serde(alias = "info")]
    Info,
    /// Unexpected but recoverable
    #[serde(alias = "warn")]
    Warn,
    /// Operation failed
    #[serde(alias = "error")]
    Error,
}

impl Level {
    /// All levels, least severe first.
    pub const ALL: [Level; 4] = [Level::Debug, Level::Info, Level::Warn, Level::Error];

    /// Uppercase name as it appears in emitted lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}

/// Minimum emitted level per category, with a global fallback.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LevelThresholds {
    default: Level,
    categories: HashMap<String, Level>,
}

impl LevelThresholds {
    /// Thresholds with the given global default and no overrides.
    pub fn new(default: Level) -> Self {
        Self {
            default,
            categories: HashMap::new(),
        }
    }

    /// Replace the global default.
    pub fn with_default(mut self, level: Level) -> Self {
        self.default = level;
        self
    }

    /// Add a category override.
    pub fn with_category(mut self, category: impl Into<String>, level: Level) -> Self {
        self.categories.insert(category.into(), level);
        self
    }

    /// Parse a directive string such as `"warn,auth=debug,db=error"`.
    ///
    /// A bare level sets the global default; `category=level` adds an
    /// override. Empty segments are ignored.
    pub fn parse_directives(directives: &str) -> ConfigResult<Self> {
        let mut thresholds = Self::default();

        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.split_once('=') {
                Some((category, level)) => {
                    let category = category.trim();
                    if category.is_empty() {
                        return Err(ConfigError::InvalidDirective(directive.to_string()));
                    }
                    let level = level
                        .parse::<Level>()
                        .map_err(|_| ConfigError::InvalidDirective(directive.to_string()))?;
                    thresholds.categories.insert(category.to_string(), level);
                }
                None => thresholds.default = directive.parse()?,
            }
        }

        Ok(thresholds)
    }

    /// The global default threshold.
    pub fn default_level(&self) -> Level {
        self.default
    }

    /// Effective threshold for a category.
    pub fn threshold_for(&self, category: &str) -> Level {
        self.categories
            .get(category)
            .copied()
            .unwrap_or(self.default)
    }

    /// Number of category overrides.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether there are no category overrides.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Gate deciding whether a record is emitted at all.
#[derive(Debug, Clone, Default)]
pub struct LevelFilter {
    thresholds: Arc<LevelThresholds>,
}

impl LevelFilter {
    /// Create a filter over the given thresholds.
    pub fn new(thresholds: LevelThresholds) -> Self {
        Self {
            thresholds: Arc::new(thresholds),
        }
    }

    /// Whether a record of `level` in `category` should be emitted.
    pub fn should_emit(&self, category: &str, level: Level) -> bool {
        level >= self.thresholds.threshold_for(category)
    }

    /// The thresholds this filter reads.
    pub fn thresholds(&self) -> &LevelThresholds {
        &self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("DEBUG".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!(" Error ".parse::<Level>().unwrap(), Level::Error);
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_serde_uppercase() {
        assert_eq!(serde_json::to_string(&Level::Warn).unwrap(), "\"WARN\"");
        let level: Level = serde_json::from_str("\"ERROR\"").unwrap();
        assert_eq!(level, Level::Error);
    }

    #[test]
    fn test_unset_configuration_defaults_to_info() {
        let filter = LevelFilter::default();
        assert!(!filter.should_emit("anything", Level::Debug));
        assert!(filter.should_emit("anything", Level::Info));
        assert!(filter.should_emit("anything", Level::Warn));
        assert!(filter.should_emit("anything", Level::Error));
    }

    #[test]
    fn test_category_override() {
        let filter = LevelFilter::new(
            LevelThresholds::new(Level::Info)
                .with_category("db", Level::Error)
                .with_category("auth", Level::Debug),
        );

        assert!(filter.should_emit("auth", Level::Debug));
        assert!(!filter.should_emit("db", Level::Warn));
        assert!(filter.should_emit("db", Level::Error));
        // Unknown categories fall back to the global default
        assert!(!filter.should_emit("cache", Level::Debug));
        assert!(filter.should_emit("cache", Level::Info));
    }

    #[test]
    fn test_category_match_is_exact() {
        let filter =
            LevelFilter::new(LevelThresholds::new(Level::Info).with_category("auth", Level::Debug));
        assert!(!filter.should_emit("auth.login", Level::Debug));
    }

    #[test]
    fn test_parse_directives() {
        let thresholds = LevelThresholds::parse_directives("warn, auth=debug,db=error,").unwrap();
        assert_eq!(thresholds.default_level(), Level::Warn);
        assert_eq!(thresholds.threshold_for("auth"), Level::Debug);
        assert_eq!(thresholds.threshold_for("db"), Level::Error);
        assert_eq!(thresholds.threshold_for("other"), Level::Warn);
        assert_eq!(thresholds.len(), 2);
    }

    #[test]
    fn test_parse_directives_defaults_to_info() {
        let thresholds = LevelThresholds::parse_directives("auth=error").unwrap();
        assert_eq!(thresholds.default_level(), Level::Info);
    }

    #[test]
    fn test_parse_directives_rejects_garbage() {
        assert!(matches!(
            LevelThresholds::parse_directives("auth=loud"),
            Err(ConfigError::InvalidDirective(_))
        ));
        assert!(matches!(
            LevelThresholds::parse_directives("=info"),
            Err(ConfigError::InvalidDirective(_))
        ));
        assert!(matches!(
            LevelThresholds::parse_directives("verbose"),
            Err(ConfigError::InvalidLevel(_))
        ));
    }
}
