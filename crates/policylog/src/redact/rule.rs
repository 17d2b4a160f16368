//! Redaction rules and field matchers

use crate::error::{ConfigError, ConfigResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// What happens to a field that matches a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionAction {
    /// Remove the field from the output
    Drop,
    /// Replace the value with a one-way digest
    Hash,
    /// Discard the whole record and emit a diagnostic instead
    RejectRecord,
}

/// Predicate over a field's name and value.
#[derive(Debug, Clone)]
pub enum FieldMatcher {
    /// Exact field name, case-insensitive
    FieldName(String),
    /// Field name containing a fragment, case-insensitive
    NameContains(String),
    /// Regex over the value's text form
    ValuePattern(Regex),
}

impl FieldMatcher {
    /// Whether a field matches.
    pub fn matches(&self, name: &str, value: &str) -> bool {
        match self {
            FieldMatcher::FieldName(expected) => name.eq_ignore_ascii_case(expected),
            FieldMatcher::NameContains(fragment) => name
                .to_ascii_lowercase()
                .contains(&fragment.to_ascii_lowercase()),
            FieldMatcher::ValuePattern(pattern) => pattern.is_match(value),
        }
    }

    /// The regex, for matchers that also scan free text.
    pub fn pattern(&self) -> Option<&Regex> {
        match self {
            FieldMatcher::ValuePattern(pattern) => Some(pattern),
            _ => None,
        }
    }
}

/// A matcher paired with an action.
#[derive(Debug, Clone)]
pub struct RedactionRule {
    /// Which fields the rule applies to
    pub matcher: FieldMatcher,
    /// What to do with them
    pub action: RedactionAction,
}

impl RedactionRule {
    /// Rule on an exact field name.
    pub fn field(name: impl Into<String>, action: RedactionAction) -> Self {
        Self {
            matcher: FieldMatcher::FieldName(name.into()),
            action,
        }
    }

    /// Rule on field names containing a fragment.
    pub fn name_contains(fragment: impl Into<String>, action: RedactionAction) -> Self {
        Self {
            matcher: FieldMatcher::NameContains(fragment.into()),
            action,
        }
    }

    /// Rule on values matching a regex.
    pub fn value_pattern(pattern: &str, action: RedactionAction) -> ConfigResult<Self> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            matcher: FieldMatcher::ValuePattern(regex),
            action,
        })
    }
}

/// Whether a field name denotes a session identifier.
///
/// Names are compared after lowercasing and removing `-`, `_` and `.`, so
/// `session_id`, `SessionId`, `JSESSIONID`, `PHPSESSID` and `connect.sid`
/// all qualify.
pub fn is_session_field(name: &str) -> bool {
    let normalized: String = name
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | '.'))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    matches!(
        normalized.as_str(),
        "session" | "sid" | "sessiontoken" | "sessionkey" | "connectsid"
    ) || normalized.ends_with("sessionid")
        || normalized.ends_with("sessid")
}
