//! Pipeline configuration
//!
//! [`PipelineConfig`] is plain data: hosts deserialize it from whatever
//! source they use (or build it in code) and hand it to
//! [`LoggerBuilder::config`](crate::LoggerBuilder::config). Compilation into
//! thresholds and redaction rules happens once, at build time.
//!
//! # Example
//!
//! ```
//! use policylog::{Level, PipelineConfig, RedactionAction, RedactionRuleConfig};
//!
//! let config = PipelineConfig::builder()
//!     .default_level(Level::Warn)
//!     .category("auth", Level::Debug)
//!     .redaction_rule(RedactionRuleConfig::field("password", RedactionAction::Drop))
//!     .service_name("checkout")
//!     .build();
//!
//! assert_eq!(config.categories.get("auth"), Some(&Level::Debug));
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::level::{Level, LevelThresholds};
use crate::redact::{RedactionAction, RedactionRule};
use crate::value::Arg;
use serde::Deserialize;
use std::collections::HashMap;

/// Environment variable read by [`Environment::current`].
pub const ENV_VAR: &str = "POLICYLOG_ENV";

/// Deployment profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Local development: DEBUG and above everywhere.
    Development,
    /// Production: INFO and above, credential fields dropped.
    Production,
    /// Any other deployment name.
    Custom(String),
}

impl Environment {
    /// Detect the environment from `POLICYLOG_ENV`.
    ///
    /// - `Production` for "production" or "prod"
    /// - `Development` for "development", "dev" or when unset
    /// - `Custom(name)` otherwise
    pub fn current() -> Self {
        match std::env::var(ENV_VAR).as_deref() {
            Ok("production") | Ok("prod") => Self::Production,
            Ok("development") | Ok("dev") => Self::Development,
            Ok(other) => Self::Custom(other.to_string()),
            Err(_) => Self::Development,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Get the environment name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Global threshold suited to this environment.
    pub fn default_level(&self) -> Level {
        if self.is_development() {
            Level::Debug
        } else {
            Level::Info
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One redaction rule as written in configuration.
///
/// Exactly one of `field`, `field_contains` and `value_pattern` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedactionRuleConfig {
    /// Exact field name (case-insensitive)
    #[serde(default)]
    pub field: Option<String>,
    /// Fragment of a field name (case-insensitive)
    #[serde(default)]
    pub field_contains: Option<String>,
    /// Regex over field values; also applied to template and cause text
    #[serde(default)]
    pub value_pattern: Option<String>,
    /// Action on match
    pub action: RedactionAction,
}

impl RedactionRuleConfig {
    /// Rule on an exact field name.
    pub fn field(name: impl Into<String>, action: RedactionAction) -> Self {
        Self {
            field: Some(name.into()),
            field_contains: None,
            value_pattern: None,
            action,
        }
    }

    /// Rule on field names containing a fragment.
    pub fn field_contains(fragment: impl Into<String>, action: RedactionAction) -> Self {
        Self {
            field: None,
            field_contains: Some(fragment.into()),
            value_pattern: None,
            action,
        }
    }

    /// Rule on values matching a regex.
    pub fn value_pattern(pattern: impl Into<String>, action: RedactionAction) -> Self {
        Self {
            field: None,
            field_contains: None,
            value_pattern: Some(pattern.into()),
            action,
        }
    }

    /// Compile into a [`RedactionRule`].
    pub fn compile(&self) -> ConfigResult<RedactionRule> {
        match (&self.field, &self.field_contains, &self.value_pattern) {
            (Some(name), None, None) => Ok(RedactionRule::field(name.clone(), self.action)),
            (None, Some(fragment), None) => {
                Ok(RedactionRule::name_contains(fragment.clone(), self.action))
            }
            (None, None, Some(pattern)) => RedactionRule::value_pattern(pattern, self.action),
            (None, None, None) => Err(ConfigError::InvalidRule(
                "rule needs one of field, field_contains or value_pattern".to_string(),
            )),
            _ => Err(ConfigError::InvalidRule(
                "rule sets more than one of field, field_contains and value_pattern".to_string(),
            )),
        }
    }
}

/// Redaction section of [`PipelineConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Rules in priority order; the first match wins
    pub rules: Vec<RedactionRuleConfig>,
    /// Salt mixed into HASH digests
    pub hash_salt: Option<String>,
}

impl RedactionConfig {
    /// Credential fields dropped by the production preset.
    pub fn default_rules() -> Vec<RedactionRuleConfig> {
        ["authorization", "cookie", "password", "x-api-key", "x-auth-token"]
            .into_iter()
            .map(|name| RedactionRuleConfig::field(name, RedactionAction::Drop))
            .collect()
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Global threshold; INFO when unset
    pub default_level: Option<Level>,
    /// Directive string such as `"warn,auth=debug"`, applied before
    /// `default_level` and `categories`
    pub directives: Option<String>,
    /// Per-category thresholds (exact category match)
    pub categories: HashMap<String, Level>,
    /// Redaction rules
    pub redaction: RedactionConfig,
    /// Emitted as the `service` field on every line
    pub service_name: Option<String>,
    /// Emitted as the `environment` field on every line
    pub environment: Option<String>,
    /// Additional static fields for every line
    pub static_fields: Vec<(String, String)>,
    /// Emit a WARN diagnostic record after a template/argument mismatch
    pub report_format_mismatch: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_level: None,
            directives: None,
            categories: HashMap::new(),
            redaction: RedactionConfig::default(),
            service_name: None,
            environment: None,
            static_fields: Vec::new(),
            report_format_mismatch: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for PipelineConfig
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Create a config for local development
    pub fn development() -> Self {
        Self {
            default_level: Some(Level::Debug),
            environment: Some(Environment::Development.as_str().to_string()),
            ..Default::default()
        }
    }

    /// Create a config for production
    pub fn production() -> Self {
        Self {
            default_level: Some(Level::Info),
            environment: Some(Environment::Production.as_str().to_string()),
            redaction: RedactionConfig {
                rules: RedactionConfig::default_rules(),
                hash_salt: None,
            },
            ..Default::default()
        }
    }

    /// Preset matching an environment.
    pub fn for_environment(env: &Environment) -> Self {
        match env {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Custom(name) => Self {
                default_level: Some(env.default_level()),
                environment: Some(name.clone()),
                ..Default::default()
            },
        }
    }

    /// Preset for [`Environment::current`].
    pub fn from_environment() -> Self {
        Self::for_environment(&Environment::current())
    }

    /// Build the level thresholds.
    pub fn thresholds(&self) -> ConfigResult<LevelThresholds> {
        let mut thresholds = match &self.directives {
            Some(directives) => LevelThresholds::parse_directives(directives)?,
            None => LevelThresholds::default(),
        };
        if let Some(level) = self.default_level {
            thresholds = thresholds.with_default(level);
        }
        for (category, level) in &self.categories {
            thresholds = thresholds.with_category(category.clone(), *level);
        }
        Ok(thresholds)
    }

    /// Compile the redaction rules, in order.
    pub fn redaction_rules(&self) -> ConfigResult<Vec<RedactionRule>> {
        self.redaction
            .rules
            .iter()
            .map(RedactionRuleConfig::compile)
            .collect()
    }

    /// Static fields attached to every record: `service`, `environment`,
    /// then the configured ones.
    pub fn static_field_args(&self) -> Vec<Arg> {
        let mut fields = Vec::with_capacity(self.static_fields.len() + 2);
        if let Some(service) = &self.service_name {
            fields.push(Arg::new("service", service.as_str()));
        }
        if let Some(environment) = &self.environment {
            fields.push(Arg::new("environment", environment.as_str()));
        }
        fields.extend(
            self.static_fields
                .iter()
                .map(|(name, value)| Arg::new(name.as_str(), value.as_str())),
        );
        fields
    }

    /// Settings left unset that will fall back to a default.
    pub fn defaults_applied(&self) -> Vec<&'static str> {
        let mut applied = Vec::new();
        if self.default_level.is_none() && self.directives.is_none() {
            applied.push("default_level");
        }
        if self.redaction.hash_salt.is_none() {
            applied.push("redaction.hash_salt");
        }
        applied
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the global threshold
    pub fn default_level(mut self, level: Level) -> Self {
        self.config.default_level = Some(level);
        self
    }

    /// Set a directive string
    pub fn directives(mut self, directives: impl Into<String>) -> Self {
        self.config.directives = Some(directives.into());
        self
    }

    /// Set the threshold of one category
    pub fn category(mut self, category: impl Into<String>, level: Level) -> Self {
        self.config.categories.insert(category.into(), level);
        self
    }

    /// Append a redaction rule
    pub fn redaction_rule(mut self, rule: RedactionRuleConfig) -> Self {
        self.config.redaction.rules.push(rule);
        self
    }

    /// Append the credential rules of the production preset
    pub fn default_redaction_rules(mut self) -> Self {
        self.config
            .redaction
            .rules
            .extend(RedactionConfig::default_rules());
        self
    }

    /// Set the HASH salt
    pub fn hash_salt(mut self, salt: impl Into<String>) -> Self {
        self.config.redaction.hash_salt = Some(salt.into());
        self
    }

    /// Set the service name
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = Some(name.into());
        self
    }

    /// Set the environment name
    pub fn environment(mut self, env: impl Into<String>) -> Self {
        self.config.environment = Some(env.into());
        self
    }

    /// Add a static field to include in all lines
    pub fn static_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.static_fields.push((key.into(), value.into()));
        self
    }

    /// Set whether mismatched templates produce a diagnostic record
    pub fn report_format_mismatch(mut self, report: bool) -> Self {
        self.config.report_format_mismatch = report;
        self
    }

    /// Build the configuration
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
