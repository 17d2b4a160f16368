//! Applying redaction rules to records

use super::rule::{is_session_field, RedactionAction, RedactionRule};
use crate::format::{parse_template, Segment};
use crate::record::{CauseLink, LogRecord};
use crate::value::{Arg, Value, REDACTED_TEXT};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::sync::Arc;

/// Prefix of every digest produced by the HASH action.
pub const DIGEST_PREFIX: &str = "sha256:";

/// Outcome of scrubbing a record.
#[derive(Debug)]
pub enum Scrubbed {
    /// Record is safe to format
    Clean(LogRecord),
    /// A REJECT_RECORD rule fired
    Rejected(Rejection),
}

/// A record refused by a REJECT_RECORD rule.
///
/// Only identity metadata survives; arguments, fields, template and cause are
/// discarded, as is any metadata field that triggered the rejection.
#[derive(Debug)]
pub struct Rejection {
    /// Index of the rule in declaration order
    pub rule_index: usize,
    /// Name of the offending field (never its value)
    pub field: String,
    /// The stripped record
    pub record: LogRecord,
}

enum Decision {
    Keep,
    Apply(Option<usize>, RedactionAction),
}

enum FieldOutcome {
    Keep,
    Drop,
    Replace(String),
}

/// Scrubs records against an ordered rule list.
#[derive(Debug, Clone)]
pub struct Redactor {
    rules: Arc<[RedactionRule]>,
    salt: Arc<str>,
}

impl Redactor {
    /// Redactor over rules in declaration order.
    pub fn new(rules: Vec<RedactionRule>) -> Self {
        Self {
            rules: Arc::from(rules),
            salt: Arc::from(""),
        }
    }

    /// Mix a secret salt into every digest.
    pub fn with_salt(mut self, salt: impl AsRef<str>) -> Self {
        self.salt = Arc::from(salt.as_ref());
        self
    }

    /// The rules, in declaration order.
    pub fn rules(&self) -> &[RedactionRule] {
        &self.rules
    }

    /// One-way digest of a value. Stable for equal input and salt.
    pub fn digest(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(value.as_bytes());
        format!("{}{}", DIGEST_PREFIX, URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    /// Apply the rules to every argument, field and metadata value.
    pub fn scrub(&self, mut record: LogRecord) -> Scrubbed {
        let mut rejected = None;
        for (name, slot) in [
            ("request_id", &mut record.request_id),
            ("correlation_id", &mut record.correlation_id),
            ("error_code", &mut record.error_code),
        ] {
            let Some(value) = slot.as_deref() else {
                continue;
            };
            match self.apply(name, value) {
                Ok(FieldOutcome::Keep) => {}
                Ok(FieldOutcome::Drop) => *slot = None,
                Ok(FieldOutcome::Replace(digest)) => *slot = Some(digest),
                Err(rule_index) => {
                    // A rejecting value never reaches the diagnostic
                    *slot = None;
                    if rejected.is_none() {
                        rejected = Some((rule_index, name));
                    }
                }
            }
        }
        if let Some((rule_index, name)) = rejected {
            return Scrubbed::Rejected(reject(record, rule_index, name));
        }

        if let Err((rule_index, name)) = self.scrub_fields(&mut record.static_fields) {
            return Scrubbed::Rejected(reject(record, rule_index, &name));
        }
        if let Err((rule_index, name)) = self.scrub_args(&mut record.args) {
            return Scrubbed::Rejected(reject(record, rule_index, &name));
        }
        if let Err((rule_index, name)) = self.scrub_fields(&mut record.fields) {
            return Scrubbed::Rejected(reject(record, rule_index, &name));
        }

        match self.scrub_template(&record.template) {
            Ok(Some(text)) => record.template = text,
            Ok(None) => {}
            Err(rule_index) => return Scrubbed::Rejected(reject(record, rule_index, "template")),
        }

        let mut rejected = None;
        if let Some(cause) = record.cause.as_mut() {
            for link in cause.links_mut() {
                if let Err(rule_index) = self.scrub_link(link) {
                    rejected = Some(rule_index);
                    break;
                }
            }
        }
        if let Some(rule_index) = rejected {
            return Scrubbed::Rejected(reject(record, rule_index, "cause"));
        }

        Scrubbed::Clean(record)
    }

    /// First matching rule wins; session identifiers are hashed at minimum.
    fn decide(&self, name: &str, value: &str) -> Decision {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.matcher.matches(name, value) {
                return Decision::Apply(Some(index), rule.action);
            }
        }

        if is_session_field(name) {
            Decision::Apply(None, RedactionAction::Hash)
        } else {
            Decision::Keep
        }
    }

    fn apply(&self, name: &str, value: &str) -> Result<FieldOutcome, usize> {
        match self.decide(name, value) {
            Decision::Keep => Ok(FieldOutcome::Keep),
            Decision::Apply(_, RedactionAction::Drop) => Ok(FieldOutcome::Drop),
            Decision::Apply(_, RedactionAction::Hash) => {
                Ok(FieldOutcome::Replace(self.digest(value)))
            }
            Decision::Apply(Some(index), RedactionAction::RejectRecord) => Err(index),
            // The session fallback only ever hashes
            Decision::Apply(None, RedactionAction::RejectRecord) => {
                Ok(FieldOutcome::Replace(self.digest(value)))
            }
        }
    }

    /// Dropped arguments keep their slot so placeholder arity is preserved.
    fn scrub_args(&self, args: &mut [Arg]) -> Result<(), (usize, String)> {
        for arg in args.iter_mut() {
            if arg.value.is_redacted() {
                continue;
            }
            let text = arg.value.to_string();
            match self.apply(&arg.name, &text) {
                Ok(FieldOutcome::Keep) => {}
                Ok(FieldOutcome::Drop) => arg.value = Value::Redacted,
                Ok(FieldOutcome::Replace(digest)) => arg.value = Value::Str(digest),
                Err(index) => return Err((index, arg.name.clone())),
            }
        }
        Ok(())
    }

    fn scrub_fields(&self, fields: &mut Vec<Arg>) -> Result<(), (usize, String)> {
        let mut kept = Vec::with_capacity(fields.len());
        for mut field in fields.drain(..) {
            let text = field.value.to_string();
            match self.apply(&field.name, &text) {
                Ok(FieldOutcome::Keep) => kept.push(field),
                Ok(FieldOutcome::Drop) => {}
                Ok(FieldOutcome::Replace(digest)) => {
                    field.value = Value::Str(digest);
                    kept.push(field);
                }
                Err(index) => return Err((index, field.name)),
            }
        }
        *fields = kept;
        Ok(())
    }

    /// Value patterns over the literal text of a template. Placeholders and
    /// brace escapes are copied through so the template keeps its arity.
    fn scrub_template(&self, template: &str) -> Result<Option<String>, usize> {
        let mut scrubbed = String::with_capacity(template.len());
        let mut changed = false;

        for segment in parse_template(template) {
            match segment {
                Segment::Literal(text) if text.is_empty() => {}
                Segment::Literal(text) => match self.scrub_text(text)? {
                    Some(replaced) => {
                        scrubbed.push_str(&replaced);
                        changed = true;
                    }
                    None => scrubbed.push_str(text),
                },
                Segment::Brace(c) => {
                    scrubbed.push(c);
                    scrubbed.push(c);
                }
                Segment::Placeholder { raw, .. } => scrubbed.push_str(raw),
            }
        }

        Ok(changed.then_some(scrubbed))
    }

    /// Type name, message and stack frames of one cause link.
    fn scrub_link(&self, link: &mut CauseLink) -> Result<(), usize> {
        let texts = std::iter::once(&mut link.kind)
            .chain(std::iter::once(&mut link.message))
            .chain(link.stack_frames.iter_mut());
        for text in texts {
            if let Some(replaced) = self.scrub_text(text)? {
                *text = replaced;
            }
        }
        Ok(())
    }

    /// Run value patterns over free text. `Ok(None)` means unchanged.
    fn scrub_text(&self, text: &str) -> Result<Option<String>, usize> {
        let mut current: Cow<'_, str> = Cow::Borrowed(text);

        for (index, rule) in self.rules.iter().enumerate() {
            let Some(pattern) = rule.matcher.pattern() else {
                continue;
            };
            if !pattern.is_match(&current) {
                continue;
            }
            let replaced = match rule.action {
                RedactionAction::RejectRecord => return Err(index),
                RedactionAction::Drop => pattern.replace_all(&current, REDACTED_TEXT).into_owned(),
                RedactionAction::Hash => pattern
                    .replace_all(&current, |caps: &regex::Captures<'_>| self.digest(&caps[0]))
                    .into_owned(),
            };
            current = Cow::Owned(replaced);
        }

        Ok(match current {
            Cow::Borrowed(_) => None,
            Cow::Owned(text) => Some(text),
        })
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn reject(mut record: LogRecord, rule_index: usize, field: &str) -> Rejection {
    record.template.clear();
    record.args.clear();
    record.fields.clear();
    record.static_fields.clear();
    record.cause = None;
    record.error_code = None;

    Rejection {
        rule_index,
        field: field.to_string(),
        record,
    }
}
