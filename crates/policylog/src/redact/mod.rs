//! Redaction of sensitive fields
//!
//! Rules are evaluated in declaration order and the first match wins. Field
//! names that denote session identifiers are always hashed at minimum, even
//! when no rule mentions them.

mod redactor;
mod rule;

pub use redactor::{Redactor, Rejection, Scrubbed, DIGEST_PREFIX};
pub use rule::{is_session_field, FieldMatcher, RedactionAction, RedactionRule};
