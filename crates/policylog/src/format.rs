//! Template rendering and JSON line formatting

use crate::record::LogRecord;
use crate::value::Arg;
use chrono::SecondsFormat;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeSet;

/// Keys written by the formatter itself. Static fields may not shadow them.
pub const RESERVED_KEYS: &[&str] = &[
    "timestamp",
    "level",
    "category",
    "message",
    "template",
    "host_id",
    "process_id",
    "thread_id",
    "request_id",
    "correlation_id",
    "error_code",
    "fields",
    "cause",
    "format_error",
];

/// Placeholder count versus argument count of a malformed template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMismatch {
    /// Distinct placeholder indices in the template
    pub placeholders: usize,
    /// Arguments supplied
    pub args: usize,
}

impl FormatMismatch {
    /// The marker embedded in the rendered message.
    pub fn marker(&self) -> String {
        format!(
            "[FORMAT_MISMATCH placeholders={} args={}]",
            self.placeholders, self.args
        )
    }
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Message text with placeholders substituted
    pub text: String,
    /// Present when the template and arguments disagree
    pub mismatch: Option<FormatMismatch>,
}

pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Placeholder { index: usize, raw: &'a str },
}

pub(crate) fn parse_template(template: &str) -> Vec<Segment<'_>> {
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                segments.push(Segment::Literal(&template[literal_start..i]));
                segments.push(Segment::Brace('{'));
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                segments.push(Segment::Literal(&template[literal_start..i]));
                segments.push(Segment::Brace('}'));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let digits_end = bytes[i + 1..]
                    .iter()
                    .position(|b| !b.is_ascii_digit())
                    .map(|p| i + 1 + p)
                    .unwrap_or(bytes.len());
                let closed = digits_end > i + 1 && bytes.get(digits_end) == Some(&b'}');
                let index = if closed {
                    template[i + 1..digits_end].parse::<usize>().ok()
                } else {
                    None
                };
                match index {
                    Some(index) => {
                        segments.push(Segment::Literal(&template[literal_start..i]));
                        segments.push(Segment::Placeholder {
                            index,
                            raw: &template[i..=digits_end],
                        });
                        i = digits_end + 1;
                        literal_start = i;
                    }
                    None => i += 1,
                }
            }
            _ => i += 1,
        }
    }

    segments.push(Segment::Literal(&template[literal_start..]));
    segments
}

/// Substitute `{N}` placeholders with the display form of argument `N`.
///
/// `{{` and `}}` produce literal braces; any other brace text is copied as
/// is. A template is well-formed when its distinct placeholder indices are
/// exactly `0..args.len()`. Otherwise exactly one mismatch marker is placed,
/// at the first unmatched placeholder or after the message when every
/// placeholder was satisfied.
pub fn render_message(template: &str, args: &[Arg]) -> RenderedMessage {
    let segments = parse_template(template);

    let indices: BTreeSet<usize> = segments
        .iter()
        .filter_map(|s| match s {
            Segment::Placeholder { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    let well_formed = indices.len() == args.len() && indices.iter().all(|i| *i < args.len());
    let mismatch = (!well_formed).then_some(FormatMismatch {
        placeholders: indices.len(),
        args: args.len(),
    });

    let mut text = String::with_capacity(template.len() + args.len() * 8);
    let mut marker_placed = false;

    for segment in &segments {
        match segment {
            Segment::Literal(s) => text.push_str(s),
            Segment::Brace(c) => text.push(*c),
            Segment::Placeholder { index, raw } => match args.get(*index) {
                Some(arg) => text.push_str(&arg.value.to_string()),
                None if !marker_placed => {
                    if let Some(mismatch) = &mismatch {
                        text.push_str(&mismatch.marker());
                    }
                    marker_placed = true;
                }
                None => text.push_str(raw),
            },
        }
    }

    if let (Some(mismatch), false) = (&mismatch, marker_placed) {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&mismatch.marker());
    }

    RenderedMessage { text, mismatch }
}

/// Renders a record into one self-contained line.
pub trait LogFormatter: Send + Sync {
    /// Render a record. Never panics on malformed templates.
    fn render(&self, record: &LogRecord) -> String;
}

/// One compact JSON object per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Create a new JSON formatter.
    pub fn new() -> Self {
        Self
    }

    /// Build the JSON object for a record.
    pub fn to_object(&self, record: &LogRecord) -> Map<String, JsonValue> {
        let rendered = render_message(&record.template, &record.args);

        let mut obj = Map::new();
        obj.insert(
            "timestamp".into(),
            json!(record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, false)),
        );
        obj.insert("level".into(), json!(record.level.as_str()));
        obj.insert("category".into(), json!(record.category));
        obj.insert("message".into(), json!(rendered.text));
        obj.insert("template".into(), json!(record.template));
        obj.insert("host_id".into(), json!(record.host_id));
        obj.insert("process_id".into(), json!(record.process_id));
        obj.insert("thread_id".into(), json!(record.thread_id));

        if let Some(ref request_id) = record.request_id {
            obj.insert("request_id".into(), json!(request_id));
        }
        if let Some(ref correlation_id) = record.correlation_id {
            obj.insert("correlation_id".into(), json!(correlation_id));
        }
        if let Some(ref error_code) = record.error_code {
            obj.insert("error_code".into(), json!(error_code));
        }

        for field in &record.static_fields {
            if RESERVED_KEYS.contains(&field.name.as_str()) || field.value.is_redacted() {
                continue;
            }
            obj.insert(field.name.clone(), field.value.to_json());
        }

        // Caller order is preserved, so the subject identifier stays first
        let mut fields = Map::new();
        for arg in record.args.iter().chain(record.fields.iter()) {
            if arg.value.is_redacted() {
                continue;
            }
            fields.insert(arg.name.clone(), arg.value.to_json());
        }
        obj.insert("fields".into(), JsonValue::Object(fields));

        if let Some(ref cause) = record.cause {
            let links = serde_json::to_value(cause).unwrap_or_else(|_| json!([]));
            obj.insert("cause".into(), links);
        }

        if let Some(mismatch) = rendered.mismatch {
            obj.insert(
                "format_error".into(),
                json!({
                    "placeholders": mismatch.placeholders,
                    "args": mismatch.args,
                }),
            );
        }

        obj
    }
}

impl LogFormatter for JsonFormatter {
    fn render(&self, record: &LogRecord) -> String {
        serde_json::to_string(&self.to_object(record)).unwrap_or_else(|_| {
            format!(
                r#"{{"level":"{}","category":"policylog.diagnostic","message":"record serialization failed"}}"#,
                record.level.as_str()
            )
        })
    }
}
