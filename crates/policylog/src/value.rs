//! Typed argument values

use std::fmt;

/// Text rendered in place of a dropped value.
pub const REDACTED_TEXT: &str = "[REDACTED]";

/// A typed value attached to a log record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    I64(i64),
    /// Unsigned integer
    U64(u64),
    /// Floating point
    F64(f64),
    /// Text
    Str(String),
    /// Value removed by a DROP redaction rule
    Redacted,
}

impl Value {
    /// Structured JSON form of the value.
    ///
    /// Non-finite floats have no JSON number form and are emitted as strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::I64(n) => serde_json::Value::from(*n),
            Value::U64(n) => serde_json::Value::from(*n),
            Value::F64(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(n.to_string())),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Redacted => serde_json::Value::String(REDACTED_TEXT.to_string()),
        }
    }

    /// Whether this value was dropped by redaction.
    pub fn is_redacted(&self) -> bool {
        matches!(self, Value::Redacted)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I64(n) => write!(f, "{}", n),
            Value::U64(n) => write!(f, "{}", n),
            Value::F64(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::Redacted => f.write_str(REDACTED_TEXT),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::I64(n as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::U64(n as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::F64(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::F64(n)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A named value. The name becomes the key in the structured output.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    /// Field name
    pub name: String,
    /// Field value
    pub value: Value,
}

impl Arg {
    /// Create a named argument.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered template arguments.
///
/// Argument `N` fills placeholder `{N}`; the order is also the key order of
/// the structured `fields` object, so the most relevant identifier goes first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Arg>);

impl Args {
    /// Empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named argument.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push(Arg::new(name, value));
        self
    }

    /// Append a positional argument, named `arg<N>`.
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        let name = format!("arg{}", self.0.len());
        self.0.push(Arg::new(name, value));
        self
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying list.
    pub fn into_vec(self) -> Vec<Arg> {
        self.0
    }
}

impl From<Vec<Arg>> for Args {
    fn from(args: Vec<Arg>) -> Self {
        Self(args)
    }
}

impl FromIterator<Arg> for Args {
    fn from_iter<I: IntoIterator<Item = Arg>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Build [`Args`] from `name => value` pairs or bare positional values.
///
/// ```
/// use policylog::args;
///
/// let named = args!["user" => "u123", "attempt" => 3];
/// let positional = args!["u123", 3];
/// assert_eq!(named.len(), positional.len());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::Args::new()$(.with($name, $value))+
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Args::new()$(.push($value))+
    };
}
