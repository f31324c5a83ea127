//! Runtime values
//!
//! [`Value`] mirrors the value space of the component framework's language:
//! the interpreter produces it, the function language computes with it, and the
//! code generator renders it back into source text.

use crate::script::Callable;
use indexmap::IndexMap;
use std::fmt::{self, Write as _};

/// Runtime value produced by the interpreter
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// IEEE-754 double, like every number in the target language
    Number(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list
    Array(Vec<Value>),
    /// Insertion-ordered mapping
    Object(IndexMap<String, Value>),
    /// Compiled function
    Function(Callable),
}

impl Value {
    /// Empty object
    #[inline]
    #[must_use]
    pub fn empty_object() -> Self {
        Self::Object(IndexMap::new())
    }

    /// Convert a YAML tree literally, without tag interpretation
    ///
    /// Used for pass-through payloads (`kind: string`, `kind: number`, ...)
    /// and for style entries.
    #[must_use]
    pub fn from_yaml_literal(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;
        match value {
            Yaml::Null => Self::Null,
            Yaml::Bool(b) => Self::Bool(*b),
            Yaml::Number(n) => Self::Number(yaml_number(n)),
            Yaml::String(s) => Self::String(s.clone()),
            Yaml::Sequence(items) => Self::Array(items.iter().map(Self::from_yaml_literal).collect()),
            Yaml::Mapping(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (yaml_key(k), Self::from_yaml_literal(v)))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => Self::from_yaml_literal(&tagged.value),
        }
    }

    /// `typeof` operator result
    #[must_use]
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null | Self::Array(_) | Self::Object(_) => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
        }
    }

    /// Truthiness
    #[must_use]
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Function(_) => true,
        }
    }

    /// Numeric conversion
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined | Self::Object(_) | Self::Function(_) => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => parse_numeric_string(s),
            Self::Array(_) => parse_numeric_string(&self.to_display_string()),
        }
    }

    /// String conversion (`String(value)`)
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Array(items) => items
                .iter()
                .map(|item| match item {
                    Self::Undefined | Self::Null => String::new(),
                    other => other.to_display_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Object(_) => "[object Object]".to_string(),
            Self::Function(callable) => callable.source().to_string(),
        }
    }

    /// `JSON.stringify` equivalent
    ///
    /// Returns `None` where `JSON.stringify` returns `undefined` (top-level
    /// `undefined` or function). Nested functions and `undefined` are dropped
    /// from objects and become `null` inside arrays.
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        let mut out = String::new();
        if write_json(self, &mut out) {
            Some(out)
        } else {
            None
        }
    }

    /// Source-code form of the value
    ///
    /// `null`/`undefined` print as keywords, functions as their own source,
    /// everything else through [`Value::to_json`].
    #[must_use]
    pub fn to_code_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Function(callable) => callable.source().to_string(),
            other => other.to_json().unwrap_or_else(|| "undefined".to_string()),
        }
    }

    /// Strict equality (`===`)
    ///
    /// Arrays and objects compare structurally since runtime values are not
    /// reference-counted; functions compare by identity.
    #[must_use]
    pub fn strict_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => self == other,
        }
    }

    /// Loose equality (`==`)
    #[must_use]
    pub fn loose_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined | Self::Null, Self::Undefined | Self::Null) => true,
            (Self::Undefined | Self::Null, _) | (_, Self::Undefined | Self::Null) => false,
            (Self::Number(_), Self::String(_))
            | (Self::String(_), Self::Number(_))
            | (Self::Bool(_), _)
            | (_, Self::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_equals(other),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_code_string())
    }
}

/// Format a number the way `Number.prototype.toString` does
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        // Exponent notation always carries an explicit sign
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }
    if n.fract() == 0.0 {
        return (n as i128).to_string();
    }
    n.to_string()
}

/// Convert YAML number to f64
#[allow(clippy::cast_precision_loss)]
pub(crate) fn yaml_number(n: &serde_yaml::Number) -> f64 {
    if let Some(i) = n.as_i64() {
        i as f64
    } else if let Some(u) = n.as_u64() {
        u as f64
    } else {
        n.as_f64().unwrap_or(f64::NAN)
    }
}

/// Object keys are always strings; scalars are stringified like property keys
pub(crate) fn yaml_key(key: &serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;
    match key {
        Yaml::String(s) => s.clone(),
        Yaml::Null => "null".to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => format_number(yaml_number(n)),
        Yaml::Tagged(tagged) => yaml_key(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn parse_numeric_string(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    // Rust accepts "inf"/"nan" spellings that the target language rejects
    if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn write_json(value: &Value, out: &mut String) -> bool {
    match value {
        Value::Undefined | Value::Function(_) => return false,
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Number(n) => {
            if n.is_finite() {
                out.push_str(&format_number(*n));
            } else {
                out.push_str("null");
            }
        }
        Value::String(s) => out.push_str(&quote_json(s)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if !write_json(item, out) {
                    out.push_str("null");
                }
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            let mut first = true;
            for (key, item) in map {
                if matches!(item, Value::Undefined | Value::Function(_)) {
                    continue;
                }
                if !first {
                    out.push(',');
                }
                first = false;
                out.push_str(&quote_json(key));
                out.push(':');
                write_json(item, out);
            }
            out.push('}');
        }
    }
    true
}

/// Quote a string as a JSON string literal
#[must_use]
pub(crate) fn quote_json(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}
