//! Tagged configuration values
//!
//! A `props` tree mixes three shapes: plain scalars and sequences, explicitly
//! tagged values (`{kind: ..., value: ...}`) and bare nested mappings. They
//! are decoded once into the closed [`ConfigValue`] type so the interpreter
//! only ever dispatches on variants.

use crate::error::ConfigError;
use crate::value::{yaml_key, yaml_number, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as Yaml;
use std::fmt::{self, Display, Formatter};

/// Discriminator key of a tagged value
pub const KIND_KEY: &str = "kind";
/// Payload key of a tagged value
pub const VALUE_KEY: &str = "value";
/// Structured function spec key of a `function` value
pub const SPEC_KEY: &str = "spec";

/// Configuration value decoded from YAML
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// `~` / `null`
    Null,
    /// Plain boolean
    Bool(bool),
    /// Plain number
    Number(f64),
    /// Plain string
    String(String),
    /// Plain sequence
    Sequence(Vec<ConfigValue>),
    /// Mapping carrying a `kind` discriminator
    Tagged(Tagged),
    /// Mapping without a discriminator, interpreted as an object
    Implicit(IndexMap<String, ConfigValue>),
}

/// Explicitly tagged value
#[derive(Debug, Clone, PartialEq)]
pub enum Tagged {
    /// `kind: object`, entries interpreted recursively
    Object(IndexMap<String, ConfigValue>),
    /// `kind: array`, elements interpreted recursively
    Array(Vec<ConfigValue>),
    /// `kind: string | number | boolean`, payload passed through unchanged
    Passthrough {
        /// Which pass-through kind was declared
        kind: Kind,
        /// Payload, converted literally
        payload: Value,
    },
    /// `kind: null`
    Null,
    /// `kind: undefined`
    Undefined,
    /// `kind: function`
    Function(FunctionSource),
}

/// Known value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Nested mapping
    Object,
    /// Sequence
    Array,
    /// String, passed through
    String,
    /// Number, passed through
    Number,
    /// Boolean, passed through
    Boolean,
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// Callable
    Function,
}

impl Kind {
    /// All kinds
    pub const ALL: [Kind; 8] = [
        Kind::Object,
        Kind::Array,
        Kind::String,
        Kind::Number,
        Kind::Boolean,
        Kind::Null,
        Kind::Undefined,
        Kind::Function,
    ];

    /// Name as written in configuration files
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Null => "null",
            Kind::Undefined => "undefined",
            Kind::Function => "function",
        }
    }

    /// Parse discriminator
    ///
    /// # Errors
    /// `ConfigError::UnknownKind` for anything not in [`Kind::ALL`]
    pub fn parse(kind: &str) -> Result<Self, ConfigError> {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str() == kind)
            .ok_or_else(|| ConfigError::UnknownKind {
                kind: kind.to_string(),
            })
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of a `function` value
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionSource {
    /// Structured spec (takes precedence over raw source)
    Spec(FunctionSpec),
    /// Raw function source text
    Raw(String),
    /// Neither given: compiles to a no-op
    Empty,
}

/// Structured description of a function
///
/// Exactly one of `return_expressions` / `throws_message` is set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FunctionSpec {
    /// Parameter names, in order
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Statements executed before returning or throwing
    #[serde(default)]
    pub body_statements: Option<String>,
    /// Expressions joined with `,` into the returned value
    #[serde(default)]
    pub return_expressions: Option<Vec<String>>,
    /// Message of the error thrown instead of returning
    #[serde(default)]
    pub throws_message: Option<String>,
}

impl FunctionSpec {
    /// Spec returning the given expressions
    #[must_use]
    pub fn returning<I, S>(parameters: &[&str], expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parameters: parameters.iter().map(|p| (*p).to_string()).collect(),
            body_statements: None,
            return_expressions: Some(expressions.into_iter().map(Into::into).collect()),
            throws_message: None,
        }
    }

    /// Spec throwing the given message
    #[must_use]
    pub fn throwing(parameters: &[&str], message: impl Into<String>) -> Self {
        Self {
            parameters: parameters.iter().map(|p| (*p).to_string()).collect(),
            body_statements: None,
            return_expressions: None,
            throws_message: Some(message.into()),
        }
    }

    /// With body statements
    #[inline]
    #[must_use]
    pub fn with_body(mut self, statements: impl Into<String>) -> Self {
        self.body_statements = Some(statements.into());
        self
    }

    /// Check the return/throw exclusivity invariant
    ///
    /// # Errors
    /// `ConfigError::InvalidFunctionSpec` when both or neither are set, or when
    /// the return expression list is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.return_expressions, &self.throws_message) {
            (Some(_), Some(_)) => Err(ConfigError::InvalidFunctionSpec(
                "returnExpressions and throwsMessage are mutually exclusive".to_string(),
            )),
            (None, None) => Err(ConfigError::InvalidFunctionSpec(
                "one of returnExpressions or throwsMessage is required".to_string(),
            )),
            (Some(exprs), None) if exprs.is_empty() => Err(ConfigError::InvalidFunctionSpec(
                "returnExpressions must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl ConfigValue {
    /// Decode a YAML tree
    ///
    /// # Errors
    /// - `ConfigError::UnknownKind` for an unsupported discriminator
    /// - `ConfigError::InvalidPayload` for a payload of the wrong shape
    /// - `ConfigError::InvalidFunctionSpec` for a malformed `spec`
    pub fn from_yaml(value: &Yaml) -> Result<Self, ConfigError> {
        match value {
            Yaml::Null => Ok(Self::Null),
            Yaml::Bool(b) => Ok(Self::Bool(*b)),
            Yaml::Number(n) => Ok(Self::Number(yaml_number(n))),
            Yaml::String(s) => Ok(Self::String(s.clone())),
            Yaml::Sequence(items) => items
                .iter()
                .map(Self::from_yaml)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Sequence),
            Yaml::Mapping(map) => match map.get(KIND_KEY) {
                Some(Yaml::String(kind)) => decode_tagged(Kind::parse(kind)?, map).map(Self::Tagged),
                _ => decode_entries(map).map(Self::Implicit),
            },
            Yaml::Tagged(tagged) => Self::from_yaml(&tagged.value),
        }
    }

    /// Whether this value is a mapping (tagged or not)
    #[inline]
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Sequence(_) | Self::Tagged(_) | Self::Implicit(_))
    }
}

fn decode_entries(map: &serde_yaml::Mapping) -> Result<IndexMap<String, ConfigValue>, ConfigError> {
    map.iter()
        .map(|(k, v)| -> Result<_, ConfigError> { Ok((yaml_key(k), ConfigValue::from_yaml(v)?)) })
        .collect()
}

fn decode_tagged(kind: Kind, map: &serde_yaml::Mapping) -> Result<Tagged, ConfigError> {
    let payload = map.get(VALUE_KEY);
    match kind {
        Kind::Object => match payload {
            None | Some(Yaml::Null) => Ok(Tagged::Object(IndexMap::new())),
            Some(Yaml::Mapping(entries)) => decode_entries(entries).map(Tagged::Object),
            Some(_) => Err(ConfigError::InvalidPayload {
                kind: kind.as_str(),
                expected: "a mapping",
            }),
        },
        Kind::Array => match payload {
            None | Some(Yaml::Null) => Ok(Tagged::Array(Vec::new())),
            Some(Yaml::Sequence(items)) => items
                .iter()
                .map(ConfigValue::from_yaml)
                .collect::<Result<Vec<_>, _>>()
                .map(Tagged::Array),
            Some(_) => Err(ConfigError::InvalidPayload {
                kind: kind.as_str(),
                expected: "a sequence",
            }),
        },
        Kind::String | Kind::Number | Kind::Boolean => Ok(Tagged::Passthrough {
            kind,
            payload: payload.map_or(Value::Undefined, Value::from_yaml_literal),
        }),
        Kind::Null => Ok(Tagged::Null),
        Kind::Undefined => Ok(Tagged::Undefined),
        Kind::Function => decode_function(map).map(Tagged::Function),
    }
}

fn decode_function(map: &serde_yaml::Mapping) -> Result<FunctionSource, ConfigError> {
    if let Some(spec) = map.get(SPEC_KEY).filter(|s| !s.is_null()) {
        let spec: FunctionSpec = serde_yaml::from_value(spec.clone())
            .map_err(|e| ConfigError::InvalidFunctionSpec(e.to_string()))?;
        spec.validate()?;
        return Ok(FunctionSource::Spec(spec));
    }
    match map.get(VALUE_KEY) {
        None | Some(Yaml::Null) => Ok(FunctionSource::Empty),
        Some(Yaml::String(source)) => Ok(FunctionSource::Raw(source.clone())),
        Some(_) => Err(ConfigError::InvalidPayload {
            kind: Kind::Function.as_str(),
            expected: "function source text",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Result<ConfigValue, ConfigError> {
        let yaml: Yaml = serde_yaml::from_str(text).unwrap();
        ConfigValue::from_yaml(&yaml)
    }

    #[test]
    fn untagged_mapping_is_implicit_object() {
        let value = decode("a: 1\nb: {c: x}").unwrap();
        let ConfigValue::Implicit(entries) = value else {
            panic!("expected implicit object");
        };
        assert_eq!(entries["a"], ConfigValue::Number(1.0));
        assert!(matches!(entries["b"], ConfigValue::Implicit(_)));
    }

    #[test]
    fn tagged_string_keeps_payload_literally() {
        let value = decode("{kind: string, value: {kind: number, value: 3}}").unwrap();
        let ConfigValue::Tagged(Tagged::Passthrough { kind, payload }) = value else {
            panic!("expected passthrough");
        };
        assert_eq!(kind, Kind::String);
        assert!(matches!(payload, Value::Object(_)));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = decode("{kind: date, value: 2020-01-01}").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKind { ref kind } if kind == "date"));
        assert_eq!(err.to_string(), "unrecognized value kind 'date'");
    }

    #[test]
    fn non_string_kind_is_an_ordinary_entry() {
        let value = decode("{kind: 3, value: 4}").unwrap();
        assert!(matches!(value, ConfigValue::Implicit(_)));
    }

    #[test]
    fn object_payload_must_be_mapping() {
        let err = decode("{kind: object, value: [1]}").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPayload { kind: "object", .. }));
    }

    #[test]
    fn function_spec_takes_precedence_over_source() {
        let value = decode(
            "{kind: function, value: '() => 2', spec: {parameters: [a], returnExpressions: [a]}}",
        )
        .unwrap();
        let ConfigValue::Tagged(Tagged::Function(FunctionSource::Spec(spec))) = value else {
            panic!("expected spec");
        };
        assert_eq!(spec.parameters, vec!["a".to_string()]);
    }

    #[test]
    fn function_without_source_is_empty() {
        let value = decode("{kind: function}").unwrap();
        assert_eq!(value, ConfigValue::Tagged(Tagged::Function(FunctionSource::Empty)));
    }

    #[test]
    fn function_spec_requires_exactly_one_outcome() {
        let both = decode(
            "{kind: function, spec: {returnExpressions: ['1'], throwsMessage: boom}}",
        );
        assert!(matches!(both, Err(ConfigError::InvalidFunctionSpec(_))));

        let neither = decode("{kind: function, spec: {parameters: [a]}}");
        assert!(matches!(neither, Err(ConfigError::InvalidFunctionSpec(_))));

        let unknown_field = decode("{kind: function, spec: {returns: ['1']}}");
        assert!(matches!(unknown_field, Err(ConfigError::InvalidFunctionSpec(_))));
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::parse(kind.as_str()).unwrap(), kind);
        }
    }
}
