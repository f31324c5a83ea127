//! Value interpreter
//!
//! Maps a decoded [`ConfigValue`] tree onto runtime [`Value`]s. Rules:
//!
//! | Input | Result |
//! |---|---|
//! | sequence / `kind: array` | each element interpreted, order kept |
//! | scalar | unchanged |
//! | `null` | `null`, or `{}` under [`NullPolicy::EmptyObject`] |
//! | mapping / `kind: object` | each entry interpreted |
//! | `kind: string \| number \| boolean` | payload passed through untouched |
//! | `kind: null \| undefined` | the literal |
//! | `kind: function` | compiled [`Callable`](crate::Callable) |

use crate::config_value::{ConfigValue, FunctionSource, Tagged};
use crate::error::ConfigError;
use crate::script::{compile_function, empty_function, synthesize_function};
use crate::value::Value;
use indexmap::IndexMap;
use tracing::debug;

/// How an untagged `null` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    /// `null` stays `null`
    #[default]
    Literal,
    /// `null` becomes an empty object (`legacyNullProps: true`)
    EmptyObject,
}

/// Interpreter for configuration values
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    null_policy: NullPolicy,
}

impl Interpreter {
    /// Interpreter with the default null policy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With null policy
    #[inline]
    #[must_use]
    pub fn with_null_policy(mut self, null_policy: NullPolicy) -> Self {
        self.null_policy = null_policy;
        self
    }

    /// Configured null policy
    #[inline]
    #[must_use]
    pub fn null_policy(&self) -> NullPolicy {
        self.null_policy
    }

    /// Interpret a value
    ///
    /// # Errors
    /// `ConfigError::Compile` when a function value fails to compile
    pub fn interpret(&self, value: &ConfigValue) -> Result<Value, ConfigError> {
        match value {
            ConfigValue::Null => Ok(match self.null_policy {
                NullPolicy::Literal => Value::Null,
                NullPolicy::EmptyObject => Value::empty_object(),
            }),
            ConfigValue::Bool(b) => Ok(Value::Bool(*b)),
            ConfigValue::Number(n) => Ok(Value::Number(*n)),
            ConfigValue::String(s) => Ok(Value::String(s.clone())),
            ConfigValue::Sequence(items) => self.interpret_all(items),
            ConfigValue::Implicit(entries) => self.interpret_entries(entries),
            ConfigValue::Tagged(tagged) => self.interpret_tagged(tagged),
        }
    }

    /// Interpret the top-level `props` field
    ///
    /// An absent or `null` field yields an empty mapping regardless of the
    /// null policy.
    ///
    /// # Errors
    /// - Any decoding or interpretation error of the tree
    /// - `ConfigError::PropsNotObject` when the result is not a mapping
    pub fn interpret_props(
        &self,
        props: Option<&serde_yaml::Value>,
    ) -> Result<IndexMap<String, Value>, ConfigError> {
        let Some(props) = props.filter(|p| !p.is_null()) else {
            return Ok(IndexMap::new());
        };
        match self.interpret(&ConfigValue::from_yaml(props)?)? {
            Value::Object(map) => Ok(map),
            other => Err(ConfigError::PropsNotObject {
                found: describe(&other),
            }),
        }
    }

    fn interpret_all(&self, items: &[ConfigValue]) -> Result<Value, ConfigError> {
        items
            .iter()
            .map(|item| self.interpret(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn interpret_entries(
        &self,
        entries: &IndexMap<String, ConfigValue>,
    ) -> Result<Value, ConfigError> {
        entries
            .iter()
            .map(|(key, value)| -> Result<_, ConfigError> {
                Ok((key.clone(), self.interpret(value)?))
            })
            .collect::<Result<IndexMap<_, _>, ConfigError>>()
            .map(Value::Object)
    }

    fn interpret_tagged(&self, tagged: &Tagged) -> Result<Value, ConfigError> {
        match tagged {
            Tagged::Object(entries) => self.interpret_entries(entries),
            Tagged::Array(items) => self.interpret_all(items),
            Tagged::Passthrough { payload, .. } => Ok(payload.clone()),
            Tagged::Null => Ok(Value::Null),
            Tagged::Undefined => Ok(Value::Undefined),
            Tagged::Function(source) => compile(source).map(Value::Function),
        }
    }
}

fn compile(source: &FunctionSource) -> Result<crate::Callable, ConfigError> {
    let callable = match source {
        FunctionSource::Spec(spec) => synthesize_function(spec).map_err(|e| {
            let text = serde_json::to_string(spec).unwrap_or_default();
            ConfigError::compile(text, e)
        })?,
        FunctionSource::Raw(text) => {
            compile_function(text).map_err(|e| ConfigError::compile(text.as_str(), e))?
        }
        FunctionSource::Empty => empty_function(),
    };
    debug!(source = callable.source(), "compiled function value");
    Ok(callable)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Array(_) => "array",
        other => other.type_of(),
    }
}
