//! Function language
//!
//! Function-valued props are compiled into [`Callable`]s. The language is a
//! side-effect free subset of the component framework's own language: arrow
//! and `function` expressions, `const`/`let` declarations, assignments,
//! `if`/`return`/`throw`, the usual operators, member access, calls of other
//! callables and `new Error(...)`. A callable sees only its parameters, its own
//! declarations and the values it captured when it was created.

mod ast;
mod eval;
mod lexer;
mod parser;

use crate::config_value::FunctionSpec;
use crate::value::{quote_json, Value};
use std::fmt;
use std::sync::Arc;

pub(crate) use eval::Scope;

/// Source of the no-op callable produced for a `function` value without source
pub const EMPTY_FUNCTION_SOURCE: &str = "() => {}";

/// Compilation failure with the byte offset it was detected at
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at offset {offset})")]
pub struct CompileError {
    message: String,
    offset: usize,
}

impl CompileError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }

    /// Diagnostic text
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset into the compiled source
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Value thrown out of a callable
///
/// Runtime failures (`ReferenceError`, `TypeError`, `RangeError`) are thrown
/// as error objects with `name` and `message` entries, the same shape
/// `new Error(message)` produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Thrown {
    value: Value,
}

impl Thrown {
    /// Wrap a thrown value
    #[inline]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Thrown value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Error name (`Error`, `TypeError`, ...) when an error object was thrown
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.value {
            Value::Object(map) => match map.get("name") {
                Some(Value::String(name)) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Error message, or the string form of a non-error value
    #[must_use]
    pub fn message(&self) -> String {
        match &self.value {
            Value::Object(map) if map.contains_key("message") => map
                .get("message")
                .map(Value::to_display_string)
                .unwrap_or_default(),
            other => other.to_display_string(),
        }
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}: {}", self.message()),
            None => write!(f, "{}", self.message()),
        }
    }
}

impl std::error::Error for Thrown {}

/// Compiled function
///
/// Cloning shares the compiled body; equality is identity.
#[derive(Clone)]
pub struct Callable {
    inner: Arc<Closure>,
}

struct Closure {
    function: Arc<ast::Function>,
    captured: Scope,
}

impl Callable {
    pub(crate) fn new(function: Arc<ast::Function>, captured: Scope) -> Self {
        Self {
            inner: Arc::new(Closure { function, captured }),
        }
    }

    pub(crate) fn function(&self) -> &ast::Function {
        &self.inner.function
    }

    pub(crate) fn captured(&self) -> &Scope {
        &self.inner.captured
    }

    /// Source text the callable renders as
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.inner.function.source
    }

    /// Declared parameter names
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[String] {
        &self.inner.function.params
    }

    /// Invoke with arguments; missing arguments are `undefined`
    ///
    /// # Errors
    /// The thrown value, for explicit `throw` statements and runtime failures
    pub fn call(&self, args: &[Value]) -> Result<Value, Thrown> {
        eval::invoke(self, args, 0)
    }

    /// Whether both handles refer to the same compiled closure
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("source", &self.source())
            .finish()
    }
}

/// Compile raw function source (`(a) => a + 1`, `function (e) { ... }`)
///
/// # Errors
/// `CompileError` when the text is not exactly one function expression of the
/// supported language
pub fn compile_function(source: &str) -> Result<Callable, CompileError> {
    let function = parser::parse_function(source)?;
    Ok(Callable::new(Arc::new(function), Scope::new()))
}

/// The no-op callable `() => {}`
#[must_use]
pub fn empty_function() -> Callable {
    let function = ast::Function {
        params: Vec::new(),
        body: ast::FunctionBody::Block(Vec::new()),
        source: EMPTY_FUNCTION_SOURCE.to_string(),
    };
    Callable::new(Arc::new(function), Scope::new())
}

/// Build a callable from a structured spec
///
/// The synthesized source runs `bodyStatements`, then either returns the
/// comma-joined `returnExpressions` or throws `new Error(throwsMessage)`.
///
/// # Errors
/// `CompileError` for invalid parameter names or fragments that do not parse
pub fn synthesize_function(spec: &FunctionSpec) -> Result<Callable, CompileError> {
    for parameter in &spec.parameters {
        if !parser::is_bindable_identifier(parameter) {
            return Err(CompileError::new(
                format!("invalid parameter name '{parameter}'"),
                0,
            ));
        }
    }

    let body = spec
        .body_statements
        .as_deref()
        .map(str::trim)
        .filter(|body| !body.is_empty());
    if let Some(body) = body {
        parser::parse_statements(body)?;
    }

    let outcome = match (&spec.return_expressions, &spec.throws_message) {
        (Some(expressions), _) => {
            for expression in expressions {
                parser::parse_expression(expression)?;
            }
            format!("return {};", expressions.join(", "))
        }
        (None, Some(message)) => format!("throw new Error({});", quote_json(message)),
        (None, None) => String::new(),
    };

    let mut source = format!("({}) => {{ ", spec.parameters.join(", "));
    if let Some(body) = body {
        source.push_str(body);
        source.push('\n');
    }
    source.push_str(&outcome);
    source.push_str(" }");
    compile_function(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_source_layout() {
        let spec = FunctionSpec::returning(&["a", "b"], ["a", "b"]).with_body("const c = 1");
        let callable = synthesize_function(&spec).unwrap();
        assert_eq!(callable.source(), "(a, b) => { const c = 1\nreturn a, b; }");
        assert_eq!(callable.parameters(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn throwing_spec_quotes_message() {
        let spec = FunctionSpec::throwing(&[], "say \"no\"");
        let callable = synthesize_function(&spec).unwrap();
        assert_eq!(callable.source(), r#"() => { throw new Error("say \"no\""); }"#);
        let thrown = callable.call(&[]).unwrap_err();
        assert_eq!(thrown.message(), "say \"no\"");
        assert_eq!(thrown.name(), Some("Error"));
        assert_eq!(thrown.to_string(), "Error: say \"no\"");
    }

    #[test]
    fn invalid_fragments_are_rejected_individually() {
        let bad_param = FunctionSpec::returning(&["1a"], ["1"]);
        assert!(synthesize_function(&bad_param).is_err());

        // Would otherwise splice into the surrounding source
        let escaping = FunctionSpec::returning(&[], ["1 }; ({"]);
        assert!(synthesize_function(&escaping).is_err());
    }

    #[test]
    fn empty_function_returns_undefined() {
        let callable = empty_function();
        assert_eq!(callable.source(), EMPTY_FUNCTION_SOURCE);
        assert_eq!(callable.call(&[Value::Number(1.0)]).unwrap(), Value::Undefined);
    }

    #[test]
    fn clones_share_identity() {
        let a = compile_function("() => 1").unwrap();
        let b = a.clone();
        let c = compile_function("() => 1").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
