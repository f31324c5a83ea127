//! Tree-walking evaluator

use super::ast::{BinaryOp, ErrorKind, Expr, FunctionBody, LogicalOp, Stmt, UnaryOp};
use super::{Callable, Thrown};
use crate::value::Value;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::sync::Arc;

/// Nested calls beyond this depth throw a `RangeError`
pub(crate) const MAX_CALL_DEPTH: usize = 256;

/// Variables visible to a callable, innermost declaration last
pub(crate) type Scope = IndexMap<String, Binding>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Binding {
    value: Value,
    mutable: bool,
}

enum Flow {
    Normal,
    Return(Value),
}

type Completion<T> = Result<T, Thrown>;

/// Build an error object `{name, message}`
pub(crate) fn error_object(name: &str, message: impl Into<String>) -> Value {
    let mut map = IndexMap::new();
    map.insert("name".to_string(), Value::String(name.to_string()));
    map.insert("message".to_string(), Value::String(message.into()));
    Value::Object(map)
}

fn throw<T>(name: &str, message: impl Into<String>) -> Completion<T> {
    Err(Thrown::new(error_object(name, message)))
}

pub(crate) fn invoke(callable: &Callable, args: &[Value], depth: usize) -> Completion<Value> {
    if depth >= MAX_CALL_DEPTH {
        return throw(ErrorKind::RangeError.name(), "Maximum call stack size exceeded");
    }
    let function = callable.function();
    let parameters: Scope = function
        .params
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let value = args.get(i).cloned().unwrap_or_default();
            (name.clone(), Binding { value, mutable: true })
        })
        .collect();

    let mut env = Env {
        frames: vec![callable.captured().clone(), parameters],
        depth,
    };
    match &function.body {
        FunctionBody::Expr(expr) => env.eval(expr),
        FunctionBody::Block(statements) => match env.exec_all(statements)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Undefined),
        },
    }
}

struct Env {
    frames: Vec<Scope>,
    depth: usize,
}

impl Env {
    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    fn current_frame(&mut self) -> &mut Scope {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Flatten visible bindings for a closure created here
    fn capture(&self) -> Scope {
        let mut scope = Scope::new();
        for frame in &self.frames {
            for (name, binding) in frame {
                scope.insert(name.clone(), binding.clone());
            }
        }
        scope
    }

    // ---- statements ----

    fn exec_all(&mut self, statements: &[Stmt]) -> Completion<Flow> {
        for statement in statements {
            if let Flow::Return(value) = self.exec(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, statement: &Stmt) -> Completion<Flow> {
        match statement {
            Stmt::Declare {
                declarations,
                mutable,
            } => {
                for (name, init) in declarations {
                    let value = match init {
                        Some(expr) => self.eval(expr)?,
                        None => Value::Undefined,
                    };
                    let frame = self.current_frame();
                    if frame.contains_key(name) {
                        return throw(
                            "SyntaxError",
                            format!("Identifier '{name}' has already been declared"),
                        );
                    }
                    frame.insert(
                        name.clone(),
                        Binding {
                            value,
                            mutable: *mutable,
                        },
                    );
                }
                Ok(Flow::Normal)
            }
            Stmt::Assign { name, value } => {
                let value = self.eval(value)?;
                let Some(binding) = self
                    .frames
                    .iter_mut()
                    .rev()
                    .find_map(|frame| frame.get_mut(name))
                else {
                    return throw("ReferenceError", format!("{name} is not defined"));
                };
                if !binding.mutable {
                    return throw(ErrorKind::TypeError.name(), "Assignment to constant variable.");
                }
                binding.value = value;
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Throw(expr) => Err(Thrown::new(self.eval(expr)?)),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.to_boolean() {
                    self.exec(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(statements) => {
                self.frames.push(Scope::new());
                let flow = self.exec_all(statements);
                self.frames.pop();
                flow
            }
            Stmt::Empty => Ok(Flow::Normal),
        }
    }

    // ---- expressions ----

    fn eval(&mut self, expr: &Expr) -> Completion<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Ident(name) => match self.lookup(name) {
                Some(binding) => Ok(binding.value.clone()),
                None => throw("ReferenceError", format!("{name} is not defined")),
            },
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Completion<Vec<_>>>()
                .map(Value::Array),
            Expr::Object(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    let value = self.eval(value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                let key = self.eval(property)?.to_display_string();
                member(&object, &key)
            }
            Expr::Call { callee, args } => {
                let function = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Completion<Vec<_>>>()?;
                match function {
                    Value::Function(callable) => invoke(&callable, &args, self.depth + 1),
                    _ => throw(
                        ErrorKind::TypeError.name(),
                        format!("{} is not a function", describe(callee)),
                    ),
                }
            }
            Expr::NewError { kind, args } => {
                let message = match args.first() {
                    Some(arg) => match self.eval(arg)? {
                        Value::Undefined => String::new(),
                        other => other.to_display_string(),
                    },
                    None => String::new(),
                };
                for arg in args.iter().skip(1) {
                    self.eval(arg)?;
                }
                Ok(error_object(kind.name(), message))
            }
            Expr::Unary { op, operand } => self.unary(*op, operand),
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.to_boolean(),
                    LogicalOp::Or => left.to_boolean(),
                    LogicalOp::Nullish => !matches!(left, Value::Null | Value::Undefined),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.to_boolean() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Sequence(items) => {
                let mut last = Value::Undefined;
                for item in items {
                    last = self.eval(item)?;
                }
                Ok(last)
            }
            Expr::Function(function) => Ok(Value::Function(Callable::new(
                Arc::clone(function),
                self.capture(),
            ))),
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> Completion<Value> {
        // typeof tolerates undeclared names
        if let (UnaryOp::TypeOf, Expr::Ident(name)) = (op, operand) {
            let type_name = self
                .lookup(name)
                .map_or("undefined", |binding| binding.value.type_of());
            return Ok(Value::from(type_name));
        }
        let value = self.eval(operand)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.to_boolean()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::TypeOf => Value::from(value.type_of()),
        })
    }
}

fn member(object: &Value, key: &str) -> Completion<Value> {
    let value = match object {
        Value::Undefined | Value::Null => {
            return throw(
                ErrorKind::TypeError.name(),
                format!(
                    "Cannot read properties of {} (reading '{key}')",
                    object.to_display_string()
                ),
            );
        }
        Value::Array(items) => {
            if key == "length" {
                length(items.len())
            } else {
                array_index(key)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default()
            }
        }
        Value::String(s) => {
            if key == "length" {
                length(s.encode_utf16().count())
            } else {
                array_index(key)
                    .and_then(|i| s.encode_utf16().nth(i))
                    .map(|unit| Value::String(String::from_utf16_lossy(&[unit])))
                    .unwrap_or_default()
            }
        }
        Value::Object(map) => map.get(key).cloned().unwrap_or_default(),
        Value::Function(callable) if key == "length" => length(callable.parameters().len()),
        Value::Bool(_) | Value::Number(_) | Value::Function(_) => Value::Undefined,
    };
    Ok(value)
}

#[allow(clippy::cast_precision_loss)]
fn length(n: usize) -> Value {
    Value::Number(n as f64)
}

/// Canonical array index (`"0"`, `"12"`, not `"01"`)
fn array_index(key: &str) -> Option<usize> {
    key.parse::<usize>()
        .ok()
        .filter(|index| index.to_string() == key)
}

/// Objects take part in `+` and comparisons through their string form
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) | Value::Function(_) => {
            Value::String(value.to_display_string())
        }
        other => other.clone(),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let left = to_primitive(left);
            let right = to_primitive(right);
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Value::String(left.to_display_string() + &right.to_display_string())
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
    }
}

/// Relational comparison; `None` when either side is `NaN`
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (to_primitive(left), to_primitive(right)) {
        (Value::String(a), Value::String(b)) => Some(a.encode_utf16().cmp(b.encode_utf16())),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

/// Short description of a callee for diagnostics
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member { object, property } => match property.as_ref() {
            Expr::Str(name) => format!("{}.{name}", describe(object)),
            _ => format!("{}[...]", describe(object)),
        },
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::script::compile_function;
    use crate::value::Value;

    fn run(source: &str, args: &[Value]) -> Value {
        compile_function(source).unwrap().call(args).unwrap()
    }

    fn run_err(source: &str) -> (Option<String>, String) {
        let thrown = compile_function(source).unwrap().call(&[]).unwrap_err();
        (thrown.name().map(str::to_string), thrown.message())
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(run("() => 1 + 2 * 3", &[]), Value::Number(7.0));
        assert_eq!(run("(a) => a + 1", &[Value::from("x")]), Value::from("x1"));
        assert_eq!(run("() => [1, 2] + ''", &[]), Value::from("1,2"));
        assert_eq!(run("() => 7 % 3", &[]), Value::Number(1.0));
        assert_eq!(run("() => 'b' > 'a'", &[]), Value::Bool(true));
    }

    #[test]
    fn missing_arguments_are_undefined() {
        assert_eq!(run("(a, b) => b", &[Value::Number(1.0)]), Value::Undefined);
    }

    #[test]
    fn block_bodies_and_scopes() {
        let source = "(n) => {
            let total = 0
            if (n > 2) { const bonus = 10; total = bonus }
            else total = 1
            return total + n
        }";
        assert_eq!(run(source, &[Value::Number(3.0)]), Value::Number(13.0));
        assert_eq!(run(source, &[Value::Number(1.0)]), Value::Number(2.0));
    }

    #[test]
    fn closures_capture_by_value() {
        let source = "() => { const base = 2; const f = (x) => x * base; return f(21) }";
        assert_eq!(run(source, &[]), Value::Number(42.0));
    }

    #[test]
    fn member_access() {
        assert_eq!(run("(e) => e.target.value", &[{
            let mut target = indexmap::IndexMap::new();
            target.insert("value".to_string(), Value::from("typed"));
            let mut event = indexmap::IndexMap::new();
            event.insert("target".to_string(), Value::Object(target));
            Value::Object(event)
        }]), Value::from("typed"));
        assert_eq!(run("() => [4, 5, 6][1]", &[]), Value::Number(5.0));
        assert_eq!(run("() => 'héllo'.length", &[]), Value::Number(5.0));
        assert_eq!(run("() => ({a: 1}).b", &[]), Value::Undefined);
    }

    #[test]
    fn runtime_errors_are_thrown_objects() {
        assert_eq!(
            run_err("() => missing"),
            (Some("ReferenceError".into()), "missing is not defined".into())
        );
        assert_eq!(
            run_err("() => { undeclared = 1 }"),
            (Some("ReferenceError".into()), "undeclared is not defined".into())
        );
        assert_eq!(
            run_err("() => { const a = 1; a = 2 }"),
            (Some("TypeError".into()), "Assignment to constant variable.".into())
        );
        assert_eq!(
            run_err("() => null.x"),
            (Some("TypeError".into()), "Cannot read properties of null (reading 'x')".into())
        );
        assert_eq!(
            run_err("() => (1)()"),
            (Some("TypeError".into()), "expression is not a function".into())
        );
    }

    #[test]
    fn typeof_tolerates_undeclared_names() {
        assert_eq!(run("() => typeof window", &[]), Value::from("undefined"));
        assert_eq!(run("(f) => typeof f", &[Value::Null]), Value::from("object"));
    }

    #[test]
    fn throw_any_value() {
        let thrown = compile_function("() => { throw 'plain' }")
            .unwrap()
            .call(&[])
            .unwrap_err();
        assert_eq!(thrown.value(), &Value::from("plain"));
        assert_eq!(thrown.name(), None);
    }

    #[test]
    fn deep_recursion_is_a_range_error() {
        let source = "() => { const loop = (f) => f(f); return loop(loop) }";
        let (name, message) = run_err(source);
        assert_eq!(name.as_deref(), Some("RangeError"));
        assert_eq!(message, "Maximum call stack size exceeded");
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(run("() => null ?? 'd'", &[]), Value::from("d"));
        assert_eq!(run("() => 0 || 'x'", &[]), Value::from("x"));
        assert_eq!(run("() => 0 && missing", &[]), Value::Number(0.0));
        assert_eq!(run("() => (1, 2, 3)", &[]), Value::Number(3.0));
    }
}
