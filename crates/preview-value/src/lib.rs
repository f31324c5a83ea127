//! Preview Value Interpreter
//!
//! Turns the `props` tree of a `preview.yaml` file into runtime values that can
//! be rendered as source code, and compiles function-valued props into
//! [`Callable`]s backed by a small, side-effect free expression language.
//!
//! # Pipeline
//!
//! ```text
//! serde_yaml::Value → ConfigValue (tag dispatch) → Interpreter → Value
//!                                                     ↓
//!                                       script::compile (functions only)
//! ```
//!
//! # Example
//!
//! ```rust
//! use preview_value::{ConfigValue, Interpreter, Value};
//!
//! let yaml: serde_yaml::Value = serde_yaml::from_str(
//!     "onClick: {kind: function, spec: {parameters: [], returnExpressions: ['1']}}",
//! )
//! .unwrap();
//! let config = ConfigValue::from_yaml(&yaml).unwrap();
//! let props = Interpreter::new().interpret(&config).unwrap();
//!
//! let Value::Object(props) = props else { unreachable!() };
//! let Value::Function(on_click) = &props["onClick"] else { unreachable!() };
//! assert_eq!(on_click.call(&[]).unwrap(), Value::Number(1.0));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config_value;
pub mod error;
pub mod interpret;
pub mod value;

mod script;

pub use config_value::{ConfigValue, FunctionSource, FunctionSpec, Kind, Tagged};
pub use error::ConfigError;
pub use interpret::{Interpreter, NullPolicy};
pub use script::{
    compile_function, empty_function, synthesize_function, Callable, CompileError, Thrown,
    EMPTY_FUNCTION_SOURCE,
};
pub use value::{format_number, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
