use preview_value::{synthesize_function, ConfigValue, FunctionSpec, Interpreter, Value};
use proptest::prelude::*;
use serde_yaml::{Mapping, Value as Yaml};

fn tagged(kind: &str, payload: Yaml) -> Yaml {
    let mut map = Mapping::new();
    map.insert(Yaml::from("kind"), Yaml::from(kind));
    map.insert(Yaml::from("value"), payload);
    Yaml::Mapping(map)
}

fn interpret(yaml: &Yaml) -> Value {
    let config = ConfigValue::from_yaml(yaml).unwrap();
    Interpreter::new().interpret(&config).unwrap()
}

#[test]
fn on_click_spec_returns_one() {
    let yaml: Yaml = serde_yaml::from_str(
        "onClick: {kind: function, spec: {parameters: [], returnExpressions: ['1']}}",
    )
    .unwrap();
    let props = Interpreter::new().interpret_props(Some(&yaml)).unwrap();
    let Value::Function(on_click) = &props["onClick"] else {
        panic!("expected callable prop");
    };
    assert_eq!(on_click.call(&[]).unwrap(), Value::Number(1.0));
}

#[test]
fn body_runs_before_return() {
    let spec = FunctionSpec::returning(&["e"], ["e.count", "seen"])
        .with_body("let seen = 'no'\nif (e.count > 1) { seen = 'yes' }");
    let callable = synthesize_function(&spec).unwrap();

    let mut event = indexmap::IndexMap::new();
    event.insert("count".to_string(), Value::Number(2.0));
    assert_eq!(callable.call(&[Value::Object(event)]).unwrap(), Value::from("yes"));
}

#[test]
fn string_payload_is_not_interpreted() {
    let inner = tagged("function", Yaml::from("() => 1"));
    let value = interpret(&tagged("string", inner));
    let Value::Object(map) = value else {
        panic!("payload should stay a plain mapping");
    };
    assert_eq!(map["kind"], Value::from("function"));
}

#[test]
fn deeply_nested_function_is_a_config_error() {
    let depth = 10_000;
    let source = format!("() => {}1{}", "(".repeat(depth), ")".repeat(depth));
    let yaml = tagged("function", Yaml::from(source));
    let result = ConfigValue::from_yaml(&yaml).and_then(|config| Interpreter::new().interpret(&config));
    assert!(result.is_err());
}

proptest! {
    #[test]
    fn prop_string_passthrough_is_idempotent(s in any::<String>()) {
        let first = interpret(&tagged("string", Yaml::from(s.clone())));
        prop_assert_eq!(&first, &Value::String(s));

        let Value::String(interpreted) = &first else {
            unreachable!();
        };
        let second = interpret(&tagged("string", Yaml::from(interpreted.clone())));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_number_passthrough_is_idempotent(n in -1.0e12f64..1.0e12) {
        let first = interpret(&tagged("number", Yaml::from(n)));
        prop_assert_eq!(&first, &Value::Number(n));

        let Value::Number(interpreted) = first else {
            unreachable!();
        };
        let second = interpret(&tagged("number", Yaml::from(interpreted)));
        prop_assert_eq!(second, first);
    }

    #[test]
    fn prop_throws_message_is_exact(message in any::<String>()) {
        let callable = synthesize_function(&FunctionSpec::throwing(&["a"], message.clone())).unwrap();
        let thrown = callable.call(&[Value::Number(1.0)]).unwrap_err();
        prop_assert_eq!(thrown.message(), message);
        prop_assert_eq!(thrown.name(), Some("Error"));
    }

    #[test]
    fn prop_return_expressions_yield_last_value(a in -1000i32..1000, b in -1000i32..1000) {
        let spec = FunctionSpec::returning(&["a", "b"], ["a", "a + b"]).with_body("const unused = a * b");
        let callable = synthesize_function(&spec).unwrap();
        let result = callable
            .call(&[Value::Number(f64::from(a)), Value::Number(f64::from(b))])
            .unwrap();
        prop_assert_eq!(result, Value::Number(f64::from(a + b)));
    }
}
