//! 配置构建器集成测试

#![allow(clippy::uninlined_format_args)]

use parking_lot::Mutex;
use serde_json::{json, Value};
use service_container::{
    Arguments, ConfigError, ContainerBuilder, ContainerConfig, ContainerError, Factory,
    FactoryRegistry, MethodCall, Service, ServiceError,
};

/// 记录构造参数和被调用过的方法
struct Test1 {
    a: Value,
    b: Value,
    called: Mutex<Vec<String>>,
}

impl Service for Test1 {
    fn call(&self, method: &str, args: &Arguments) -> Result<(), ServiceError> {
        match method {
            "foo" | "bar" => {
                assert_eq!(args.len(), 2);
                self.called.lock().push(method.to_string());
                Ok(())
            }
            _ => Err(ServiceError::UnknownMethod(method.to_string())),
        }
    }
}

fn registry() -> FactoryRegistry {
    FactoryRegistry::new()
        .with(
            "Fixtures.Test1",
            Factory::new(|args: &Arguments| {
                Ok(Test1 {
                    a: args.value(0)?.clone(),
                    b: args.value(1)?.clone(),
                    called: Mutex::new(Vec::new()),
                })
            }),
        )
        .unwrap()
}

#[test]
fn test_initial_container_is_empty() {
    let builder = ContainerBuilder::new();
    assert!(builder.container().service_ids().is_empty());
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let mut builder = ContainerBuilder::new();

    let err = builder.load_configuration(&json!("")).unwrap_err();
    assert!(matches!(err, ConfigError::NotAnObject("string")));

    let err = builder.load_configuration(&json!({})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The configuration object must have a 'parameters' and/or 'services' element"
    );

    let err = builder
        .load_configuration(&json!({ "parameters": [1, 2] }))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidParameters));
}

#[test]
fn test_load_configuration() {
    let mut builder = ContainerBuilder::with_factories(registry());
    builder
        .load_configuration(&json!({
            "services": {
                "test1": {
                    "class": "Fixtures.Test1",
                    "arguments": ["%param_1%", "%param_2%"],
                    "calls": [
                        ["foo", [1, 2]],
                        ["bar", [1, 2]]
                    ],
                    "tags": {
                        "tag1": [1, 2],
                        "tag2": [1, 2]
                    }
                }
            },
            "parameters": {
                "param_1": "Hello World",
                "param_2": "Foobar"
            }
        }))
        .unwrap();

    let mut container = builder.into_container();
    assert!(container.has_definition("test1"));

    let definition = container.definition("test1").unwrap();
    assert_eq!(
        definition.arguments(),
        &[json!("%param_1%"), json!("%param_2%")]
    );
    assert_eq!(
        definition.method_calls(),
        &[
            MethodCall::new("foo", vec![json!(1), json!(2)]),
            MethodCall::new("bar", vec![json!(1), json!(2)]),
        ]
    );
    assert_eq!(definition.tag("tag1"), &[json!(1), json!(2)]);
    assert_eq!(definition.tag("tag2"), &[json!(1), json!(2)]);
    assert!(definition.is_public());

    let test1 = container.get_as::<Test1>("test1").unwrap();
    assert_eq!(*test1.called.lock(), vec!["foo".to_string(), "bar".to_string()]);
    assert_eq!(test1.a, json!("Hello World"));
    assert_eq!(test1.b, json!("Foobar"));

    for tag in ["tag1", "tag2"] {
        let tagged = container.find_tagged_service_ids(tag);
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged["test1"], vec![json!(1), json!(2)]);
    }
}

#[test]
fn test_failed_load_leaves_container_untouched() {
    let mut builder = ContainerBuilder::with_factories(registry());
    let err = builder
        .load_configuration(&json!({
            "services": {
                "ok": { "class": "Fixtures.Test1" },
                "broken": { "class": "Fixtures.Missing" }
            }
        }))
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigError::Container(ContainerError::Resolution { .. })
    ));
    assert!(builder.container().service_ids().is_empty());
}

#[test]
fn test_invalid_service_id_leaves_container_untouched() {
    let mut builder = ContainerBuilder::with_factories(registry());
    let err = builder
        .load_configuration(&json!({
            "services": {
                "a": { "class": "Fixtures.Test1" },
                "\u{3000}": { "class": "Fixtures.Test1" }
            },
            "parameters": { "p": 1 }
        }))
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigError::Container(ContainerError::InvalidIdentifier(_))
    ));
    assert!(builder.container().service_ids().is_empty());
    assert!(!builder.container().has_parameter("p"));
}

#[test]
fn test_unknown_service_keys_are_rejected() {
    let mut builder = ContainerBuilder::with_factories(registry());
    let err = builder
        .load_configuration(&json!({
            "services": { "test1": { "class": "Fixtures.Test1", "shared": false } }
        }))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidService { id, .. } if id == "test1"));
}

#[test]
fn test_load_toml() {
    let mut builder = ContainerBuilder::with_factories(registry())
        .with_config(ContainerConfig::strict());
    builder
        .load_toml_str(
            r#"
            [parameters]
            param_1 = "Hello"
            param_2 = 42

            [services.test1]
            class = "Fixtures.Test1"
            arguments = ["%param_1%", "%param_2%"]
            calls = [["foo", [1, 2]]]
            tags = { greeting = { name = "hello" } }
            public = false

            [services.entry]
            factory = "Fixtures.Test1"
            arguments = ["@test1", "literal"]
            "#,
        )
        .unwrap();

    let container = builder.container_mut();
    let mut ids = container.service_ids();
    ids.sort();
    assert_eq!(ids, vec!["entry".to_string(), "test1".to_string()]);
    assert_eq!(
        container.definition("test1").unwrap().tag("greeting"),
        &[json!({ "name": "hello" })]
    );

    // 私有服务只能作为依赖使用
    assert!(matches!(
        container.get("test1"),
        Err(ContainerError::PrivateService(_))
    ));
    // entry 的第一个参数是服务，Test1 期望值参数
    assert!(matches!(
        container.get("entry"),
        Err(ContainerError::Construction {
            source: ServiceError::InvalidArgument { index: 0, .. },
            ..
        })
    ));

    let test1 = container.definition("test1").unwrap().instance().unwrap();
    let test1 = service_container::downcast::<Test1>(test1).unwrap();
    assert_eq!(test1.a, json!("Hello"));
    assert_eq!(test1.b, json!(42));
}

#[test]
fn test_invalid_toml() {
    let mut builder = ContainerBuilder::new();
    let err = builder.load_toml_str("[services").unwrap_err();
    assert!(matches!(err, ConfigError::TomlParse(_)));
}
