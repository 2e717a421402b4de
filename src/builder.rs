//! 从已解析的配置值构建容器
//!
//! 配置形如：
//!
//! ```toml
//! [parameters]
//! greeting = "Hello"
//!
//! [services.greeter]
//! class = "App.Greeter"
//! arguments = ["%greeting%", "@name_provider"]
//! calls = [["punctuate", ["!"]]]
//! tags = { console_command = [{ name = "greet" }] }
//! public = true
//! ```

use crate::config::ContainerConfig;
use crate::container::{Container, Definition, FactoryRegistry, MethodCall, Tags};
use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceConfig {
    #[serde(alias = "class")]
    factory: String,
    #[serde(default)]
    arguments: Vec<Value>,
    #[serde(default)]
    calls: Vec<Vec<Value>>,
    #[serde(default)]
    tags: IndexMap<String, Value>,
    #[serde(default = "default_public")]
    public: bool,
}

fn default_public() -> bool {
    true
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 容器构建器
#[derive(Debug)]
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::with_factories(FactoryRegistry::new())
    }

    pub fn with_factories(factories: FactoryRegistry) -> Self {
        Self {
            container: Container::with_factories(factories),
        }
    }

    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.container = self.container.with_config(config);
        self
    }

    /// 加载一份配置
    ///
    /// 所有服务定义先全部构建，任一失败则容器保持不变。
    pub fn load_configuration(&mut self, configuration: &Value) -> Result<&mut Self, ConfigError> {
        let root = configuration
            .as_object()
            .ok_or_else(|| ConfigError::NotAnObject(kind_of(configuration)))?;

        let services = root.get("services");
        let parameters = root.get("parameters");
        if services.is_none() && parameters.is_none() {
            return Err(ConfigError::MissingSections);
        }

        let definitions = match services {
            Some(services) => self.build_definitions(services)?,
            None => Vec::new(),
        };

        let parameters = match parameters {
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(ConfigError::InvalidParameters),
            None => serde_json::Map::new(),
        };

        tracing::debug!(
            services = definitions.len(),
            parameters = parameters.len(),
            "Loading container configuration"
        );

        self.container.add_definitions(definitions)?;
        for (name, value) in parameters {
            self.container.set_parameter(&name, value)?;
        }
        Ok(self)
    }

    /// 解析 TOML 文本后加载
    pub fn load_toml_str(&mut self, content: &str) -> Result<&mut Self, ConfigError> {
        let configuration: Value = toml::from_str(content)?;
        self.load_configuration(&configuration)
    }

    fn build_definitions(&self, services: &Value) -> Result<Vec<(String, Definition)>, ConfigError> {
        let services = services
            .as_object()
            .ok_or_else(|| ConfigError::InvalidService {
                id: "services".to_string(),
                reason: format!("expected an object, {} given", kind_of(services)),
            })?;

        services
            .iter()
            .map(|(id, raw)| -> Result<(String, Definition), ConfigError> {
                Container::validate_id(id)?;
                let definition = self.build_definition(id, raw)?;
                Ok((id.clone(), definition))
            })
            .collect()
    }

    fn build_definition(&self, id: &str, raw: &Value) -> Result<Definition, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidService {
            id: id.to_string(),
            reason,
        };

        let service: ServiceConfig =
            serde_json::from_value(raw.clone()).map_err(|err| invalid(err.to_string()))?;

        let calls = service
            .calls
            .into_iter()
            .map(|call| parse_call(call).map_err(&invalid))
            .collect::<Result<Vec<_>, _>>()?;

        let tags: Tags = service
            .tags
            .into_iter()
            .map(|(name, attributes)| match attributes {
                Value::Array(list) => (name, list),
                single => (name, vec![single]),
            })
            .collect();

        let mut definition = Definition::create(service.factory, self.container.factories())?;
        definition
            .set_arguments(service.arguments)?
            .set_method_calls(calls)?
            .set_tags(tags)?
            .set_public(service.public)?;
        Ok(definition)
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn into_container(self) -> Container {
        self.container
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `[name]` 或 `[name, [args...]]`
fn parse_call(call: Vec<Value>) -> Result<MethodCall, String> {
    let mut parts = call.into_iter();
    let method = match parts.next() {
        Some(Value::String(method)) => method,
        Some(other) => return Err(format!("method name must be a string, {} given", kind_of(&other))),
        None => return Err("method call must not be empty".to_string()),
    };
    let arguments = match parts.next() {
        Some(Value::Array(arguments)) => arguments,
        Some(other) => {
            return Err(format!(
                "arguments of '{method}' must be an array, {} given",
                kind_of(&other)
            ))
        }
        None => Vec::new(),
    };
    if parts.next().is_some() {
        return Err(format!("method call '{method}' has too many elements"));
    }
    Ok(MethodCall::new(method, arguments))
}
