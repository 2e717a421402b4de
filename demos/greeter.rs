//! 服务容器使用示例
//!
//! 从 TOML 配置构建容器，通过 compiler pass 为带标签的服务追加方法调用，
//! 然后解析出 greeter 并输出问候语。

#![allow(clippy::print_stdout)]

use anyhow::Context;
use parking_lot::Mutex;
use service_container::logging::{init_logging, LoggingConfig};
use service_container::{
    Arguments, CompilerPass, Container, ContainerBuilder, Factory, FactoryRegistry, Service,
    ServiceError,
};
use std::sync::Arc;

const CONFIG: &str = r#"
[parameters]
greeting = "Hello"

[services.name_provider]
class = "App.NameProvider"
arguments = [["Alice", "Bob"]]
tags = { "greeting.target" = true }

[services.greeter]
class = "App.Greeter"
arguments = ["%greeting%", "@name_provider"]
calls = [["punctuate", ["!"]]]
"#;

struct NameProvider {
    names: Mutex<Vec<String>>,
}

impl Service for NameProvider {
    fn call(&self, method: &str, args: &Arguments) -> Result<(), ServiceError> {
        match method {
            "addName" => {
                self.names.lock().push(args.str(0)?.to_string());
                Ok(())
            }
            _ => Err(ServiceError::UnknownMethod(method.to_string())),
        }
    }
}

struct Greeter {
    greeting: String,
    names: Arc<NameProvider>,
    suffix: Mutex<String>,
}

impl Greeter {
    fn greet(&self) -> Vec<String> {
        let suffix = self.suffix.lock();
        self.names
            .names
            .lock()
            .iter()
            .map(|name| format!("{}, {}{}", self.greeting, name, suffix))
            .collect()
    }
}

impl Service for Greeter {
    fn call(&self, method: &str, args: &Arguments) -> Result<(), ServiceError> {
        match method {
            "punctuate" => {
                *self.suffix.lock() = args.str(0)?.to_string();
                Ok(())
            }
            _ => Err(ServiceError::UnknownMethod(method.to_string())),
        }
    }
}

/// 为所有 `greeting.target` 服务追加一个名字
struct AddGuestPass;

impl CompilerPass for AddGuestPass {
    fn compile(&mut self, container: &mut Container) -> service_container::Result<()> {
        for (id, _) in container.find_tagged_service_ids("greeting.target") {
            container
                .definition_mut(&id)?
                .add_method_call("addName", vec!["Carol".into()])?;
        }
        Ok(())
    }
}

fn registry() -> anyhow::Result<FactoryRegistry> {
    let registry = FactoryRegistry::new()
        .with(
            "App.NameProvider",
            Factory::new(|args: &Arguments| {
                let names = args
                    .value(0)?
                    .as_array()
                    .ok_or(ServiceError::InvalidArgument {
                        index: 0,
                        expected: "an array of names",
                    })?
                    .iter()
                    .filter_map(|name| name.as_str().map(str::to_string))
                    .collect();
                Ok(NameProvider {
                    names: Mutex::new(names),
                })
            }),
        )?
        .with(
            "App.Greeter",
            Factory::new(|args: &Arguments| {
                Ok(Greeter {
                    greeting: args.str(0)?.to_string(),
                    names: args.service::<NameProvider>(1)?,
                    suffix: Mutex::new(String::new()),
                })
            }),
        )?;
    Ok(registry)
}

fn main() -> anyhow::Result<()> {
    // 全局 subscriber 只能设置一次，失败时继续运行
    let _ = init_logging(LoggingConfig::development());

    let mut builder = ContainerBuilder::with_factories(registry()?);
    builder
        .load_toml_str(CONFIG)
        .context("failed to load container configuration")?;

    let mut container = builder.into_container();
    container.add_compiler_pass(AddGuestPass);

    let greeter = container
        .get_as::<Greeter>("greeter")
        .context("failed to resolve greeter")?;
    for line in greeter.greet() {
        println!("{}", line);
    }

    let stats = container.stats();
    println!(
        "\n📊 instantiations: {}, resolutions: {}, passes: {}",
        stats.instantiations, stats.total_resolutions, stats.passes_run
    );
    Ok(())
}
