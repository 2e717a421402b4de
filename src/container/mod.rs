//! Service container
//!
//! Maps string identifiers to lazily constructed singletons. Argument specs are
//! resolved at construction time: `@id` references another service and
//! `%name%` references a parameter. Registered compiler passes run once during
//! [`Container::compile`], after which the container is frozen.

pub mod compiler;
pub mod definition;
pub mod factory;
pub mod shared;

pub use compiler::CompilerPass;
pub use definition::{Definition, MethodCall, Tags};
pub use factory::{
    downcast, Argument, Arguments, Factory, FactoryRegistry, FactorySource, Instance, Service,
};
pub use shared::SharedContainer;

use crate::config::ContainerConfig;
use crate::error::{ContainerError, Result};
use crate::logging::OperationTimer;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 总解析次数（含引用解析）
    pub total_resolutions: u64,
    /// 命中已缓存实例的次数
    pub cache_hits: u64,
    /// 实际构造的实例数
    pub instantiations: u64,
    /// 已执行的 compiler pass 数
    pub passes_run: u64,
}

impl ContainerStats {
    /// 缓存命中率（小数形式）
    pub fn hit_rate(&self) -> f64 {
        if self.total_resolutions == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_resolutions as f64
        }
    }
}

/// 正在构造的服务 id，按进入顺序排列
///
/// 与 [`LoadingGuard`] 共享所有权，`create_service` 持有 `&mut self` 期间标记仍可在
/// 守卫的 `Drop` 中释放。工厂 panic 展开时同样会释放；`SharedContainer` 使用的
/// `parking_lot::Mutex` 不会中毒，容器在 panic 之后继续可用。
type ResolutionStack = Arc<Mutex<Vec<String>>>;

/// 构造期间持有的标记，离开作用域（包括出错和 panic）时移除
struct LoadingGuard {
    stack: ResolutionStack,
    id: String,
}

impl LoadingGuard {
    fn enter(stack: &ResolutionStack, id: &str) -> Result<Self> {
        let mut loading = stack.lock();
        if loading.iter().any(|entry| entry == id) {
            let chain = loading.clone();
            tracing::warn!(id, chain = ?chain, "Circular reference detected");
            return Err(ContainerError::CircularReference {
                id: id.to_string(),
                chain,
            });
        }
        loading.push(id.to_string());
        Ok(Self {
            stack: Arc::clone(stack),
            id: id.to_string(),
        })
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut loading = self.stack.lock();
        if let Some(pos) = loading.iter().rposition(|entry| *entry == self.id) {
            loading.remove(pos);
        }
    }
}

/// 服务容器
pub struct Container {
    definitions: IndexMap<String, Definition>,
    parameters: IndexMap<String, Value>,
    passes: Vec<Box<dyn CompilerPass>>,
    loading: ResolutionStack,
    frozen: bool,
    compiling: bool,
    factories: FactoryRegistry,
    config: ContainerConfig,
    stats: ContainerStats,
}

impl Container {
    pub fn new() -> Self {
        Self::with_factories(FactoryRegistry::new())
    }

    /// 注入工厂注册表，供按路径注册的定义使用
    pub fn with_factories(factories: FactoryRegistry) -> Self {
        Self {
            definitions: IndexMap::new(),
            parameters: IndexMap::new(),
            passes: Vec::new(),
            loading: ResolutionStack::default(),
            frozen: false,
            compiling: false,
            factories,
            config: ContainerConfig::default(),
            stats: ContainerStats::default(),
        }
    }

    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    pub fn stats(&self) -> &ContainerStats {
        &self.stats
    }

    fn ensure_unfrozen(&self, operation: &'static str) -> Result<()> {
        if self.frozen {
            return Err(ContainerError::frozen(operation));
        }
        Ok(())
    }

    pub(crate) fn validate_id(id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(ContainerError::InvalidIdentifier(id.to_string()));
        }
        Ok(())
    }

    /// 创建并登记新定义，返回它以便继续配置
    ///
    /// 相同 id 会覆盖原定义。
    pub fn register(
        &mut self,
        id: &str,
        source: impl Into<FactorySource>,
    ) -> Result<&mut Definition> {
        self.ensure_unfrozen("register a new definition")?;
        Self::validate_id(id)?;
        let definition = Definition::create(source, &self.factories)?;
        tracing::debug!(id, factory = definition.factory().type_name(), "Registered definition");
        Ok(self.insert_definition(id.to_string(), definition))
    }

    fn insert_definition(&mut self, id: String, definition: Definition) -> &mut Definition {
        if self.definitions.contains_key(&id) {
            tracing::debug!(id = id.as_str(), "Replacing existing definition");
        }
        match self.definitions.entry(id) {
            indexmap::map::Entry::Occupied(mut occupied) => {
                occupied.insert(definition);
                occupied.into_mut()
            }
            indexmap::map::Entry::Vacant(vacant) => vacant.insert(definition),
        }
    }

    // Compiler passes

    pub fn add_compiler_pass(&mut self, pass: impl CompilerPass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// 以默认值构造 pass 并登记
    pub fn add_default_compiler_pass<P>(&mut self) -> &mut Self
    where
        P: CompilerPass + Default + 'static,
    {
        self.add_compiler_pass(P::default())
    }

    /// 依次执行所有 compiler pass，然后冻结容器
    ///
    /// pass 执行期间登记的新 pass 会排在末尾执行。任一 pass 失败时容器保持未冻结，
    /// 错误原样返回。
    pub fn compile(&mut self) -> Result<()> {
        if self.compiling {
            return Err(ContainerError::AlreadyCompiling);
        }
        if self.frozen {
            return Err(ContainerError::AlreadyFrozen);
        }

        let timer = OperationTimer::new("compile");
        self.compiling = true;
        let result = self.run_passes();
        self.compiling = false;
        let passes = result?;

        self.frozen = true;
        let duration = timer.finish();
        tracing::info!(
            passes,
            definitions = self.definitions.len(),
            duration_us = duration.as_micros() as u64,
            "Container compiled"
        );
        Ok(())
    }

    fn run_passes(&mut self) -> Result<usize> {
        let mut passes = std::mem::take(&mut self.passes);
        let mut index = 0;
        let result = loop {
            passes.append(&mut self.passes);
            let Some(pass) = passes.get_mut(index) else {
                break Ok(index);
            };
            tracing::debug!(pass = pass.name(), "Running compiler pass");
            if let Err(err) = pass.compile(self) {
                tracing::error!(pass = pass.name(), error = %err, "Compiler pass failed");
                break Err(err);
            }
            self.stats.passes_run += 1;
            index += 1;
        };
        passes.append(&mut self.passes);
        self.passes = passes;
        result
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_compiling(&self) -> bool {
        self.compiling
    }

    // Services

    /// 获取服务实例，首次调用时构造并缓存
    ///
    /// 容器未编译时先隐式编译；compiler pass 内调用时直接解析当前定义。
    pub fn get(&mut self, id: &str) -> Result<Instance> {
        if !self.frozen && !self.compiling {
            if !self.config.auto_compile {
                return Err(ContainerError::NotCompiled(id.to_string()));
            }
            self.compile()?;
        }
        if self.config.strict_visibility && !self.definition(id)?.is_public() {
            return Err(ContainerError::PrivateService(id.to_string()));
        }
        self.resolve_service(id)
    }

    /// 获取服务并转换为具体类型
    pub fn get_as<T: Service>(&mut self, id: &str) -> Result<Arc<T>> {
        let instance = self.get(id)?;
        downcast::<T>(&instance).ok_or_else(|| ContainerError::TypeCastFailed {
            id: id.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    fn resolve_service(&mut self, id: &str) -> Result<Instance> {
        self.stats.total_resolutions += 1;
        let definition = self.definition(id)?;
        if let Ok(instance) = definition.instance() {
            let instance = Arc::clone(instance);
            self.stats.cache_hits += 1;
            tracing::trace!(id, "Service resolved from cache");
            return Ok(instance);
        }

        let _guard = LoadingGuard::enter(&self.loading, id)?;
        self.create_service(id)
    }

    fn create_service(&mut self, id: &str) -> Result<Instance> {
        let timer = OperationTimer::new("create_service").with_subject(id);
        let (factory, arguments, calls) = {
            let definition = self.definition(id)?;
            if definition.has_instance() {
                return Err(ContainerError::AlreadyInstantiated(id.to_string()));
            }
            (
                definition.factory().clone(),
                definition.arguments().to_vec(),
                definition.method_calls().to_vec(),
            )
        };

        let args = self.resolve_arguments(&arguments)?;
        let instance = factory
            .construct(&args)
            .map_err(|source| ContainerError::Construction {
                id: id.to_string(),
                source,
            })?;
        self.definition_mut(id)?.set_instance(Arc::clone(&instance))?;
        self.stats.instantiations += 1;

        if let Err(err) = self.apply_method_calls(id, &instance, &calls) {
            // 构造后调用失败不留下半初始化的实例
            if let Some(definition) = self.definitions.get_mut(id) {
                definition.reset_instance();
            }
            return Err(err);
        }

        timer.finish();
        tracing::debug!(id, factory = factory.type_name(), "Service instantiated");
        Ok(instance)
    }

    fn apply_method_calls(&mut self, id: &str, instance: &Instance, calls: &[MethodCall]) -> Result<()> {
        for call in calls {
            let args = self.resolve_arguments(&call.arguments)?;
            instance
                .call(&call.method, &args)
                .map_err(|source| ContainerError::MethodCall {
                    id: id.to_string(),
                    method: call.method.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    fn resolve_arguments(&mut self, specs: &[Value]) -> Result<Arguments> {
        specs
            .iter()
            .map(|spec| self.resolve_parameter(spec))
            .collect::<Result<Vec<_>>>()
            .map(Arguments::new)
    }

    /// 解析单个参数描述
    ///
    /// `@id` 解析为服务，`%name%` 解析为参数值，其余字符串和非字符串值原样返回。
    pub fn resolve_parameter(&mut self, spec: &Value) -> Result<Argument> {
        let Value::String(raw) = spec else {
            return Ok(Argument::Value(spec.clone()));
        };

        if let Some(id) = raw.strip_prefix('@') {
            return self.resolve_service(id).map(Argument::Service);
        }

        if raw.len() >= 2 && raw.starts_with('%') && raw.ends_with('%') {
            let name = &raw[1..raw.len() - 1];
            return self.parameter(name).cloned().map(Argument::Value);
        }

        Ok(Argument::Value(spec.clone()))
    }

    // Definitions

    /// 替换全部定义
    pub fn set_definitions<I>(&mut self, definitions: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (String, Definition)>,
    {
        self.ensure_unfrozen("replace definitions")?;
        let definitions = Self::validated(definitions)?;
        self.definitions.clear();
        self.insert_all(definitions);
        Ok(self)
    }

    /// 合并定义，同 id 覆盖
    ///
    /// 所有 id 先校验，任一非法则不做任何修改。
    pub fn add_definitions<I>(&mut self, definitions: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (String, Definition)>,
    {
        self.ensure_unfrozen("add definitions")?;
        let definitions = Self::validated(definitions)?;
        self.insert_all(definitions);
        Ok(self)
    }

    fn validated<I>(definitions: I) -> Result<Vec<(String, Definition)>>
    where
        I: IntoIterator<Item = (String, Definition)>,
    {
        let definitions: Vec<_> = definitions.into_iter().collect();
        for (id, _) in &definitions {
            Self::validate_id(id)?;
        }
        Ok(definitions)
    }

    fn insert_all(&mut self, definitions: Vec<(String, Definition)>) {
        for (id, definition) in definitions {
            self.insert_definition(id, definition);
        }
    }

    pub fn set_definition(&mut self, id: &str, definition: Definition) -> Result<&mut Self> {
        self.ensure_unfrozen("set a definition")?;
        Self::validate_id(id)?;
        self.insert_definition(id.to_string(), definition);
        Ok(self)
    }

    pub fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn definition(&self, id: &str) -> Result<&Definition> {
        self.definitions
            .get(id)
            .ok_or_else(|| ContainerError::UnknownService(id.to_string()))
    }

    /// 定义本身的修改不受冻结限制，只受实例化限制
    pub fn definition_mut(&mut self, id: &str) -> Result<&mut Definition> {
        self.definitions
            .get_mut(id)
            .ok_or_else(|| ContainerError::UnknownService(id.to_string()))
    }

    /// 按登记顺序列出所有服务 id
    pub fn service_ids(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    /// 查找带有指定标签的服务，值为该标签的属性列表
    pub fn find_tagged_service_ids(&self, tag: &str) -> IndexMap<String, Vec<Value>> {
        self.definitions
            .iter()
            .filter(|(_, definition)| definition.has_tag(tag))
            .map(|(id, definition)| (id.clone(), definition.tag(tag).to_vec()))
            .collect()
    }

    // Parameters

    /// 替换全部参数
    pub fn set_parameters<I>(&mut self, parameters: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.ensure_unfrozen("update parameters")?;
        self.parameters = parameters.into_iter().collect();
        Ok(self)
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.ensure_unfrozen("update parameters")?;
        self.parameters.insert(name.to_string(), value.into());
        Ok(self)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn parameter(&self, name: &str) -> Result<&Value> {
        self.parameters
            .get(name)
            .ok_or_else(|| ContainerError::UnknownParameter(name.to_string()))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("definitions", &self.definitions)
            .field("parameters", &self.parameters)
            .field("passes", &self.passes.len())
            .field("frozen", &self.frozen)
            .field("compiling", &self.compiling)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}
