//! 服务工厂与工厂注册表
//!
//! 定义可被容器构造的服务类型、构造时传入的已解析参数，
//! 以及按点分路径查找工厂的命名空间。

use crate::error::{ContainerError, ServiceError};
use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 类型擦除的服务实例
pub type Instance = Arc<dyn Service>;

/// 向下转型支持，对所有 `Any + Send + Sync` 类型自动实现
pub trait AsAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// 可由容器管理的服务
///
/// `call` 用于执行定义中配置的构造后方法调用。实例在调用前已被缓存并共享，
/// 因此需要修改状态的 setter 应使用内部可变性。
pub trait Service: AsAny {
    fn call(&self, method: &str, _args: &Arguments) -> Result<(), ServiceError> {
        Err(ServiceError::UnknownMethod(method.to_string()))
    }
}

impl fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Service(..)")
    }
}

/// 将实例转换为具体类型
pub fn downcast<T: Service>(instance: &Instance) -> Option<Arc<T>> {
    Arc::clone(instance).into_any().downcast::<T>().ok()
}

/// 已解析的参数
#[derive(Clone)]
pub enum Argument {
    /// 字面量或参数值
    Value(Value),
    /// 引用的服务实例
    Service(Instance),
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Argument::Service(_) => f.write_str("Service(..)"),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl From<Instance> for Argument {
    fn from(instance: Instance) -> Self {
        Argument::Service(instance)
    }
}

/// 按位置排列的已解析参数列表
#[derive(Debug, Clone, Default)]
pub struct Arguments(Vec<Argument>);

impl Arguments {
    pub fn new(arguments: Vec<Argument>) -> Self {
        Self(arguments)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.0.iter()
    }

    fn require(&self, index: usize) -> Result<&Argument, ServiceError> {
        self.0.get(index).ok_or(ServiceError::MissingArgument(index))
    }

    /// 获取值参数
    pub fn value(&self, index: usize) -> Result<&Value, ServiceError> {
        match self.require(index)? {
            Argument::Value(value) => Ok(value),
            Argument::Service(_) => Err(ServiceError::InvalidArgument {
                index,
                expected: "a value",
            }),
        }
    }

    pub fn str(&self, index: usize) -> Result<&str, ServiceError> {
        self.value(index)?
            .as_str()
            .ok_or(ServiceError::InvalidArgument {
                index,
                expected: "a string",
            })
    }

    pub fn i64(&self, index: usize) -> Result<i64, ServiceError> {
        self.value(index)?
            .as_i64()
            .ok_or(ServiceError::InvalidArgument {
                index,
                expected: "an integer",
            })
    }

    /// 获取服务参数（未转型）
    pub fn instance(&self, index: usize) -> Result<&Instance, ServiceError> {
        match self.require(index)? {
            Argument::Service(instance) => Ok(instance),
            Argument::Value(_) => Err(ServiceError::InvalidArgument {
                index,
                expected: "a service",
            }),
        }
    }

    /// 获取服务参数并转换为具体类型
    pub fn service<T: Service>(&self, index: usize) -> Result<Arc<T>, ServiceError> {
        downcast::<T>(self.instance(index)?).ok_or(ServiceError::InvalidArgument {
            index,
            expected: std::any::type_name::<T>(),
        })
    }
}

impl From<Vec<Argument>> for Arguments {
    fn from(arguments: Vec<Argument>) -> Self {
        Self(arguments)
    }
}

type ConstructFn = dyn Fn(&Arguments) -> Result<Instance, ServiceError> + Send + Sync;

/// 服务工厂，每次调用都构造一个新实例
#[derive(Clone)]
pub struct Factory {
    construct: Arc<ConstructFn>,
    type_name: &'static str,
}

impl Factory {
    pub fn new<T, F>(factory_fn: F) -> Self
    where
        T: Service,
        F: Fn(&Arguments) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        Self {
            construct: Arc::new(move |args| {
                let service: Instance = Arc::new(factory_fn(args)?);
                Ok(service)
            }),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn construct(&self, args: &Arguments) -> Result<Instance, ServiceError> {
        (self.construct)(args)
    }

    /// 产出的服务类型名（用于日志和错误信息）
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn ptr_eq(&self, other: &Factory) -> bool {
        Arc::ptr_eq(&self.construct, &other.construct)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// 定义的工厂来源：直接给出，或通过注册表中的点分路径引用
#[derive(Debug, Clone)]
pub enum FactorySource {
    Direct(Factory),
    Path(String),
}

impl FactorySource {
    /// 解析为具体工厂
    pub fn resolve(self, registry: &FactoryRegistry) -> Result<Factory, ContainerError> {
        match self {
            FactorySource::Direct(factory) => Ok(factory),
            FactorySource::Path(path) => registry.resolve(&path),
        }
    }
}

impl From<Factory> for FactorySource {
    fn from(factory: Factory) -> Self {
        FactorySource::Direct(factory)
    }
}

impl From<&str> for FactorySource {
    fn from(path: &str) -> Self {
        FactorySource::Path(path.to_string())
    }
}

impl From<String> for FactorySource {
    fn from(path: String) -> Self {
        FactorySource::Path(path)
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Namespace(Namespace),
    Factory(Factory),
}

#[derive(Debug, Clone, Default)]
struct Namespace {
    entries: IndexMap<String, Entry>,
}

/// 按点分路径组织的工厂命名空间
///
/// 由调用方在创建定义之前填充，然后注入容器；容器只读取它。
#[derive(Debug, Clone, Default)]
pub struct FactoryRegistry {
    root: Namespace,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在 `path` 下登记工厂，按需创建中间命名空间
    pub fn insert(&mut self, path: &str, factory: Factory) -> Result<(), ContainerError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ContainerError::InvalidIdentifier(path.to_string()));
        }

        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ContainerError::InvalidIdentifier(path.to_string()))?;

        let mut namespace = &mut self.root;
        let mut walked = String::new();
        for segment in parents {
            walked.push_str(segment);
            let entry = namespace
                .entries
                .entry(segment.to_string())
                .or_insert_with(|| Entry::Namespace(Namespace::default()));
            namespace = match entry {
                Entry::Namespace(inner) => inner,
                Entry::Factory(_) => {
                    return Err(ContainerError::Resolution {
                        path: walked,
                        reason: "not iterable",
                    })
                }
            };
            walked.push('.');
        }

        namespace
            .entries
            .insert(last.to_string(), Entry::Factory(factory));
        Ok(())
    }

    /// 链式登记
    pub fn with(mut self, path: &str, factory: Factory) -> Result<Self, ContainerError> {
        self.insert(path, factory)?;
        Ok(self)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// 按路径查找工厂
    ///
    /// 无分隔符的名称必须直接指向工厂；带分隔符的路径逐段遍历，
    /// 任一段缺失或不可遍历即失败，错误中给出失败处的前缀。
    pub fn resolve(&self, path: &str) -> Result<Factory, ContainerError> {
        if !path.contains('.') {
            return match self.root.entries.get(path) {
                Some(Entry::Factory(factory)) => Ok(factory.clone()),
                _ => Err(ContainerError::Resolution {
                    path: path.to_string(),
                    reason: "not a function",
                }),
            };
        }

        let mut namespace = &self.root;
        let mut walked = String::new();
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            walked.push_str(segment);
            match namespace.entries.get(segment) {
                Some(Entry::Namespace(inner)) => namespace = inner,
                Some(Entry::Factory(factory)) if segments.peek().is_none() => {
                    return Ok(factory.clone())
                }
                _ => {
                    return Err(ContainerError::Resolution {
                        path: walked,
                        reason: "not iterable",
                    })
                }
            }
            walked.push('.');
        }

        Err(ContainerError::Resolution {
            path: path.to_string(),
            reason: "not a function",
        })
    }
}
