//! Error types for the service container

use thiserror::Error;

/// 容器操作错误
///
/// 每个变体对应一种被拒绝的操作，调用方可以匹配后自行处理；
/// 容器本身从不吞掉或重试错误。
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 冻结后尝试结构性修改
    #[error("Unable to {operation} on a frozen container")]
    Frozen { operation: &'static str },

    /// 编译过程中再次触发编译
    #[error("The container is already compiling")]
    AlreadyCompiling,

    /// 重复编译
    #[error("Unable to compile a container which is already compiled")]
    AlreadyFrozen,

    /// 关闭自动编译时在编译前解析服务
    #[error("Service '{0}' requested before the container was compiled")]
    NotCompiled(String),

    /// 服务未注册
    #[error("Service '{0}' does not exist")]
    UnknownService(String),

    /// 参数不存在
    #[error("Parameter '{0}' does not exist")]
    UnknownParameter(String),

    /// 循环依赖，`chain` 为检测时正在构造的服务
    #[error("Service '{id}' has a circular reference to itself (loading: {})", chain.join(" -> "))]
    CircularReference { id: String, chain: Vec<String> },

    /// 定义已经持有实例
    #[error("Unable to update a definition that is already initialized")]
    AlreadyInitialized,

    /// 定义尚未持有实例
    #[error("Definition is not initialized")]
    NotInitialized,

    /// 对已有实例的定义再次构造
    #[error("Attempt to create service '{0}' that already has an instance")]
    AlreadyInstantiated(String),

    /// 工厂路径解析失败
    #[error("{path} is undefined or {reason}")]
    Resolution { path: String, reason: &'static str },

    /// 非法的服务标识
    #[error("Invalid service identifier '{0}'")]
    InvalidIdentifier(String),

    /// 严格可见性模式下直接获取私有服务
    #[error("Service '{0}' is private and can only be used as a dependency")]
    PrivateService(String),

    /// 实例无法转换为请求的类型
    #[error("Service '{id}' is not of type {expected}")]
    TypeCastFailed { id: String, expected: &'static str },

    /// 工厂构造失败
    #[error("Failed to construct service '{id}': {source}")]
    Construction {
        id: String,
        #[source]
        source: ServiceError,
    },

    /// 构造后方法调用失败
    #[error("Method call '{method}' on service '{id}' failed: {source}")]
    MethodCall {
        id: String,
        method: String,
        #[source]
        source: ServiceError,
    },
}

impl ContainerError {
    pub(crate) fn frozen(operation: &'static str) -> Self {
        ContainerError::Frozen { operation }
    }
}

/// 服务构造与方法调用错误，由工厂和 [`Service`](crate::Service) 实现返回
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("missing argument #{0}")]
    MissingArgument(usize),

    #[error("argument #{index} is not {expected}")]
    InvalidArgument {
        index: usize,
        expected: &'static str,
    },

    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    pub fn other(message: impl Into<String>) -> Self {
        ServiceError::Other(message.into())
    }
}

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("loadConfiguration expects an object, {0} given")]
    NotAnObject(&'static str),

    #[error("The configuration object must have a 'parameters' and/or 'services' element")]
    MissingSections,

    #[error("Invalid configuration for service '{id}': {reason}")]
    InvalidService { id: String, reason: String },

    #[error("'parameters' must be an object")]
    InvalidParameters,

    #[error("Failed to parse TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

pub type Result<T, E = ContainerError> = std::result::Result<T, E>;
