//! 服务定义
//!
//! 描述如何构造一个服务：工厂、构造参数、构造后方法调用、标签与可见性。
//! 一旦持有实例，定义即不可再修改。

use super::factory::{Factory, FactoryRegistry, FactorySource, Instance};
use crate::error::{ContainerError, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// 构造后调用的方法及其参数
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Vec<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// 标签名到属性列表的映射
pub type Tags = IndexMap<String, Vec<Value>>;

/// 服务定义
#[derive(Clone)]
pub struct Definition {
    factory: Factory,
    arguments: Vec<Value>,
    calls: Vec<MethodCall>,
    tags: Tags,
    public: bool,
    instance: Option<Instance>,
}

impl Definition {
    /// 使用直接给出的工厂创建定义
    pub fn new(factory: Factory) -> Self {
        Self {
            factory,
            arguments: Vec::new(),
            calls: Vec::new(),
            tags: Tags::new(),
            public: true,
            instance: None,
        }
    }

    /// 从工厂来源创建定义，路径在此处一次性解析
    pub fn create(
        source: impl Into<FactorySource>,
        registry: &FactoryRegistry,
    ) -> Result<Self> {
        Ok(Self::new(source.into().resolve(registry)?))
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.instance.is_some() {
            return Err(ContainerError::AlreadyInitialized);
        }
        Ok(())
    }

    // Arguments

    pub fn add_argument(&mut self, argument: impl Into<Value>) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.arguments.push(argument.into());
        Ok(self)
    }

    pub fn set_arguments(&mut self, arguments: Vec<Value>) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.arguments = arguments;
        Ok(self)
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    // Method calls

    pub fn add_method_call(
        &mut self,
        method: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.calls.push(MethodCall::new(method, arguments));
        Ok(self)
    }

    pub fn set_method_calls(&mut self, calls: Vec<MethodCall>) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.calls = calls;
        Ok(self)
    }

    pub fn method_calls(&self) -> &[MethodCall] {
        &self.calls
    }

    pub fn has_method_call(&self, method: &str) -> bool {
        self.calls.iter().any(|call| call.method == method)
    }

    /// 移除所有同名调用，其余调用保持原有顺序
    pub fn remove_method_call(&mut self, method: &str) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.calls.retain(|call| call.method != method);
        Ok(self)
    }

    // Tags

    pub fn set_tags(&mut self, tags: Tags) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.tags = tags;
        Ok(self)
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// 追加一组属性；同一标签可多次添加
    pub fn add_tag(
        &mut self,
        name: impl Into<String>,
        attributes: impl Into<Value>,
    ) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.tags
            .entry(name.into())
            .or_default()
            .push(attributes.into());
        Ok(self)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// 标签不存在时返回空切片
    pub fn tag(&self, name: &str) -> &[Value] {
        self.tags.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear_tag(&mut self, name: &str) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.tags.shift_remove(name);
        Ok(self)
    }

    pub fn clear_tags(&mut self) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.tags.clear();
        Ok(self)
    }

    // Visibility

    pub fn set_public(&mut self, public: bool) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.public = public;
        Ok(self)
    }

    /// 私有服务仅作为其他服务的依赖使用
    pub fn is_public(&self) -> bool {
        self.public
    }

    // Instance

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    pub fn instance(&self) -> Result<&Instance> {
        self.instance.as_ref().ok_or(ContainerError::NotInitialized)
    }

    /// 只能设置一次
    pub fn set_instance(&mut self, instance: Instance) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.instance = Some(instance);
        Ok(self)
    }

    /// 构造后方法调用失败时撤销缓存的实例
    pub(crate) fn reset_instance(&mut self) {
        self.instance = None;
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("factory", &self.factory)
            .field("arguments", &self.arguments)
            .field("calls", &self.calls)
            .field("tags", &self.tags)
            .field("public", &self.public)
            .field("has_instance", &self.instance.is_some())
            .finish()
    }
}
