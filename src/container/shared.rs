//! 线程安全的容器句柄
//!
//! 所有状态由同一把锁保护，`get` 的“检查缓存 - 构造”在锁内完成，
//! 并发的首次调用只会构造一个实例。

use super::{Container, Instance, Service};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone)]
pub struct SharedContainer {
    inner: Arc<Mutex<Container>>,
}

impl SharedContainer {
    pub fn new(container: Container) -> Self {
        Self {
            inner: Arc::new(Mutex::new(container)),
        }
    }

    pub fn get(&self, id: &str) -> Result<Instance> {
        self.inner.lock().get(id)
    }

    pub fn get_as<T: Service>(&self, id: &str) -> Result<Arc<T>> {
        self.inner.lock().get_as::<T>(id)
    }

    pub fn compile(&self) -> Result<()> {
        self.inner.lock().compile()
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.lock().is_frozen()
    }

    /// 在持锁状态下访问容器，用于注册定义、查询标签等
    pub fn with<R>(&self, f: impl FnOnce(&mut Container) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<Container> for SharedContainer {
    fn from(container: Container) -> Self {
        Self::new(container)
    }
}
