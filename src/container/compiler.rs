//! Compiler passes

use super::Container;
use crate::error::Result;

/// 编译阶段的扩展点
///
/// 每个 pass 在 [`Container::compile`] 中按注册顺序执行一次，此时容器尚未冻结，
/// 可以增删定义和参数。
pub trait CompilerPass: Send {
    fn compile(&mut self, container: &mut Container) -> Result<()>;

    /// 用于日志
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// 为闭包实现 CompilerPass
impl<F> CompilerPass for F
where
    F: FnMut(&mut Container) -> Result<()> + Send,
{
    fn compile(&mut self, container: &mut Container) -> Result<()> {
        self(container)
    }

    fn name(&self) -> &str {
        "closure"
    }
}
