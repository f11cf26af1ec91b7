//! bean 作用域
//!
//! 内置两种作用域：共享单例和原型。其他作用域通过 [`Scope`] trait 注册到工厂。

use infrastructure_common::{Bean, BeanResult};
use std::fmt;

/// 单例作用域名称
pub const SCOPE_SINGLETON: &str = "singleton";

/// 原型作用域名称
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// bean 作用域
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum BeanScope {
    /// 每个工厂共享一个实例
    #[default]
    Singleton,
    /// 每次获取都创建新实例
    Prototype,
    /// 由注册的 [`Scope`] 管理
    Custom(String),
}

impl BeanScope {
    /// 按名称解析作用域
    pub fn from_name(name: &str) -> Self {
        match name {
            "" | SCOPE_SINGLETON => Self::Singleton,
            SCOPE_PROTOTYPE => Self::Prototype,
            other => Self::Custom(other.to_string()),
        }
    }

    /// 作用域名称
    pub fn name(&self) -> &str {
        match self {
            Self::Singleton => SCOPE_SINGLETON,
            Self::Prototype => SCOPE_PROTOTYPE,
            Self::Custom(name) => name,
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Singleton)
    }

    pub fn is_prototype(&self) -> bool {
        matches!(self, Self::Prototype)
    }
}

impl fmt::Display for BeanScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 自定义作用域
///
/// 作用域持有它创建的对象，并在对象被移除或作用域关闭时执行销毁回调。
pub trait Scope: Send + Sync {
    /// 从作用域获取对象，不存在时调用 `object_factory` 创建并缓存
    fn get(
        &self,
        name: &str,
        object_factory: &mut dyn FnMut() -> BeanResult<Bean>,
    ) -> BeanResult<Bean>;

    /// 从作用域移除对象，不执行销毁回调
    fn remove(&self, name: &str) -> Option<Bean>;

    /// 注册对象销毁时执行的回调
    fn register_destruction_callback(&self, name: &str, callback: Box<dyn FnOnce() + Send>);

    /// 作用域会话标识
    fn conversation_id(&self) -> Option<String> {
        None
    }
}
