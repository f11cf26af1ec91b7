//! # Dependency Injection Abstractions
//!
//! bean 容器抽象层，定义 bean 工厂、定义注册和生命周期回调的核心接口。
//!
//! ## 核心接口
//!
//! - [`BeanFactory`] - 按名称和类型获取 bean 的根接口
//! - [`HierarchicalBeanFactory`] / [`ListableBeanFactory`] - 分层与枚举
//! - [`ConfigurableBeanFactory`] - 注册、后处理器、作用域和销毁
//! - [`BeanDefinition`] - bean 定义与类型化构建器
//! - [`BeanPostProcessor`] 及各感知接口 - 生命周期回调
//! - [`ApplicationContext`] - 应用上下文

pub mod container;
pub mod context;
pub mod definition;
pub mod factory;
pub mod lifecycle;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use container::*;
pub use context::*;
pub use definition::*;
pub use factory::*;
pub use lifecycle::*;
pub use provider::*;
pub use registry::*;
pub use resolver::*;
pub use scope::*;
