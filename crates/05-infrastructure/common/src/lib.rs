//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn ADSP bean 容器的公共类型。
//!
//! ## 核心组件
//!
//! - [`Bean`] - 类型擦除的 bean 实例句柄
//! - [`BeanType`] / [`TypeInfo`] - 类型元数据与可赋值关系
//! - [`BeanError`] - bean 容器错误分类
//! - [`LifecycleStep`] - bean 生命周期阶段
//!
//! ## 设计原则
//!
//! - 所有类型转换都经过显式声明的类型元数据
//! - 每一种失败都是可检查的独立错误变体

pub mod bean;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use bean::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
