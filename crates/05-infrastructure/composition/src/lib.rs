//! # 基础设施组合层
//!
//! 把 bean 工厂和上下文协作者组合成可运行的应用上下文。
//!
//! ## 主要功能
//!
//! - **上下文构建器**: 使用构建者模式组装协作者、后处理器、作用域和定义来源
//! - **应用上下文**: 刷新时预实例化单例，关闭时按依赖顺序销毁
//! - **配置加载**: 从 TOML / JSON 读取上下文、容器和日志配置
//! - **日志初始化**: 基于 `tracing-subscriber` 的全局订阅器
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::{BeanDefinition, BeanDefinitionRegistry, BeanFactoryExt};
//! use infrastructure_composition::ApplicationContextBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ApplicationContextBuilder::new()
//!         .application_name("demo")
//!         .build()?;
//!     context.register_bean_definition(
//!         "greeting",
//!         BeanDefinition::supplier(|_| Ok(String::from("hello"))).build(),
//!     )?;
//!     context.refresh()?;
//!
//!     let greeting = context.get_bean_typed::<String>("greeting")?;
//!     println!("{}", greeting);
//!
//!     context.close();
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod support;

pub use builder::{init_logging, ApplicationContextBuilder, LoggingConfig};
pub use config::{ContextConfig, LoggingSettings};
pub use context::{ContextClosedEvent, ContextRefreshedEvent, ContextStatus, GenericApplicationContext};
pub use support::{FileSystemResourceLoader, SimpleEventPublisher, StandardEnvironment, StaticMessageSource};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
