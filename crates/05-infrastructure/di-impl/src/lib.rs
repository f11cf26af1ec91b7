//! # 依赖注入具体实现
//!
//! 提供 [`DefaultBeanFactory`]：按名称和按类型解析 bean，管理单例缓存、
//! 别名、依赖关系和生命周期回调，并支持父子工厂委托和自定义作用域。
//!
//! ```ignore
//! let factory = DefaultBeanFactory::new();
//! factory.register_bean_definition("repo", BeanDefinition::supplier(|_| Ok(Repo::default())).build())?;
//! let repo = factory.get_bean_typed::<Repo>("repo")?;
//! ```

mod alias;
mod definitions;
mod factory;
mod lifecycle;
mod resolution;
mod scope;
mod singletons;

pub use factory::DefaultBeanFactory;
pub use scope::MapScope;
