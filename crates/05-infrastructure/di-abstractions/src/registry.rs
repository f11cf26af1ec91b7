//! bean 定义注册与工厂扩展接口

use crate::definition::BeanDefinition;
use crate::factory::BeanFactory;
use infrastructure_common::{Bean, BeanResult, TypeInfo};
use std::sync::Arc;

/// 可分层的 bean 工厂
pub trait HierarchicalBeanFactory: BeanFactory {
    /// 父工厂，没有父工厂或父工厂已释放时返回 `None`
    fn parent_bean_factory(&self) -> Option<Arc<dyn BeanFactory>>;

    /// 本级是否包含指定名称的 bean，不查询祖先
    fn contains_local_bean(&self, name: &str) -> bool;
}

/// 可枚举的 bean 工厂
///
/// 枚举操作只考虑本级的定义，不查询祖先。
pub trait ListableBeanFactory: BeanFactory {
    /// 本级是否有该名称的定义
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 本级定义数量
    fn bean_definition_count(&self) -> usize;

    /// 本级定义名称，按注册顺序
    fn bean_definition_names(&self) -> Vec<String>;

    /// 可以作为指定类型使用的 bean 名称
    ///
    /// 先是定义，再是外部注册的单例。`allow_eager_init` 为 `true` 时，
    /// 未声明产品类型的 FactoryBean 会被实例化以确定类型。
    fn bean_names_for_type(
        &self,
        ty: &TypeInfo,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String>;

    /// 获取所有可以作为指定类型使用的 bean（会实例化）
    fn beans_of_type(&self, ty: &TypeInfo) -> BeanResult<Vec<(String, Bean)>>;
}

/// bean 定义注册表
pub trait BeanDefinitionRegistry: Send + Sync {
    /// 注册定义，同名定义会被替换（除非禁止覆盖）
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()>;

    /// 移除定义
    fn remove_bean_definition(&self, name: &str) -> BeanResult<()>;

    /// 获取本级的定义
    fn bean_definition(&self, name: &str) -> BeanResult<Arc<BeanDefinition>>;

    /// 名称是否已被定义或别名占用
    fn is_bean_name_in_use(&self, name: &str) -> bool;

    /// 注册别名
    fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()>;

    /// 移除别名
    fn remove_alias(&self, alias: &str) -> BeanResult<()>;

    /// 是否为别名
    fn is_alias(&self, name: &str) -> bool;
}

/// bean 定义来源
///
/// 把外部的定义来源（代码、配置等）加载到注册表中。
pub trait BeanDefinitionReader: Send + Sync {
    /// 加载定义，返回注册的数量
    fn load_bean_definitions(&self, registry: &dyn BeanDefinitionRegistry) -> BeanResult<usize>;
}

impl<F> BeanDefinitionReader for F
where
    F: Fn(&dyn BeanDefinitionRegistry) -> BeanResult<usize> + Send + Sync,
{
    fn load_bean_definitions(&self, registry: &dyn BeanDefinitionRegistry) -> BeanResult<usize> {
        self(registry)
    }
}
