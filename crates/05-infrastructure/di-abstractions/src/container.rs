//! 可配置的 bean 容器抽象接口
//!
//! 提供容器的配置、统计以及注册和销毁等管理操作

use crate::factory::BeanFactory;
use crate::lifecycle::{AwareCollaborators, BeanPostProcessor};
use crate::registry::{BeanDefinitionRegistry, HierarchicalBeanFactory, ListableBeanFactory};
use crate::scope::Scope;
use infrastructure_common::{Bean, BeanResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

/// 可配置的 bean 工厂
///
/// 在读取接口之上提供注册、后处理器、作用域和销毁等管理操作。
pub trait ConfigurableBeanFactory:
    HierarchicalBeanFactory + ListableBeanFactory + BeanDefinitionRegistry
{
    /// 容器配置
    fn config(&self) -> &ContainerConfig;

    /// 设置父工厂，只能在首次解析之前调用
    fn set_parent_bean_factory(&self, parent: Weak<dyn BeanFactory>) -> BeanResult<()>;

    /// 注册外部创建的单例，不经过生命周期回调
    fn register_singleton(&self, name: &str, bean: Bean) -> BeanResult<()>;

    /// 添加后处理器，按添加顺序调用
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 已添加的后处理器数量
    fn bean_post_processor_count(&self) -> usize;

    /// 注册自定义作用域
    fn register_scope(&self, name: &str, scope: Arc<dyn Scope>) -> BeanResult<()>;

    /// 已注册的自定义作用域名称
    fn registered_scope_names(&self) -> Vec<String>;

    /// 安装上下文级别的感知协作者
    fn set_aware_collaborators(&self, collaborators: AwareCollaborators);

    /// 按注册顺序实例化所有非抽象、非延迟的单例
    fn pre_instantiate_singletons(&self) -> BeanResult<()>;

    /// 单例是否已经创建
    fn contains_singleton(&self, name: &str) -> bool;

    /// 销毁单个单例（先销毁依赖它的 bean）
    fn destroy_singleton(&self, name: &str);

    /// 销毁所有单例
    fn destroy_singletons(&self);

    /// 运行统计
    fn stats(&self) -> ContainerStats;
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否允许同名定义覆盖
    pub allow_bean_definition_overriding: bool,
    /// 是否允许通过提前暴露的单例引用解决属性注入的循环依赖
    pub allow_circular_references: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 是否统计创建和解析错误次数
    pub track_statistics: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_bean_definition_overriding: true,
            allow_circular_references: true,
            max_resolution_depth: 100,
            track_statistics: true,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    /// 已注册定义数量
    pub registered_definitions: usize,
    /// 活跃单例数量
    pub active_singletons: usize,
    /// 已创建实例总数（含原型）
    pub created_instances: usize,
    /// 解析错误数量
    pub resolution_errors: usize,
}
