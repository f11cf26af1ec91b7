//! bean 生命周期阶段定义

use std::fmt;

/// bean 生命周期中的单个阶段
///
/// 创建失败时通过 [`crate::BeanError::BeanCreation`] 报告失败发生的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleStep {
    /// 解析 depends-on 声明的前置 bean
    DependsOn,
    /// 调用构造函数、工厂方法或 supplier
    Instantiation,
    /// 注入属性值（setter 风格注入）
    PropertyPopulation,
    /// 绑定 bean 名称
    NameBinding,
    /// 绑定 bean 类型元数据
    TypeBinding,
    /// 绑定所属的 bean 工厂
    RegistryBinding,
    /// 绑定运行环境
    EnvironmentBinding,
    /// 绑定资源加载器
    ResourceLoaderBinding,
    /// 绑定事件发布器
    EventPublisherBinding,
    /// 绑定消息源
    MessageSourceBinding,
    /// 绑定应用上下文
    ContextBinding,
    /// 初始化前的后处理器
    PreInitialization,
    /// 标准初始化回调
    Initialization,
    /// 自定义初始化方法
    CustomInitialization,
    /// 初始化后的后处理器
    PostInitialization,
    /// 从 FactoryBean 获取产品对象
    FactoryObject,
    /// 所有单例实例化完成后的回调
    AfterSingletonsInstantiated,
    /// 销毁前的后处理器
    PreDestruction,
    /// 标准销毁回调
    Destroy,
    /// 自定义销毁方法
    CustomDestroy,
}

impl LifecycleStep {
    /// 实例化之后依次执行的感知绑定阶段
    pub const BINDING_SEQUENCE: [Self; 8] = [
        Self::NameBinding,
        Self::TypeBinding,
        Self::RegistryBinding,
        Self::EnvironmentBinding,
        Self::ResourceLoaderBinding,
        Self::EventPublisherBinding,
        Self::MessageSourceBinding,
        Self::ContextBinding,
    ];

    /// 完整的创建顺序
    pub const CREATION_SEQUENCE: [Self; 14] = [
        Self::Instantiation,
        Self::PropertyPopulation,
        Self::NameBinding,
        Self::TypeBinding,
        Self::RegistryBinding,
        Self::EnvironmentBinding,
        Self::ResourceLoaderBinding,
        Self::EventPublisherBinding,
        Self::MessageSourceBinding,
        Self::ContextBinding,
        Self::PreInitialization,
        Self::Initialization,
        Self::CustomInitialization,
        Self::PostInitialization,
    ];

    /// 销毁顺序
    pub const DESTRUCTION_SEQUENCE: [Self; 3] =
        [Self::PreDestruction, Self::Destroy, Self::CustomDestroy];

    /// 阶段名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependsOn => "depends-on",
            Self::Instantiation => "instantiation",
            Self::PropertyPopulation => "property-population",
            Self::NameBinding => "name-binding",
            Self::TypeBinding => "type-binding",
            Self::RegistryBinding => "registry-binding",
            Self::EnvironmentBinding => "environment-binding",
            Self::ResourceLoaderBinding => "resource-loader-binding",
            Self::EventPublisherBinding => "event-publisher-binding",
            Self::MessageSourceBinding => "message-source-binding",
            Self::ContextBinding => "context-binding",
            Self::PreInitialization => "pre-initialization",
            Self::Initialization => "initialization",
            Self::CustomInitialization => "custom-initialization",
            Self::PostInitialization => "post-initialization",
            Self::FactoryObject => "factory-object",
            Self::AfterSingletonsInstantiated => "after-singletons-instantiated",
            Self::PreDestruction => "pre-destruction",
            Self::Destroy => "destroy",
            Self::CustomDestroy => "custom-destroy",
        }
    }

    /// 是否属于销毁阶段
    pub fn is_destruction(&self) -> bool {
        Self::DESTRUCTION_SEQUENCE.contains(self)
    }
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
