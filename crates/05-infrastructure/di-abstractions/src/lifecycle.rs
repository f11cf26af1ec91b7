//! bean 生命周期回调接口
//!
//! 感知接口在实例化和属性注入之后、初始化之前按固定顺序调用：
//!
//! 1. [`BeanNameAware`]
//! 2. [`BeanTypeAware`]
//! 3. [`BeanFactoryAware`]
//! 4. [`EnvironmentAware`]
//! 5. [`ResourceLoaderAware`]
//! 6. [`ApplicationEventPublisherAware`]
//! 7. [`MessageSourceAware`]
//! 8. [`ApplicationContextAware`]
//!
//! 之后依次是 [`BeanPostProcessor::post_process_before_initialization`]、
//! [`InitializingBean::after_properties_set`]、自定义初始化方法和
//! [`BeanPostProcessor::post_process_after_initialization`]。
//!
//! 回调都接收 `&self`，需要保存注入值的实现使用内部可变性。

use crate::context::{
    ApplicationContext, ApplicationEventPublisher, Environment, MessageSource, ResourceLoader,
};
use crate::factory::BeanFactory;
use infrastructure_common::{Bean, BeanType};
use std::sync::{Arc, Weak};

/// 感知自身在工厂中的名称
pub trait BeanNameAware: Send + Sync {
    fn set_bean_name(&self, name: &str) -> anyhow::Result<()>;
}

/// 感知自身的类型元数据
pub trait BeanTypeAware: Send + Sync {
    fn set_bean_type(&self, bean_type: Arc<BeanType>) -> anyhow::Result<()>;
}

/// 感知所属的 bean 工厂
///
/// 持有工厂会形成引用环，工厂在 `destroy_singletons` 时清空单例缓存来打破它。
pub trait BeanFactoryAware: Send + Sync {
    fn set_bean_factory(&self, factory: Arc<dyn BeanFactory>) -> anyhow::Result<()>;
}

/// 感知运行环境
pub trait EnvironmentAware: Send + Sync {
    fn set_environment(&self, environment: Arc<dyn Environment>) -> anyhow::Result<()>;
}

/// 感知资源加载器
pub trait ResourceLoaderAware: Send + Sync {
    fn set_resource_loader(&self, loader: Arc<dyn ResourceLoader>) -> anyhow::Result<()>;
}

/// 感知事件发布器
pub trait ApplicationEventPublisherAware: Send + Sync {
    fn set_application_event_publisher(
        &self,
        publisher: Arc<dyn ApplicationEventPublisher>,
    ) -> anyhow::Result<()>;
}

/// 感知消息源
pub trait MessageSourceAware: Send + Sync {
    fn set_message_source(&self, source: Arc<dyn MessageSource>) -> anyhow::Result<()>;
}

/// 感知应用上下文
///
/// 上下文以 `Weak` 形式注入，上下文关闭后升级会失败。
pub trait ApplicationContextAware: Send + Sync {
    fn set_application_context(&self, context: Weak<dyn ApplicationContext>)
        -> anyhow::Result<()>;
}

/// 所有属性设置完成后的初始化回调
pub trait InitializingBean: Send + Sync {
    fn after_properties_set(&self) -> anyhow::Result<()>;
}

/// 单例销毁回调
pub trait DisposableBean: Send + Sync {
    fn destroy(&self) -> anyhow::Result<()>;
}

/// 所有非延迟单例实例化完成后的回调
pub trait SmartInitializingSingleton: Send + Sync {
    fn after_singletons_instantiated(&self) -> anyhow::Result<()>;
}

/// bean 后处理器
///
/// 按注册顺序依次调用，每个处理器都可以返回替换后的实例。
pub trait BeanPostProcessor: Send + Sync {
    /// 处理器名称，用于日志
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 初始化回调之前调用
    fn post_process_before_initialization(&self, bean: Bean, _bean_name: &str) -> anyhow::Result<Bean> {
        Ok(bean)
    }

    /// 初始化回调之后调用
    fn post_process_after_initialization(&self, bean: Bean, _bean_name: &str) -> anyhow::Result<Bean> {
        Ok(bean)
    }

    /// 是否需要在销毁前处理该 bean
    fn requires_destruction(&self, _bean: &Bean) -> bool {
        false
    }

    /// 销毁回调之前调用
    fn post_process_before_destruction(&self, _bean: &Bean, _bean_name: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 上下文级别的感知协作者
///
/// 由应用上下文在刷新时安装到工厂，未安装的协作者对应的绑定阶段会被跳过。
#[derive(Clone, Default)]
pub struct AwareCollaborators {
    pub environment: Option<Arc<dyn Environment>>,
    pub resource_loader: Option<Arc<dyn ResourceLoader>>,
    pub event_publisher: Option<Arc<dyn ApplicationEventPublisher>>,
    pub message_source: Option<Arc<dyn MessageSource>>,
    pub application_context: Option<Weak<dyn ApplicationContext>>,
}

impl AwareCollaborators {
    pub fn is_empty(&self) -> bool {
        self.environment.is_none()
            && self.resource_loader.is_none()
            && self.event_publisher.is_none()
            && self.message_source.is_none()
            && self.application_context.is_none()
    }
}

/// 感知绑定阶段可用的信息
pub struct BindingContext<'a> {
    bean_name: &'a str,
    bean_type: &'a Arc<BeanType>,
    bean_factory: Option<Arc<dyn BeanFactory>>,
    collaborators: &'a AwareCollaborators,
}

impl<'a> BindingContext<'a> {
    pub fn new(
        bean_name: &'a str,
        bean_type: &'a Arc<BeanType>,
        bean_factory: Option<Arc<dyn BeanFactory>>,
        collaborators: &'a AwareCollaborators,
    ) -> Self {
        Self {
            bean_name,
            bean_type,
            bean_factory,
            collaborators,
        }
    }

    pub fn bean_name(&self) -> &str {
        self.bean_name
    }

    pub fn bean_type(&self) -> Arc<BeanType> {
        self.bean_type.clone()
    }

    pub fn bean_factory(&self) -> Option<Arc<dyn BeanFactory>> {
        self.bean_factory.clone()
    }

    pub fn collaborators(&self) -> &AwareCollaborators {
        self.collaborators
    }
}
