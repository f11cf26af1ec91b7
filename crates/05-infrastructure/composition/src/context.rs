//! 通用应用上下文

use chrono::{DateTime, Utc};
use di_abstractions::{
    ApplicationContext, ApplicationEvent, ApplicationEventPublisher, AwareCollaborators, BeanDefinition,
    BeanDefinitionRegistry, BeanFactory, ConfigurableBeanFactory, ConstructorArg, ContainerStats,
    Environment, HierarchicalBeanFactory, ListableBeanFactory, MessageSource, ResourceLoader, TypeMatch,
};
use di_impl::DefaultBeanFactory;
use infrastructure_common::{Bean, BeanResult, BeanType, InfrastructureError, InfrastructureResult, TypeInfo};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{error, info, warn};
use uuid::Uuid;

/// 上下文状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextStatus {
    /// 已创建，尚未刷新
    Created,
    /// 刷新完成，可以使用
    Active,
    /// 刷新失败，单例已销毁
    Failed,
    /// 已关闭
    Closed,
}

/// 刷新完成后发布的事件负载
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRefreshedEvent {
    /// 上下文标识
    pub context_id: String,
}

/// 关闭时发布的事件负载
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextClosedEvent {
    /// 上下文标识
    pub context_id: String,
}

pub(crate) struct ContextParts {
    pub id: String,
    pub application_name: String,
    pub display_name: String,
    pub factory: Arc<DefaultBeanFactory>,
    pub parent: Option<Arc<GenericApplicationContext>>,
    pub environment: Arc<dyn Environment>,
    pub resource_loader: Arc<dyn ResourceLoader>,
    pub event_publisher: Arc<dyn ApplicationEventPublisher>,
    pub message_source: Arc<dyn MessageSource>,
}

/// 通用应用上下文
///
/// 包装一个 [`DefaultBeanFactory`]，在刷新时安装环境、资源加载器、事件发布器、
/// 消息源和上下文自身等协作者，然后预实例化所有非延迟单例。
/// 通过 [`crate::ApplicationContextBuilder`] 构建。
pub struct GenericApplicationContext {
    id: String,
    application_name: String,
    display_name: String,
    self_ref: Weak<GenericApplicationContext>,
    factory: Arc<DefaultBeanFactory>,
    parent: Option<Arc<GenericApplicationContext>>,
    environment: Arc<dyn Environment>,
    resource_loader: Arc<dyn ResourceLoader>,
    event_publisher: Arc<dyn ApplicationEventPublisher>,
    message_source: Arc<dyn MessageSource>,
    startup_date: RwLock<Option<DateTime<Utc>>>,
    status: RwLock<ContextStatus>,
    lifecycle_lock: Mutex<()>,
}

impl GenericApplicationContext {
    pub(crate) fn from_parts(parts: ContextParts) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id: parts.id,
            application_name: parts.application_name,
            display_name: parts.display_name,
            self_ref: self_ref.clone(),
            factory: parts.factory,
            parent: parts.parent,
            environment: parts.environment,
            resource_loader: parts.resource_loader,
            event_publisher: parts.event_publisher,
            message_source: parts.message_source,
            startup_date: RwLock::new(None),
            status: RwLock::new(ContextStatus::Created),
            lifecycle_lock: Mutex::new(()),
        })
    }

    /// 底层 bean 工厂
    pub fn bean_factory(&self) -> &Arc<DefaultBeanFactory> {
        &self.factory
    }

    /// 当前状态
    pub fn status(&self) -> ContextStatus {
        *self.status.read()
    }

    /// 是否已刷新且未关闭
    pub fn is_active(&self) -> bool {
        self.status() == ContextStatus::Active
    }

    /// 容器统计
    pub fn stats(&self) -> ContainerStats {
        self.factory.stats()
    }

    /// 刷新上下文
    ///
    /// 每个上下文只能刷新一次；预实例化失败时销毁已创建的单例并进入
    /// [`ContextStatus::Failed`]。
    pub fn refresh(&self) -> InfrastructureResult<()> {
        let _lifecycle = self.lifecycle_lock.lock();
        let status = self.status();
        if status != ContextStatus::Created {
            return Err(InfrastructureError::BootstrapFailed {
                message: format!("上下文 '{}' 当前状态为 {:?}，不能再次刷新", self.id, status),
            });
        }

        info!("刷新应用上下文: {}", self.display_name);
        let context: Weak<dyn ApplicationContext> = self.self_ref.clone();
        self.factory.set_aware_collaborators(AwareCollaborators {
            environment: Some(self.environment.clone()),
            resource_loader: Some(self.resource_loader.clone()),
            event_publisher: Some(self.event_publisher.clone()),
            message_source: Some(self.message_source.clone()),
            application_context: Some(context),
        });
        *self.startup_date.write() = Some(Utc::now());

        if let Err(e) = self.factory.pre_instantiate_singletons() {
            error!("上下文 '{}' 预实例化单例失败: {}", self.id, e);
            self.factory.destroy_singletons();
            *self.status.write() = ContextStatus::Failed;
            return Err(e.into());
        }
        *self.status.write() = ContextStatus::Active;

        info!(
            "应用上下文 '{}' 刷新完成，单例 {} 个",
            self.id,
            self.factory.stats().active_singletons
        );
        self.event_publisher.publish_event(ApplicationEvent::new(
            self.id.clone(),
            ContextRefreshedEvent {
                context_id: self.id.clone(),
            },
        ));
        Ok(())
    }

    /// 关闭上下文并销毁所有单例，重复调用无副作用
    pub fn close(&self) {
        let _lifecycle = self.lifecycle_lock.lock();
        match self.status() {
            ContextStatus::Closed => return,
            ContextStatus::Active => {
                self.event_publisher.publish_event(ApplicationEvent::new(
                    self.id.clone(),
                    ContextClosedEvent {
                        context_id: self.id.clone(),
                    },
                ));
            }
            ContextStatus::Created | ContextStatus::Failed => {}
        }
        info!("关闭应用上下文: {}", self.display_name);
        self.factory.destroy_singletons();
        *self.status.write() = ContextStatus::Closed;
    }

    fn ensure_not_closed(&self) {
        if self.status() == ContextStatus::Closed {
            warn!("上下文 '{}' 已关闭，仍在访问 bean", self.id);
        }
    }
}

impl Drop for GenericApplicationContext {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for GenericApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericApplicationContext")
            .field("id", &self.id)
            .field("application_name", &self.application_name)
            .field("status", &self.status())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl BeanFactory for GenericApplicationContext {
    fn get_bean(&self, name: &str) -> BeanResult<Bean> {
        self.ensure_not_closed();
        self.factory.get_bean(name)
    }

    fn get_bean_of_type(&self, name: &str, required_type: &TypeInfo) -> BeanResult<Bean> {
        self.ensure_not_closed();
        self.factory.get_bean_of_type(name, required_type)
    }

    fn get_bean_with_args(&self, name: &str, args: Vec<ConstructorArg>) -> BeanResult<Bean> {
        self.ensure_not_closed();
        self.factory.get_bean_with_args(name, args)
    }

    fn get_bean_by_type(&self, required_type: &TypeInfo) -> BeanResult<Bean> {
        self.ensure_not_closed();
        self.factory.get_bean_by_type(required_type)
    }

    fn get_bean_by_type_with_args(
        &self,
        required_type: &TypeInfo,
        args: Vec<ConstructorArg>,
    ) -> BeanResult<Bean> {
        self.ensure_not_closed();
        self.factory.get_bean_by_type_with_args(required_type, args)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.factory.contains_bean(name)
    }

    fn is_singleton(&self, name: &str) -> BeanResult<bool> {
        self.factory.is_singleton(name)
    }

    fn is_prototype(&self, name: &str) -> BeanResult<bool> {
        self.factory.is_prototype(name)
    }

    fn is_type_match(
        &self,
        name: &str,
        type_to_match: &TypeInfo,
        allow_factory_bean_init: bool,
    ) -> BeanResult<TypeMatch> {
        self.factory
            .is_type_match(name, type_to_match, allow_factory_bean_init)
    }

    fn get_type(&self, name: &str, allow_factory_bean_init: bool) -> BeanResult<Option<Arc<BeanType>>> {
        self.factory.get_type(name, allow_factory_bean_init)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        self.factory.get_aliases(name)
    }

    fn factory_id(&self) -> Option<Uuid> {
        self.factory.factory_id()
    }

    fn delegation_parent(&self) -> Option<Arc<dyn BeanFactory>> {
        self.factory.delegation_parent()
    }
}

impl HierarchicalBeanFactory for GenericApplicationContext {
    fn parent_bean_factory(&self) -> Option<Arc<dyn BeanFactory>> {
        self.factory.parent_bean_factory()
    }

    fn contains_local_bean(&self, name: &str) -> bool {
        self.factory.contains_local_bean(name)
    }
}

impl ListableBeanFactory for GenericApplicationContext {
    fn contains_bean_definition(&self, name: &str) -> bool {
        self.factory.contains_bean_definition(name)
    }

    fn bean_definition_count(&self) -> usize {
        self.factory.bean_definition_count()
    }

    fn bean_definition_names(&self) -> Vec<String> {
        self.factory.bean_definition_names()
    }

    fn bean_names_for_type(
        &self,
        ty: &TypeInfo,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String> {
        self.factory
            .bean_names_for_type(ty, include_non_singletons, allow_eager_init)
    }

    fn beans_of_type(&self, ty: &TypeInfo) -> BeanResult<Vec<(String, Bean)>> {
        self.factory.beans_of_type(ty)
    }
}

impl BeanDefinitionRegistry for GenericApplicationContext {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()> {
        self.factory.register_bean_definition(name, definition)
    }

    fn remove_bean_definition(&self, name: &str) -> BeanResult<()> {
        self.factory.remove_bean_definition(name)
    }

    fn bean_definition(&self, name: &str) -> BeanResult<Arc<BeanDefinition>> {
        self.factory.bean_definition(name)
    }

    fn is_bean_name_in_use(&self, name: &str) -> bool {
        self.factory.is_bean_name_in_use(name)
    }

    fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()> {
        self.factory.register_alias(name, alias)
    }

    fn remove_alias(&self, alias: &str) -> BeanResult<()> {
        self.factory.remove_alias(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.factory.is_alias(name)
    }
}

impl ApplicationContext for GenericApplicationContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn application_name(&self) -> &str {
        &self.application_name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn startup_date(&self) -> Option<DateTime<Utc>> {
        *self.startup_date.read()
    }

    fn parent(&self) -> Option<Arc<dyn ApplicationContext>> {
        self.parent
            .clone()
            .map(|parent| parent as Arc<dyn ApplicationContext>)
    }

    fn environment(&self) -> Arc<dyn Environment> {
        self.environment.clone()
    }

    fn resource_loader(&self) -> Arc<dyn ResourceLoader> {
        self.resource_loader.clone()
    }

    fn event_publisher(&self) -> Arc<dyn ApplicationEventPublisher> {
        self.event_publisher.clone()
    }

    fn message_source(&self) -> Arc<dyn MessageSource> {
        self.message_source.clone()
    }
}
