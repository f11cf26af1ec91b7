//! 应用上下文及其协作者接口
//!
//! 环境、资源加载、事件发布和消息源都只通过这里的接口使用，容器本身不实现它们。

use crate::registry::{HierarchicalBeanFactory, ListableBeanFactory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 运行环境
pub trait Environment: Send + Sync {
    /// 获取属性值
    fn get_property(&self, key: &str) -> Option<String>;

    /// 获取属性值，不存在时返回默认值
    fn get_property_or(&self, key: &str, default: &str) -> String {
        self.get_property(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// 是否包含属性
    fn contains_property(&self, key: &str) -> bool {
        self.get_property(key).is_some()
    }

    /// 激活的 profile
    fn active_profiles(&self) -> Vec<String>;

    /// 是否激活了指定 profile
    fn accepts_profile(&self, profile: &str) -> bool {
        self.active_profiles().iter().any(|p| p == profile)
    }
}

/// 资源加载器
pub trait ResourceLoader: Send + Sync {
    /// 资源是否存在
    fn exists(&self, location: &str) -> bool;

    /// 读取资源内容
    fn load(&self, location: &str) -> anyhow::Result<Vec<u8>>;

    /// 读取资源为 UTF-8 字符串
    fn load_to_string(&self, location: &str) -> anyhow::Result<String> {
        Ok(String::from_utf8(self.load(location)?)?)
    }
}

/// 应用事件
#[derive(Clone)]
pub struct ApplicationEvent {
    source: String,
    timestamp: DateTime<Utc>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ApplicationEvent {
    /// 创建事件
    pub fn new<T: Send + Sync + 'static>(source: impl Into<String>, payload: T) -> Self {
        Self {
            source: source.into(),
            timestamp: Utc::now(),
            payload: Arc::new(payload),
        }
    }

    /// 事件来源
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 事件发生时间
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// 按类型读取事件负载
    pub fn payload<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// 负载是否为指定类型
    pub fn is<T: 'static>(&self) -> bool {
        self.payload.is::<T>()
    }
}

impl fmt::Debug for ApplicationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationEvent")
            .field("source", &self.source)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// 应用事件发布器
#[async_trait]
pub trait ApplicationEventPublisher: Send + Sync {
    /// 同步发布事件
    fn publish_event(&self, event: ApplicationEvent);

    /// 异步发布事件
    async fn publish_event_async(&self, event: ApplicationEvent) {
        self.publish_event(event);
    }
}

/// 消息源
pub trait MessageSource: Send + Sync {
    /// 解析消息，`{0}`、`{1}` 等占位符按位置替换为参数
    fn get_message(&self, code: &str, args: &[String], locale: &str) -> Option<String>;

    /// 解析消息，找不到时使用默认值
    fn get_message_or_default(
        &self,
        code: &str,
        args: &[String],
        default: &str,
        locale: &str,
    ) -> String {
        self.get_message(code, args, locale)
            .unwrap_or_else(|| default.to_string())
    }
}

/// 应用上下文
///
/// 在可枚举、可分层的 bean 工厂之上提供上下文标识和协作者访问。
pub trait ApplicationContext: ListableBeanFactory + HierarchicalBeanFactory {
    /// 上下文唯一标识
    fn id(&self) -> &str;

    /// 所属应用名称
    fn application_name(&self) -> &str;

    /// 友好的显示名称
    fn display_name(&self) -> &str;

    /// 首次刷新时间，尚未刷新时为 `None`
    fn startup_date(&self) -> Option<DateTime<Utc>>;

    /// 父上下文
    fn parent(&self) -> Option<Arc<dyn ApplicationContext>>;

    /// 运行环境
    fn environment(&self) -> Arc<dyn Environment>;

    /// 资源加载器
    fn resource_loader(&self) -> Arc<dyn ResourceLoader>;

    /// 事件发布器
    fn event_publisher(&self) -> Arc<dyn ApplicationEventPublisher>;

    /// 消息源
    fn message_source(&self) -> Arc<dyn MessageSource>;
}
