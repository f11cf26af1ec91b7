//! 应用上下文构建器

use crate::config::{ContextConfig, LoggingSettings};
use crate::context::{ContextParts, GenericApplicationContext};
use crate::support::{FileSystemResourceLoader, SimpleEventPublisher, StandardEnvironment, StaticMessageSource};
use di_abstractions::{
    ApplicationEventPublisher, BeanDefinitionReader, BeanFactory, BeanPostProcessor,
    ConfigurableBeanFactory, Environment, MessageSource, ResourceLoader, Scope,
};
use di_impl::DefaultBeanFactory;
use infrastructure_common::{ConfigError, InfrastructureError, InfrastructureResult};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

static LOGGING_INITIALIZED: OnceCell<()> = OnceCell::new();

/// 应用上下文构建器
///
/// 使用建造者模式组装协作者、后处理器、作用域和定义来源，
/// [`ApplicationContextBuilder::build`] 返回尚未刷新的上下文。
pub struct ApplicationContextBuilder {
    config: ContextConfig,
    parent: Option<Arc<GenericApplicationContext>>,
    environment: Option<Arc<dyn Environment>>,
    env_prefix: Option<String>,
    resource_loader: Option<Arc<dyn ResourceLoader>>,
    event_publisher: Option<Arc<dyn ApplicationEventPublisher>>,
    message_source: Option<Arc<dyn MessageSource>>,
    post_processors: Vec<Arc<dyn BeanPostProcessor>>,
    scopes: Vec<(String, Arc<dyn Scope>)>,
    readers: Vec<Box<dyn BeanDefinitionReader>>,
    logging: Option<LoggingConfig>,
}

impl ApplicationContextBuilder {
    /// 使用默认配置创建构建器
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    /// 使用指定配置创建构建器
    pub fn with_config(config: ContextConfig) -> Self {
        Self {
            config,
            parent: None,
            environment: None,
            env_prefix: None,
            resource_loader: None,
            event_publisher: None,
            message_source: None,
            post_processors: Vec::new(),
            scopes: Vec::new(),
            readers: Vec::new(),
            logging: None,
        }
    }

    /// 从 TOML 或 JSON 配置文件创建构建器
    pub fn from_file<P: AsRef<Path>>(path: P) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        info!("加载上下文配置: {}", path.display());
        Ok(Self::with_config(ContextConfig::from_file(path)?))
    }

    /// 设置上下文标识
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = Some(id.into());
        self
    }

    /// 设置应用名称
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.config.application_name = name.into();
        self
    }

    /// 设置显示名称
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.config.display_name = Some(name.into());
        self
    }

    /// 设置父上下文，本上下文的工厂以父上下文的工厂为父工厂
    pub fn parent(mut self, parent: Arc<GenericApplicationContext>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 设置运行环境，替换默认的 [`StandardEnvironment`]
    pub fn environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// 默认环境导入指定前缀的环境变量
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// 设置资源加载器
    pub fn resource_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = Some(loader);
        self
    }

    /// 设置事件发布器
    pub fn event_publisher(mut self, publisher: Arc<dyn ApplicationEventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// 设置消息源
    pub fn message_source(mut self, source: Arc<dyn MessageSource>) -> Self {
        self.message_source = Some(source);
        self
    }

    /// 添加后处理器，按添加顺序执行
    pub fn add_bean_post_processor(mut self, processor: Arc<dyn BeanPostProcessor>) -> Self {
        self.post_processors.push(processor);
        self
    }

    /// 注册自定义作用域
    pub fn register_scope(mut self, name: impl Into<String>, scope: Arc<dyn Scope>) -> Self {
        self.scopes.push((name.into(), scope));
        self
    }

    /// 添加定义来源
    pub fn add_definitions<R: BeanDefinitionReader + 'static>(mut self, reader: R) -> Self {
        self.readers.push(Box::new(reader));
        self
    }

    /// 构建时初始化日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 构建上下文，不刷新
    pub fn build(self) -> InfrastructureResult<Arc<GenericApplicationContext>> {
        let logging = match self.logging {
            Some(logging) => Some(logging),
            None if self.config.logging.enabled => Some(LoggingConfig::try_from(&self.config.logging)?),
            None => None,
        };
        if let Some(logging) = &logging {
            init_logging(logging)?;
        }

        self.config.validate()?;
        let id = self
            .config
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let display_name = self
            .config
            .display_name
            .clone()
            .unwrap_or_else(|| format!("GenericApplicationContext[{}]", id));
        info!("构建应用上下文: {}", display_name);

        let factory = match &self.parent {
            Some(parent) => {
                let parent_factory: Arc<dyn BeanFactory> = parent.bean_factory().clone();
                debug!("上下文 '{}' 的父上下文: {}", id, parent.bean_factory().id());
                DefaultBeanFactory::with_parent(self.config.container.clone(), &parent_factory)
            }
            None => DefaultBeanFactory::with_config(self.config.container.clone()),
        };

        for processor in self.post_processors {
            factory.add_bean_post_processor(processor);
        }
        for (name, scope) in self.scopes {
            factory.register_scope(&name, scope)?;
        }
        for reader in &self.readers {
            let count = reader.load_bean_definitions(factory.as_ref())?;
            debug!("定义来源注册了 {} 个定义", count);
        }

        let environment = self.environment.unwrap_or_else(|| {
            let environment = StandardEnvironment::new()
                .with_properties(self.config.properties.clone())
                .with_active_profiles(self.config.active_profiles.clone());
            match &self.env_prefix {
                Some(prefix) => Arc::new(environment.with_env_prefix(prefix)),
                None => Arc::new(environment),
            }
        });

        Ok(GenericApplicationContext::from_parts(ContextParts {
            id,
            application_name: self.config.application_name,
            display_name,
            factory,
            parent: self.parent,
            environment,
            resource_loader: self
                .resource_loader
                .unwrap_or_else(|| Arc::new(FileSystemResourceLoader::default())),
            event_publisher: self
                .event_publisher
                .unwrap_or_else(|| Arc::new(SimpleEventPublisher::new())),
            message_source: self
                .message_source
                .unwrap_or_else(|| Arc::new(StaticMessageSource::default())),
        }))
    }

    /// 构建并刷新上下文
    pub fn build_and_refresh(self) -> InfrastructureResult<Arc<GenericApplicationContext>> {
        let context = self.build()?;
        context.refresh()?;
        Ok(context)
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// `EnvFilter` 指令，设置后优先于 `level`
    pub filter: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            filter: None,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        let directives = self
            .filter
            .clone()
            .unwrap_or_else(|| self.level.to_string().to_lowercase());
        EnvFilter::try_new(&directives).map_err(|e| ConfigError::ValidationError {
            message: format!("无效的日志过滤指令 '{}': {}", directives, e),
        })
    }
}

impl TryFrom<&LoggingSettings> for LoggingConfig {
    type Error = ConfigError;

    fn try_from(settings: &LoggingSettings) -> Result<Self, Self::Error> {
        Ok(Self {
            level: settings.level()?,
            filter: settings.filter.clone(),
            show_target: settings.show_target,
            show_thread_ids: settings.show_thread_ids,
            show_file: settings.show_file,
            show_line_number: settings.show_line_number,
            json_format: settings.json_format,
        })
    }
}

/// 初始化全局日志订阅器
///
/// 进程内只能初始化一次，重复初始化返回 [`InfrastructureError::BootstrapFailed`]。
pub fn init_logging(config: &LoggingConfig) -> InfrastructureResult<()> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(InfrastructureError::BootstrapFailed {
            message: "日志系统已经初始化".to_string(),
        });
    }

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| InfrastructureError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    let _ = LOGGING_INITIALIZED.set(());
    info!("日志系统初始化完成");
    Ok(())
}
