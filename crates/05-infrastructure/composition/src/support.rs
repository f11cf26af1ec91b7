//! 上下文协作者的默认实现

use anyhow::Context as _;
use dashmap::DashMap;
use di_abstractions::{ApplicationEvent, ApplicationEventPublisher, Environment, MessageSource, ResourceLoader};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 基于内存属性表的环境
///
/// 通过 [`StandardEnvironment::with_env_prefix`] 导入的环境变量优先于普通属性。
/// 变量 `APP_DB_URL` 在前缀为 `APP` 时对应属性 `db.url`。
#[derive(Debug, Default)]
pub struct StandardEnvironment {
    properties: RwLock<HashMap<String, String>>,
    overrides: RwLock<HashMap<String, String>>,
    active_profiles: RwLock<Vec<String>>,
}

impl StandardEnvironment {
    /// 创建空环境
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加属性
    pub fn with_properties(self, properties: HashMap<String, String>) -> Self {
        self.properties.write().extend(properties);
        self
    }

    /// 设置激活的 profile
    pub fn with_active_profiles(self, profiles: Vec<String>) -> Self {
        *self.active_profiles.write() = profiles;
        self
    }

    /// 导入指定前缀的环境变量
    pub fn with_env_prefix(self, prefix: &str) -> Self {
        self.import_variables(std::env::vars(), prefix);
        self
    }

    fn import_variables(&self, variables: impl Iterator<Item = (String, String)>, prefix: &str) {
        let mut overrides = self.overrides.write();
        for (key, value) in variables {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            let property = rest.trim_start_matches('_').replace('_', ".").to_lowercase();
            if !property.is_empty() {
                overrides.insert(property, value);
            }
        }
        debug!("导入了 {} 个环境变量，前缀: {}", overrides.len(), prefix);
    }

    /// 设置属性
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(key.into(), value.into());
    }

    /// 设置激活的 profile
    pub fn set_active_profiles(&self, profiles: Vec<String>) {
        *self.active_profiles.write() = profiles;
    }
}

impl Environment for StandardEnvironment {
    fn get_property(&self, key: &str) -> Option<String> {
        if let Some(value) = self.overrides.read().get(key) {
            return Some(value.clone());
        }
        self.properties.read().get(key).cloned()
    }

    fn active_profiles(&self) -> Vec<String> {
        self.active_profiles.read().clone()
    }
}

/// 文件系统资源加载器
///
/// 位置可以带 `file:` 前缀；相对路径基于构造时给出的根目录。
#[derive(Debug, Clone)]
pub struct FileSystemResourceLoader {
    root: PathBuf,
}

impl FileSystemResourceLoader {
    /// 以 `root` 为根目录创建加载器
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let location = location.strip_prefix("file:").unwrap_or(location);
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Default for FileSystemResourceLoader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResourceLoader for FileSystemResourceLoader {
    fn exists(&self, location: &str) -> bool {
        self.resolve(location).is_file()
    }

    fn load(&self, location: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.resolve(location);
        std::fs::read(&path).with_context(|| format!("读取资源失败: {}", path.display()))
    }
}

type EventListener = Arc<dyn Fn(&ApplicationEvent) + Send + Sync>;

/// 同步事件发布器
///
/// 按注册顺序把事件交给所有监听器。
#[derive(Default)]
pub struct SimpleEventPublisher {
    listeners: RwLock<Vec<EventListener>>,
    published: AtomicUsize,
}

impl SimpleEventPublisher {
    /// 创建没有监听器的发布器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册监听器
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&ApplicationEvent) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// 已发布的事件数量
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

impl ApplicationEventPublisher for SimpleEventPublisher {
    fn publish_event(&self, event: ApplicationEvent) {
        let listeners = self.listeners.read().clone();
        debug!(
            "发布事件，来源: {}，监听器: {}",
            event.source(),
            listeners.len()
        );
        for listener in &listeners {
            listener(&event);
        }
        self.published.fetch_add(1, Ordering::Relaxed);
    }
}

/// 静态消息源
///
/// 按 (语言, 代码) 保存消息模板，找不到指定语言时回退到默认语言。
#[derive(Debug)]
pub struct StaticMessageSource {
    messages: DashMap<(String, String), String>,
    default_locale: String,
}

impl StaticMessageSource {
    /// 创建消息源，默认语言为 `default_locale`
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            messages: DashMap::new(),
            default_locale: default_locale.into(),
        }
    }

    /// 添加消息模板
    pub fn add_message(&self, code: impl Into<String>, locale: impl Into<String>, template: impl Into<String>) {
        self.messages
            .insert((locale.into(), code.into()), template.into());
    }

    fn template(&self, code: &str, locale: &str) -> Option<String> {
        self.messages
            .get(&(locale.to_string(), code.to_string()))
            .or_else(|| {
                self.messages
                    .get(&(self.default_locale.clone(), code.to_string()))
            })
            .map(|entry| entry.value().clone())
    }
}

impl Default for StaticMessageSource {
    fn default() -> Self {
        Self::new("en")
    }
}

impl MessageSource for StaticMessageSource {
    fn get_message(&self, code: &str, args: &[String], locale: &str) -> Option<String> {
        let template = self.template(code, locale)?;
        Some(
            args.iter()
                .enumerate()
                .fold(template, |message, (index, arg)| {
                    message.replace(&format!("{{{index}}}"), arg)
                }),
        )
    }
}
