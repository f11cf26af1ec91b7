//! 基于内存映射的自定义作用域

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use di_abstractions::Scope;
use infrastructure_common::{Bean, BeanResult};
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

type DestructionCallback = Box<dyn FnOnce() + Send>;

/// 内存作用域
///
/// 对象在作用域关闭前一直被缓存，关闭时按注册顺序的逆序执行销毁回调。
/// 适合表示一次会话、一次请求之类有明确边界的生命周期。
///
/// 同一名称的创建按名称串行：并发请求只有一个执行创建，其余等待后命中缓存。
pub struct MapScope {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    objects: DashMap<String, Bean>,
    creation_locks: DashMap<String, Arc<ReentrantMutex<()>>>,
    callbacks: Mutex<Vec<(String, DestructionCallback)>>,
}

impl MapScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            objects: DashMap::new(),
            creation_locks: DashMap::new(),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    fn cached(&self, name: &str) -> Option<Bean> {
        self.objects.get(name).map(|bean| bean.value().clone())
    }

    /// 关闭作用域，清空对象并执行销毁回调
    pub fn close(&self) {
        let callbacks: Vec<_> = std::mem::take(&mut *self.callbacks.lock());
        info!(
            "关闭作用域 '{}' ({})，{} 个对象，{} 个销毁回调",
            self.name,
            self.id,
            self.objects.len(),
            callbacks.len()
        );
        self.objects.clear();
        self.creation_locks.clear();
        for (name, callback) in callbacks.into_iter().rev() {
            debug!("作用域 '{}' 销毁对象 '{}'", self.name, name);
            callback();
        }
    }
}

impl Scope for MapScope {
    fn get(
        &self,
        name: &str,
        object_factory: &mut dyn FnMut() -> BeanResult<Bean>,
    ) -> BeanResult<Bean> {
        if let Some(existing) = self.cached(name) {
            return Ok(existing);
        }
        // 可重入：同一线程内的循环由解析链检测报告，而不是在这里死锁
        let lock = self
            .creation_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
            .value()
            .clone();
        let _guard = lock.lock();
        if let Some(existing) = self.cached(name) {
            return Ok(existing);
        }
        let created = object_factory()?;
        self.objects.insert(name.to_string(), created.clone());
        debug!("作用域 '{}' 创建对象 '{}'", self.name, name);
        Ok(created)
    }

    fn remove(&self, name: &str) -> Option<Bean> {
        self.callbacks.lock().retain(|(n, _)| n != name);
        self.objects.remove(name).map(|(_, bean)| bean)
    }

    fn register_destruction_callback(&self, name: &str, callback: Box<dyn FnOnce() + Send>) {
        self.callbacks.lock().push((name.to_string(), callback));
    }

    fn conversation_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}
