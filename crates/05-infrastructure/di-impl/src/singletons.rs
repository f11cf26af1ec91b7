//! 单例注册表
//!
//! 保存已完成的单例、创建中提前暴露的引用、依赖关系和销毁适配器。
//! 单例的创建由一把可重入锁串行化：同一线程可以嵌套创建依赖，
//! 其他线程等待创建完成后直接命中缓存。

use crate::lifecycle::DisposableBeanAdapter;
use dashmap::DashMap;
use infrastructure_common::{Bean, BeanError, BeanResult};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};
use tracing::{debug, info, trace};

struct EarlyReference {
    owner: ThreadId,
    bean: Bean,
    exposed: bool,
}

/// 单例注册表
pub struct SingletonRegistry {
    singletons: DashMap<String, Bean>,
    early_references: DashMap<String, EarlyReference>,
    registration_order: RwLock<Vec<String>>,
    manual_singletons: RwLock<Vec<String>>,
    in_creation: Mutex<HashSet<String>>,
    disposables: Mutex<HashMap<String, DisposableBeanAdapter>>,
    dependent_beans: Mutex<HashMap<String, Vec<String>>>,
    dependencies: Mutex<HashMap<String, Vec<String>>>,
    creation_lock: ReentrantMutex<()>,
    destroying: AtomicBool,
}

impl Default for SingletonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self {
            singletons: DashMap::new(),
            early_references: DashMap::new(),
            registration_order: RwLock::new(Vec::new()),
            manual_singletons: RwLock::new(Vec::new()),
            in_creation: Mutex::new(HashSet::new()),
            disposables: Mutex::new(HashMap::new()),
            dependent_beans: Mutex::new(HashMap::new()),
            dependencies: Mutex::new(HashMap::new()),
            creation_lock: ReentrantMutex::new(()),
            destroying: AtomicBool::new(false),
        }
    }

    /// 获取单例创建锁
    pub fn creation_lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.creation_lock.lock()
    }

    /// 获取单例
    ///
    /// `allow_early` 为 `true` 时，创建线程自身可以拿到提前暴露的引用。
    pub fn get(&self, name: &str, allow_early: bool) -> Option<Bean> {
        if let Some(bean) = self.singletons.get(name) {
            trace!("命中单例缓存: {}", name);
            return Some(bean.value().clone());
        }
        if !allow_early {
            return None;
        }
        let mut early = self.early_references.get_mut(name)?;
        if early.owner != thread::current().id() {
            return None;
        }
        early.exposed = true;
        debug!("返回创建中 bean '{}' 的提前引用", name);
        Some(early.bean.clone())
    }

    /// 是否存在已完成的单例
    pub fn contains(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    /// 外部注册的单例名称，按注册顺序
    pub fn manual_names(&self) -> Vec<String> {
        self.manual_singletons.read().clone()
    }

    /// 所有单例名称，按完成顺序
    pub fn names(&self) -> Vec<String> {
        self.registration_order.read().clone()
    }

    pub fn len(&self) -> usize {
        self.singletons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty()
    }

    /// 注册外部创建的单例
    pub fn register_manual(&self, name: &str, bean: Bean) -> BeanResult<()> {
        let _lock = self.creation_lock();
        if self.singletons.contains_key(name) {
            return Err(BeanError::conflict(name, "已存在同名单例"));
        }
        self.manual_singletons.write().push(name.to_string());
        self.add(name, bean);
        info!("注册外部单例: {}", name);
        Ok(())
    }

    /// 标记开始创建
    ///
    /// 名称已经在创建中（同一线程的嵌套进入）时返回 `false`，
    /// 这时标记由最外层负责清除。
    pub fn begin_creation(&self, name: &str) -> bool {
        self.in_creation.lock().insert(name.to_string())
    }

    /// 标记创建结束
    pub fn end_creation(&self, name: &str) {
        self.in_creation.lock().remove(name);
    }

    pub fn is_in_creation(&self, name: &str) -> bool {
        self.in_creation.lock().contains(name)
    }

    /// 提前暴露实例化完成但尚未初始化的引用
    pub fn add_early_reference(&self, name: &str, bean: Bean) {
        self.early_references.insert(
            name.to_string(),
            EarlyReference {
                owner: thread::current().id(),
                bean,
                exposed: false,
            },
        );
    }

    /// 提前引用是否已经被其他 bean 使用
    pub fn early_reference_exposed(&self, name: &str) -> bool {
        self.early_references
            .get(name)
            .map_or(false, |early| early.exposed)
    }

    /// 保存创建完成的单例
    pub fn add(&self, name: &str, bean: Bean) {
        self.early_references.remove(name);
        self.singletons.insert(name.to_string(), bean);
        let mut order = self.registration_order.write();
        if !order.iter().any(|n| n == name) {
            order.push(name.to_string());
        }
    }

    /// 注册销毁适配器
    pub fn register_disposable(&self, adapter: DisposableBeanAdapter) {
        self.disposables
            .lock()
            .insert(adapter.name().to_string(), adapter);
    }

    /// 记录 `dependent` 依赖于 `bean`
    pub fn register_dependent(&self, bean: &str, dependent: &str) {
        if bean == dependent {
            return;
        }
        let mut dependents = self.dependent_beans.lock();
        let entry = dependents.entry(bean.to_string()).or_default();
        if !entry.iter().any(|n| n == dependent) {
            entry.push(dependent.to_string());
        }
        drop(dependents);
        let mut dependencies = self.dependencies.lock();
        let entry = dependencies.entry(dependent.to_string()).or_default();
        if !entry.iter().any(|n| n == bean) {
            entry.push(bean.to_string());
        }
    }

    /// 依赖于 `bean` 的 bean
    pub fn dependents_of(&self, bean: &str) -> Vec<String> {
        self.dependent_beans
            .lock()
            .get(bean)
            .cloned()
            .unwrap_or_default()
    }

    /// `bean` 依赖的 bean
    pub fn dependencies_of(&self, bean: &str) -> Vec<String> {
        self.dependencies
            .lock()
            .get(bean)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_destroying(&self) -> bool {
        self.destroying.load(Ordering::SeqCst)
    }

    /// 移除缓存，不执行销毁回调
    pub fn remove(&self, name: &str) -> Option<Bean> {
        self.early_references.remove(name);
        self.manual_singletons.write().retain(|n| n != name);
        self.registration_order.write().retain(|n| n != name);
        self.singletons.remove(name).map(|(_, bean)| bean)
    }

    /// 销毁单个单例，依赖它的 bean 先被销毁
    pub fn destroy_singleton(&self, name: &str) {
        let _lock = self.creation_lock();
        self.remove(name);
        let adapter = self.disposables.lock().remove(name);
        self.destroy_bean(name, adapter);
    }

    fn destroy_bean(&self, name: &str, adapter: Option<DisposableBeanAdapter>) {
        let dependents = self.dependent_beans.lock().remove(name);
        if let Some(dependents) = dependents {
            debug!("销毁 '{}' 之前先销毁依赖它的 bean: {:?}", name, dependents);
            for dependent in dependents {
                self.destroy_singleton(&dependent);
            }
        }

        if let Some(adapter) = adapter {
            adapter.destroy();
        }

        self.dependent_beans
            .lock()
            .values_mut()
            .for_each(|dependents| dependents.retain(|n| n != name));
        self.dependencies.lock().remove(name);
    }

    /// 按注册顺序的逆序销毁所有单例
    pub fn destroy_all(&self) {
        let _lock = self.creation_lock();
        self.destroying.store(true, Ordering::SeqCst);

        let order = self.names();
        let disposable_names: Vec<String> = {
            let disposables = self.disposables.lock();
            order
                .iter()
                .filter(|name| disposables.contains_key(*name))
                .cloned()
                .collect()
        };
        info!("销毁 {} 个单例", order.len());
        for name in disposable_names.iter().rev() {
            self.destroy_singleton(name);
        }

        let leftover: Vec<DisposableBeanAdapter> =
            self.disposables.lock().drain().map(|(_, adapter)| adapter).collect();
        for adapter in leftover {
            adapter.destroy();
        }

        self.singletons.clear();
        self.early_references.clear();
        self.registration_order.write().clear();
        self.manual_singletons.write().clear();
        self.dependent_beans.lock().clear();
        self.dependencies.lock().clear();
        self.destroying.store(false, Ordering::SeqCst);
    }
}
