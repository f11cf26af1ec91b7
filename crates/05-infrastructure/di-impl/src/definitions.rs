//! bean 定义存储

use di_abstractions::BeanDefinition;
use infrastructure_common::{BeanError, BeanResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Default)]
struct Inner {
    definitions: HashMap<String, Arc<BeanDefinition>>,
    order: Vec<String>,
}

/// 按规范名称保存定义，保留注册顺序
#[derive(Default)]
pub struct DefinitionStore {
    inner: RwLock<Inner>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册定义，返回被替换的旧定义
    ///
    /// 替换时保留原来的注册位置。
    pub fn register(
        &self,
        name: &str,
        definition: BeanDefinition,
        allow_override: bool,
    ) -> BeanResult<Option<Arc<BeanDefinition>>> {
        let mut inner = self.inner.write();
        if inner.definitions.contains_key(name) {
            if !allow_override {
                return Err(BeanError::conflict(name, "已存在同名定义且不允许覆盖"));
            }
            info!("覆盖 bean 定义: {}", name);
        } else {
            inner.order.push(name.to_string());
        }
        Ok(inner
            .definitions
            .insert(name.to_string(), Arc::new(definition)))
    }

    pub fn get(&self, name: &str) -> Option<Arc<BeanDefinition>> {
        self.inner.read().definitions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().definitions.contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<BeanDefinition>> {
        let mut inner = self.inner.write();
        let removed = inner.definitions.remove(name)?;
        inner.order.retain(|n| n != name);
        Some(removed)
    }

    /// 所有名称，按注册顺序
    pub fn names(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按注册顺序的快照
    pub fn snapshot(&self) -> Vec<(String, Arc<BeanDefinition>)> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|name| {
                inner
                    .definitions
                    .get(name)
                    .map(|definition| (name.clone(), definition.clone()))
            })
            .collect()
    }
}
