//! 别名表
//!
//! 别名只有一层：别名必须指向规范名称，不能指向另一个别名。

use infrastructure_common::{BeanError, BeanResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Default)]
struct Aliases {
    targets: HashMap<String, String>,
    order: Vec<String>,
}

/// 别名到规范名称的映射，保留注册顺序
#[derive(Default)]
pub struct AliasTable {
    inner: RwLock<Aliases>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析规范名称，不是别名时原样返回
    pub fn canonical_name(&self, name: &str) -> String {
        self.inner
            .read()
            .targets
            .get(name)
            .map_or_else(|| name.to_string(), Clone::clone)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.inner.read().targets.contains_key(name)
    }

    /// 指向 `canonical` 的所有别名，按注册顺序
    pub fn aliases(&self, canonical: &str) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter(|alias| inner.targets.get(*alias).map_or(false, |t| t == canonical))
            .cloned()
            .collect()
    }

    /// 注册别名
    ///
    /// 别名与目标相同时视为移除该别名。
    pub fn register(&self, name: &str, alias: &str, allow_override: bool) -> BeanResult<()> {
        let mut inner = self.inner.write();
        if alias == name {
            if inner.targets.remove(alias).is_some() {
                inner.order.retain(|existing| existing != alias);
            }
            debug!("别名 '{}' 与目标相同，已移除", alias);
            return Ok(());
        }
        if inner.targets.contains_key(name) {
            return Err(BeanError::conflict(
                alias,
                format!("别名目标 '{}' 本身是别名，必须指向规范名称", name),
            ));
        }
        if inner.targets.values().any(|target| target == alias) {
            return Err(BeanError::conflict(
                alias,
                format!("'{}' 已经是其他别名的目标，不能再作为别名", alias),
            ));
        }
        if let Some(target) = inner.targets.get_mut(alias) {
            if target == name {
                return Ok(());
            }
            if !allow_override {
                return Err(BeanError::conflict(
                    alias,
                    format!("别名已指向 '{}'，不能改为指向 '{}'", target, name),
                ));
            }
            info!("别名 '{}' 从 '{}' 改为指向 '{}'", alias, target, name);
            *target = name.to_string();
            return Ok(());
        }
        inner.targets.insert(alias.to_string(), name.to_string());
        inner.order.push(alias.to_string());
        debug!("注册别名 '{}' -> '{}'", alias, name);
        Ok(())
    }

    /// 移除别名
    pub fn remove(&self, alias: &str) -> BeanResult<()> {
        let mut inner = self.inner.write();
        if inner.targets.remove(alias).is_none() {
            return Err(BeanError::illegal_state(format!("没有注册别名 '{}'", alias)));
        }
        inner.order.retain(|existing| existing != alias);
        Ok(())
    }
}
