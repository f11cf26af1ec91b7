//! 创建期间的解析上下文
//!
//! 构造函数、工厂方法和 supplier 通过 [`BeanCreationContext`] 获取协作 bean，
//! 通过这里获取的 bean 会被记录为当前 bean 的依赖，用于决定销毁顺序。

use crate::factory::{transformed_bean_name, BeanFactory, BeanFactoryExt};
use infrastructure_common::{Bean, BeanError, BeanResult, TypeInfo};
use std::cell::RefCell;
use std::sync::Arc;

/// bean 创建上下文
pub struct BeanCreationContext<'a> {
    bean_name: &'a str,
    factory: &'a dyn BeanFactory,
    requested: RefCell<Vec<String>>,
}

impl<'a> BeanCreationContext<'a> {
    /// 创建新的上下文
    pub fn new(bean_name: &'a str, factory: &'a dyn BeanFactory) -> Self {
        Self {
            bean_name,
            factory,
            requested: RefCell::new(Vec::new()),
        }
    }

    /// 正在创建的 bean 名称
    pub fn bean_name(&self) -> &str {
        self.bean_name
    }

    /// 当前所在的工厂
    pub fn factory(&self) -> &dyn BeanFactory {
        self.factory
    }

    /// 按名称获取协作 bean
    pub fn get_bean(&self, name: &str) -> BeanResult<Bean> {
        self.record(name);
        self.factory.get_bean(name)
    }

    /// 按名称获取协作 bean 并转换类型
    pub fn get_bean_typed<U>(&self, name: &str) -> BeanResult<Arc<U>>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.record(name);
        self.factory.get_bean_typed::<U>(name)
    }

    /// 按类型获取唯一的协作 bean
    pub fn get_bean_of<U>(&self) -> BeanResult<Arc<U>>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.factory.get_bean_of::<U>()
    }

    /// 取出记录到的依赖名称
    pub fn take_requested(&self) -> Vec<String> {
        std::mem::take(&mut *self.requested.borrow_mut())
    }

    fn record(&self, name: &str) {
        let name = transformed_bean_name(name);
        let mut requested = self.requested.borrow_mut();
        if !requested.iter().any(|n| n == name) {
            requested.push(name.to_string());
        }
    }
}

/// 已解析的构造参数
#[derive(Clone, Default)]
pub struct BeanArgs {
    values: Vec<Bean>,
}

impl BeanArgs {
    pub fn new(values: Vec<Bean>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 第 `index` 个参数的原始句柄
    pub fn raw(&self, index: usize) -> Option<&Bean> {
        self.values.get(index)
    }

    /// 第 `index` 个参数，转换为 `Arc<U>`
    pub fn get<U: ?Sized + 'static>(&self, index: usize) -> BeanResult<Arc<U>> {
        let bean = self.values.get(index).ok_or_else(|| {
            BeanError::illegal_state(format!(
                "缺少第 {} 个构造参数，共 {} 个",
                index,
                self.values.len()
            ))
        })?;
        bean.cast::<U>()
            .ok_or_else(|| BeanError::BeanNotOfRequiredType {
                name: format!("arg#{}", index),
                required_type: TypeInfo::of::<U>().name,
                actual_type: bean.type_info().name.clone(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bean> {
        self.values.iter()
    }
}
