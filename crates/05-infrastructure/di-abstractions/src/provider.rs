//! 延迟解析的 bean 提供者

use crate::definition::ConstructorArg;
use crate::factory::{BeanFactory, BeanFactoryExt};
use infrastructure_common::{BeanError, BeanErrorKind, BeanResult};
use std::marker::PhantomData;
use std::sync::Arc;

/// 按类型延迟解析 bean
///
/// 提供者本身不持有实例，每次调用都重新向工厂解析。
pub struct BeanProvider<'a, F: ?Sized, U: ?Sized> {
    factory: &'a F,
    _marker: PhantomData<fn() -> Arc<U>>,
}

impl<'a, F, U> BeanProvider<'a, F, U>
where
    F: BeanFactory + ?Sized,
    U: ?Sized + Send + Sync + 'static,
{
    pub fn new(factory: &'a F) -> Self {
        Self {
            factory,
            _marker: PhantomData,
        }
    }

    /// 获取唯一的实例，找不到或不唯一时返回错误
    pub fn get_object(&self) -> BeanResult<Arc<U>> {
        self.factory.get_bean_of::<U>()
    }

    /// 使用显式参数获取实例
    pub fn get_object_with_args(&self, args: Vec<ConstructorArg>) -> BeanResult<Arc<U>> {
        self.factory.get_bean_of_with_args::<U>(args)
    }

    /// 获取实例，找不到时返回 `None`，不唯一时仍然返回错误
    pub fn get_if_available(&self) -> BeanResult<Option<Arc<U>>> {
        match self.get_object() {
            Ok(bean) => Ok(Some(bean)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 获取实例，找不到时调用 `default`
    pub fn get_if_available_or_else(
        &self,
        default: impl FnOnce() -> Arc<U>,
    ) -> BeanResult<Arc<U>> {
        Ok(self.get_if_available()?.unwrap_or_else(default))
    }

    /// 获取实例，找不到或不唯一时都返回 `None`
    pub fn get_if_unique(&self) -> BeanResult<Option<Arc<U>>> {
        match self.get_object() {
            Ok(bean) => Ok(Some(bean)),
            Err(e) if matches!(e.kind(), BeanErrorKind::NotFound | BeanErrorKind::AmbiguousMatch) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// 是否存在至少一个候选
    pub fn is_available(&self) -> bool {
        !matches!(self.get_object(), Err(BeanError::NoSuchBeanOfType { .. }))
    }
}
