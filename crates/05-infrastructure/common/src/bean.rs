//! bean 句柄
//!
//! [`Bean`] 把类型擦除后的实例与它的 [`BeanType`] 绑定在一起，
//! 所有按类型的转换都经过类型元数据完成，不会出现失控的强制转换。

use crate::metadata::{BeanObject, BeanType, TypeInfo};
use std::fmt;
use std::sync::Arc;

/// 容器中的一个 bean 实例
#[derive(Clone)]
pub struct Bean {
    instance: BeanObject,
    bean_type: Arc<BeanType>,
}

impl Bean {
    /// 用值创建 bean
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// 用已有的 `Arc` 创建 bean，保留指针身份
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            instance: value,
            bean_type: Arc::new(BeanType::of::<T>()),
        }
    }

    /// 用显式的类型元数据创建 bean
    pub fn with_type(instance: BeanObject, bean_type: Arc<BeanType>) -> Self {
        Self {
            instance,
            bean_type,
        }
    }

    /// 类型擦除后的实例
    pub fn instance(&self) -> &BeanObject {
        &self.instance
    }

    /// 类型元数据
    pub fn bean_type(&self) -> &Arc<BeanType> {
        &self.bean_type
    }

    /// 具体类型信息
    pub fn type_info(&self) -> &TypeInfo {
        self.bean_type.type_info()
    }

    /// 是否可以作为指定类型使用
    pub fn is_assignable_to(&self, required: &TypeInfo) -> bool {
        self.bean_type.is_assignable_to(required)
    }

    /// 按具体类型向下转换
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }

    /// 按声明的视图类型转换，支持 `dyn Trait`
    pub fn cast<U: ?Sized + 'static>(&self) -> Option<Arc<U>> {
        self.bean_type.cast::<U>(&self.instance)
    }

    /// 是否为同一个实例
    pub fn ptr_eq(&self, other: &Bean) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.instance).cast::<()>(),
            Arc::as_ptr(&other.instance).cast::<()>(),
        )
    }
}

impl fmt::Debug for Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bean")
            .field("type", &self.bean_type.type_info().name)
            .field("ptr", &Arc::as_ptr(&self.instance).cast::<()>())
            .finish()
    }
}
