//! bean 工厂抽象接口
//!
//! [`BeanFactory`] 是访问 bean 容器的根接口。所有按名称和按类型的读取操作
//! 在本级找不到时都会询问父工厂，本级的定义总是覆盖父工厂中同名的定义。

use crate::definition::ConstructorArg;
use crate::provider::BeanProvider;
use infrastructure_common::{Bean, BeanError, BeanResult, BeanType, TypeInfo};
use std::sync::Arc;
use uuid::Uuid;

/// FactoryBean 解引用前缀
///
/// 如果名为 `myFactory` 的 bean 是一个 [`FactoryBean`]，获取 `&myFactory`
/// 返回工厂本身，而不是工厂生产的对象。
pub const FACTORY_BEAN_PREFIX: &str = "&";

/// 名称是否带有工厂解引用前缀
pub fn is_factory_dereference(name: &str) -> bool {
    name.starts_with(FACTORY_BEAN_PREFIX)
}

/// 去掉所有工厂解引用前缀
pub fn transformed_bean_name(name: &str) -> &str {
    name.trim_start_matches(FACTORY_BEAN_PREFIX)
}

/// 类型匹配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatch {
    /// 类型匹配
    Matches,
    /// 类型不匹配
    DoesNotMatch,
    /// 元数据不足且不允许初始化，无法判断
    Undeterminable,
}

impl TypeMatch {
    /// 由布尔值构造
    pub fn from_bool(matches: bool) -> Self {
        if matches {
            Self::Matches
        } else {
            Self::DoesNotMatch
        }
    }

    /// 是否确定匹配
    pub fn is_match(self) -> bool {
        self == Self::Matches
    }
}

/// bean 工厂 trait
///
/// 对象安全的核心接口，泛型便捷方法见 [`BeanFactoryExt`]。
pub trait BeanFactory: Send + Sync {
    /// 按名称获取 bean，单例返回共享实例，原型返回新实例
    fn get_bean(&self, name: &str) -> BeanResult<Bean>;

    /// 按名称获取 bean 并校验类型
    ///
    /// 类型不匹配时返回 [`BeanError::BeanNotOfRequiredType`]，与找不到区分。
    fn get_bean_of_type(&self, name: &str, required_type: &TypeInfo) -> BeanResult<Bean>;

    /// 按名称获取 bean 并用显式参数覆盖定义中的默认参数
    ///
    /// 只适用于原型作用域，共享作用域返回 [`BeanError::InvalidScopeUsage`]。
    fn get_bean_with_args(&self, name: &str, args: Vec<ConstructorArg>) -> BeanResult<Bean>;

    /// 按类型获取唯一匹配的 bean
    fn get_bean_by_type(&self, required_type: &TypeInfo) -> BeanResult<Bean>;

    /// 按类型获取唯一匹配的 bean，并使用显式参数
    fn get_bean_by_type_with_args(
        &self,
        required_type: &TypeInfo,
        args: Vec<ConstructorArg>,
    ) -> BeanResult<Bean>;

    /// 是否包含指定名称的 bean（定义或外部注册的单例，含祖先工厂）
    ///
    /// 返回 `true` 并不保证随后 `get_bean` 一定成功，定义可能是抽象的。
    fn contains_bean(&self, name: &str) -> bool;

    /// 是否为共享单例，不会触发实例化
    fn is_singleton(&self, name: &str) -> BeanResult<bool>;

    /// 是否为原型（每次获取都返回独立实例），不会触发实例化
    fn is_prototype(&self, name: &str) -> BeanResult<bool>;

    /// 判断 bean 是否可以作为指定类型使用
    fn is_type_match(
        &self,
        name: &str,
        type_to_match: &TypeInfo,
        allow_factory_bean_init: bool,
    ) -> BeanResult<TypeMatch>;

    /// 获取 bean 的类型，无法确定时返回 `Ok(None)`
    fn get_type(&self, name: &str, allow_factory_bean_init: bool)
        -> BeanResult<Option<Arc<BeanType>>>;

    /// 获取 bean 的所有别名
    ///
    /// 如果传入的是别名，第一个元素是规范名称，其后是其他别名。
    fn get_aliases(&self, name: &str) -> Vec<String>;

    /// 工厂标识，包装其他工厂的实现返回被包装工厂的标识
    ///
    /// 设置父工厂时用它沿委托链检查环路。
    fn factory_id(&self) -> Option<Uuid> {
        None
    }

    /// 本级找不到时委托的父工厂
    fn delegation_parent(&self) -> Option<Arc<dyn BeanFactory>> {
        None
    }
}

/// bean 工厂的泛型便捷方法
pub trait BeanFactoryExt: BeanFactory {
    /// 按名称获取并转换为 `Arc<U>`
    fn get_bean_typed<U>(&self, name: &str) -> BeanResult<Arc<U>>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        let required = TypeInfo::of::<U>();
        let bean = self.get_bean_of_type(name, &required)?;
        cast_bean(name, &bean, &required)
    }

    /// 按名称和显式参数获取并转换为 `Arc<U>`
    fn get_bean_typed_with_args<U>(&self, name: &str, args: Vec<ConstructorArg>) -> BeanResult<Arc<U>>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        let required = TypeInfo::of::<U>();
        let bean = self.get_bean_with_args(name, args)?;
        cast_bean(name, &bean, &required)
    }

    /// 按类型获取唯一的 bean
    fn get_bean_of<U>(&self) -> BeanResult<Arc<U>>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        let required = TypeInfo::of::<U>();
        let bean = self.get_bean_by_type(&required)?;
        cast_bean(&required.name, &bean, &required)
    }

    /// 按类型和显式参数获取唯一的 bean
    fn get_bean_of_with_args<U>(&self, args: Vec<ConstructorArg>) -> BeanResult<Arc<U>>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        let required = TypeInfo::of::<U>();
        let bean = self.get_bean_by_type_with_args(&required, args)?;
        cast_bean(&required.name, &bean, &required)
    }

    /// 判断 bean 是否可以作为 `U` 使用
    fn is_type_match_of<U>(&self, name: &str) -> BeanResult<TypeMatch>
    where
        U: ?Sized + 'static,
    {
        self.is_type_match(name, &TypeInfo::of::<U>(), true)
    }

    /// 获取延迟解析的 bean 提供者
    fn get_bean_provider<U>(&self) -> BeanProvider<'_, Self, U>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        BeanProvider::new(self)
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

fn cast_bean<U: ?Sized + 'static>(name: &str, bean: &Bean, required: &TypeInfo) -> BeanResult<Arc<U>> {
    bean.cast::<U>()
        .ok_or_else(|| BeanError::BeanNotOfRequiredType {
            name: name.to_string(),
            required_type: required.name.clone(),
            actual_type: bean.type_info().name.clone(),
        })
}

/// 工厂 bean
///
/// 定义本身是一个生产其他对象的工厂，通过名称获取到的是它生产的对象，
/// 通过 `&名称` 获取到的是工厂本身。
pub trait FactoryBean: Send + Sync {
    /// 生产对象
    fn get_object(&self) -> anyhow::Result<Bean>;

    /// 生产对象的类型，未知时返回 `None`
    fn object_type(&self) -> Option<BeanType> {
        None
    }

    /// 生产的对象是否为共享单例
    fn is_singleton(&self) -> bool {
        true
    }
}
