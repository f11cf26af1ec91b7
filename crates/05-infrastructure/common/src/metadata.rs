//! 元数据定义
//!
//! 提供 bean 类型的元数据信息。Rust 没有运行时子类型关系，
//! 因此一个 bean 可以被当作哪些类型使用由 [`BeanType`] 显式声明。

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 类型擦除后的 bean 实例
pub type BeanObject = Arc<dyn Any + Send + Sync>;

type CastFn = Arc<dyn Fn(&BeanObject) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 类型信息
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// 完整类型名称
    pub name: String,
    /// 类型ID
    pub id: TypeId,
}

impl TypeInfo {
    /// 创建新的类型信息
    pub fn new(type_id: TypeId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: type_id,
        }
    }

    /// 从类型获取类型信息，支持 `dyn Trait` 等非 Sized 类型
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>().to_string(),
            id: TypeId::of::<T>(),
        }
    }

    /// 获取简短的类型名称（去掉所有模块路径）
    pub fn short_name(&self) -> String {
        strip_module_paths(&self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

fn strip_module_paths(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
            continue;
        }
        out.push(c);
        if !(c.is_alphanumeric() || c == '_') {
            segment_start = out.len();
        }
    }
    out
}

#[derive(Clone)]
struct TypeView {
    info: TypeInfo,
    cast: CastFn,
}

/// bean 类型元数据
///
/// 记录 bean 的具体类型以及它额外暴露的视图类型（通常是 `dyn Trait`），
/// 每个视图都附带一个类型安全的转换函数。
#[derive(Clone)]
pub struct BeanType {
    primary: TypeInfo,
    views: Vec<TypeView>,
}

impl BeanType {
    /// 以具体类型 `T` 创建类型元数据
    pub fn of<T: Send + Sync + 'static>() -> Self {
        let cast: CastFn = Arc::new(|instance: &BeanObject| {
            instance
                .clone()
                .downcast::<T>()
                .ok()
                .map(|typed| Box::new(typed) as Box<dyn Any + Send + Sync>)
        });
        let primary = TypeInfo::of::<T>();
        Self {
            views: vec![TypeView {
                info: primary.clone(),
                cast,
            }],
            primary,
        }
    }

    /// 声明 bean 可以作为 `U` 使用
    ///
    /// ```ignore
    /// BeanType::of::<ConsoleLogger>().implements(|b: Arc<ConsoleLogger>| b as Arc<dyn Logger>)
    /// ```
    pub fn implements<T, U, F>(mut self, convert: F) -> Self
    where
        T: Send + Sync + 'static,
        U: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    {
        let info = TypeInfo::of::<U>();
        self.views.retain(|view| view.info.id != info.id);
        let cast: CastFn = Arc::new(move |instance: &BeanObject| {
            instance
                .clone()
                .downcast::<T>()
                .ok()
                .map(|typed| Box::new(convert(typed)) as Box<dyn Any + Send + Sync>)
        });
        self.views.push(TypeView { info, cast });
        self
    }

    /// 具体类型信息
    pub fn type_info(&self) -> &TypeInfo {
        &self.primary
    }

    /// 所有可赋值的类型（包含具体类型本身）
    pub fn assignable_types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.views.iter().map(|view| &view.info)
    }

    /// 是否可以作为指定类型使用
    pub fn is_assignable_to(&self, required: &TypeInfo) -> bool {
        self.views.iter().any(|view| view.info.id == required.id)
    }

    /// 把实例转换为 `Arc<U>`，类型不匹配时返回 `None`
    pub fn cast<U: ?Sized + 'static>(&self, instance: &BeanObject) -> Option<Arc<U>> {
        let target = TypeId::of::<U>();
        let view = self.views.iter().find(|view| view.info.id == target)?;
        (view.cast)(instance)?
            .downcast::<Arc<U>>()
            .ok()
            .map(|boxed| *boxed)
    }
}

impl fmt::Debug for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanType")
            .field("primary", &self.primary.name)
            .field(
                "views",
                &self
                    .views
                    .iter()
                    .map(|view| view.info.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl fmt::Display for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.primary, f)
    }
}
