//! 错误类型定义

use crate::lifecycle::LifecycleStep;
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("不支持的配置文件格式: {path}")]
    UnsupportedFormat { path: String },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// bean 容器错误类型
///
/// 每一种失败都是可区分、可检查的独立变体，调用方可以通过 [`BeanError::kind`]
/// 做粗粒度分类。
#[derive(Error, Debug)]
pub enum BeanError {
    #[error("没有名为 '{name}' 的 bean")]
    NoSuchBean { name: String },

    #[error("没有类型为 {type_name} 的 bean")]
    NoSuchBeanOfType { type_name: String },

    #[error("bean '{name}' 的实际类型为 {actual_type}，不能作为 {required_type} 使用")]
    BeanNotOfRequiredType {
        name: String,
        required_type: String,
        actual_type: String,
    },

    #[error("类型 {type_name} 存在多个候选 bean: {candidates:?}")]
    NoUniqueBean {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("bean '{name}' 的作用域为 {scope}，不允许传入显式构造参数")]
    InvalidScopeUsage { name: String, scope: String },

    #[error("创建 bean '{name}' 失败，阶段: {step}, 原因: {source}")]
    BeanCreation {
        name: String,
        step: LifecycleStep,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("bean '{name}' 存在无法解决的循环引用: {chain}")]
    CircularReference { name: String, chain: String },

    #[error("bean 定义存储冲突: {name}, 原因: {message}")]
    DefinitionStoreConflict { name: String, message: String },

    #[error("bean '{name}' 不是 FactoryBean")]
    BeanIsNotAFactory { name: String },

    #[error("bean '{name}' 是抽象定义，不能实例化")]
    BeanIsAbstract { name: String },

    #[error("未注册的作用域: {scope}")]
    NoSuchScope { scope: String },

    #[error("非法状态: {message}")]
    IllegalState { message: String },
}

/// [`BeanError`] 的粗粒度分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeanErrorKind {
    /// 名称或类型在本级及所有祖先中都找不到
    NotFound,
    /// 类型不匹配
    WrongType,
    /// 按类型解析时存在多个候选
    AmbiguousMatch,
    /// 对共享作用域传入了显式参数
    InvalidScopeUsage,
    /// 生命周期某个阶段失败
    CreationFailure,
    /// 构造阶段的循环引用
    CircularReference,
    /// 定义或别名注册冲突
    StoreConflict,
    /// 其他使用错误
    IllegalUsage,
}

impl BeanError {
    /// 创建 bean 不存在错误
    pub fn no_such_bean(name: impl Into<String>) -> Self {
        Self::NoSuchBean { name: name.into() }
    }

    /// 创建按类型查找不到的错误
    pub fn no_such_bean_of_type(type_name: impl Into<String>) -> Self {
        Self::NoSuchBeanOfType {
            type_name: type_name.into(),
        }
    }

    /// 创建 bean 创建失败错误
    pub fn creation(
        name: impl Into<String>,
        step: LifecycleStep,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::BeanCreation {
            name: name.into(),
            step,
            source: source.into(),
        }
    }

    /// 创建定义存储冲突错误
    pub fn conflict(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DefinitionStoreConflict {
            name: name.into(),
            message: message.into(),
        }
    }

    /// 创建非法状态错误
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// 错误分类
    pub fn kind(&self) -> BeanErrorKind {
        match self {
            Self::NoSuchBean { .. } | Self::NoSuchBeanOfType { .. } => BeanErrorKind::NotFound,
            Self::BeanNotOfRequiredType { .. } => BeanErrorKind::WrongType,
            Self::NoUniqueBean { .. } => BeanErrorKind::AmbiguousMatch,
            Self::InvalidScopeUsage { .. } => BeanErrorKind::InvalidScopeUsage,
            Self::BeanCreation { .. } => BeanErrorKind::CreationFailure,
            Self::CircularReference { .. } => BeanErrorKind::CircularReference,
            Self::DefinitionStoreConflict { .. } => BeanErrorKind::StoreConflict,
            Self::BeanIsNotAFactory { .. }
            | Self::BeanIsAbstract { .. }
            | Self::NoSuchScope { .. }
            | Self::IllegalState { .. } => BeanErrorKind::IllegalUsage,
        }
    }

    /// 是否为"找不到"类错误，层级委托只在这类错误上回退到父工厂
    pub fn is_not_found(&self) -> bool {
        self.kind() == BeanErrorKind::NotFound
    }

    /// 沿错误链查找最内层的 [`BeanError`]，没有嵌套时返回自身
    pub fn root_cause(&self) -> &BeanError {
        let mut current = self;
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            if let Some(bean_error) = err.downcast_ref::<BeanError>() {
                current = bean_error;
            }
            source = err.source();
        }
        current
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("bean 容器错误: {source}")]
    BeanError {
        #[from]
        source: BeanError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },

    #[error("基础设施关闭失败: {message}")]
    ShutdownFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type BeanResult<T> = Result<T, BeanError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
