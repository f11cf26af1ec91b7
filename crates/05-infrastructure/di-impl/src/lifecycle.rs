//! 生命周期编排
//!
//! 实例化之后按固定顺序执行感知绑定、后处理器和初始化回调，
//! 销毁时按相反方向执行后处理器和销毁回调。

use di_abstractions::{BeanDefinition, BeanPostProcessor, BindingContext};
use infrastructure_common::{Bean, BeanError, LifecycleStep};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// 把用户回调的错误转换为创建错误
///
/// 嵌套的循环引用错误原样向上传播，其他 [`BeanError`] 作为来源保留。
pub(crate) fn creation_error(name: &str, step: LifecycleStep, err: anyhow::Error) -> BeanError {
    match err.downcast::<BeanError>() {
        Ok(bean_error) => nested_error(name, step, bean_error),
        Err(other) => BeanError::creation(name, step, other),
    }
}

/// 包装解析依赖时产生的错误
pub(crate) fn nested_error(name: &str, step: LifecycleStep, err: BeanError) -> BeanError {
    match err {
        circular @ BeanError::CircularReference { .. } => circular,
        other => BeanError::creation(name, step, other),
    }
}

/// 单个 bean 的生命周期编排
pub(crate) struct LifecycleOrchestrator<'a> {
    name: &'a str,
    definition: &'a BeanDefinition,
    post_processors: &'a [Arc<dyn BeanPostProcessor>],
    binding: &'a BindingContext<'a>,
}

impl<'a> LifecycleOrchestrator<'a> {
    pub fn new(
        name: &'a str,
        definition: &'a BeanDefinition,
        post_processors: &'a [Arc<dyn BeanPostProcessor>],
        binding: &'a BindingContext<'a>,
    ) -> Self {
        Self {
            name,
            definition,
            post_processors,
            binding,
        }
    }

    /// 调用单个阶段的能力
    ///
    /// 定义没有该能力、实例已被替换为其他类型或缺少协作者时跳过。
    pub fn invoke_step(&self, step: LifecycleStep, bean: &Bean) -> Result<(), BeanError> {
        let Some(capability) = self.definition.capability(step) else {
            return Ok(());
        };
        match capability.invoke(bean, self.binding) {
            Some(Ok(())) => {
                trace!("bean '{}' 完成阶段 {}", self.name, step);
                Ok(())
            }
            Some(Err(e)) => Err(creation_error(self.name, step, e)),
            None => {
                debug!("bean '{}' 跳过阶段 {}", self.name, step);
                Ok(())
            }
        }
    }

    /// 依次执行所有感知绑定
    pub fn apply_bindings(&self, bean: &Bean) -> Result<(), BeanError> {
        for step in LifecycleStep::BINDING_SEQUENCE {
            self.invoke_step(step, bean)?;
        }
        Ok(())
    }

    /// 初始化前后处理器、初始化回调、自定义初始化方法、初始化后后处理器
    pub fn initialize(&self, bean: Bean) -> Result<Bean, BeanError> {
        let mut current = bean;
        for processor in self.post_processors {
            current = processor
                .post_process_before_initialization(current, self.name)
                .map_err(|e| creation_error(self.name, LifecycleStep::PreInitialization, e))?;
        }

        self.invoke_step(LifecycleStep::Initialization, &current)?;
        self.invoke_step(LifecycleStep::CustomInitialization, &current)?;

        apply_after_initialization(
            self.post_processors,
            current,
            self.name,
            LifecycleStep::PostInitialization,
        )
    }
}

/// 执行初始化后的后处理器，FactoryBean 的产品也经过这一步
pub(crate) fn apply_after_initialization(
    post_processors: &[Arc<dyn BeanPostProcessor>],
    bean: Bean,
    name: &str,
    step: LifecycleStep,
) -> Result<Bean, BeanError> {
    let mut current = bean;
    for processor in post_processors {
        current = processor
            .post_process_after_initialization(current, name)
            .map_err(|e| creation_error(name, step, e))?;
    }
    Ok(current)
}

/// 单例或自定义作用域对象的销毁适配器
///
/// 销毁失败只记录日志，不会中断整体销毁流程。
pub(crate) struct DisposableBeanAdapter {
    name: String,
    bean: Bean,
    definition: Arc<BeanDefinition>,
    processors: Vec<Arc<dyn BeanPostProcessor>>,
}

impl DisposableBeanAdapter {
    /// 没有任何销毁工作时返回 `None`
    pub fn new(
        name: &str,
        bean: &Bean,
        definition: &Arc<BeanDefinition>,
        post_processors: &[Arc<dyn BeanPostProcessor>],
    ) -> Option<Self> {
        let processors: Vec<_> = post_processors
            .iter()
            .filter(|p| p.requires_destruction(bean))
            .cloned()
            .collect();
        if processors.is_empty() && !definition.has_destruction_callbacks() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            bean: bean.clone(),
            definition: definition.clone(),
            processors,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 执行销毁
    pub fn destroy(&self) {
        debug!("销毁 bean '{}'", self.name);
        for processor in &self.processors {
            if let Err(e) = processor.post_process_before_destruction(&self.bean, &self.name) {
                warn!(
                    "bean '{}' 的销毁前处理器 {} 失败: {:#}",
                    self.name,
                    processor.name(),
                    e
                );
            }
        }

        let collaborators = Default::default();
        let binding = BindingContext::new(
            &self.name,
            self.definition.bean_type(),
            None,
            &collaborators,
        );
        for step in [LifecycleStep::Destroy, LifecycleStep::CustomDestroy] {
            let Some(capability) = self.definition.capability(step) else {
                continue;
            };
            if let Some(Err(e)) = capability.invoke(&self.bean, &binding) {
                warn!("bean '{}' 在阶段 {} 销毁失败: {:#}", self.name, step, e);
            }
        }
    }
}
