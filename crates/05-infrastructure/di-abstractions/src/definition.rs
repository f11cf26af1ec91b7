//! bean 定义
//!
//! [`BeanDefinition`] 描述如何创建一个 bean：实例化方式、作用域、构造参数、
//! 属性注入、前置依赖以及它具备的生命周期能力。定义在注册后不可变。
//!
//! 定义通过类型化的 [`BeanDefinitionBuilder`] 构建，具体类型在构建时被擦除，
//! 每一项生命周期能力都保存为一个在运行时重新校验类型的闭包。

use crate::factory::FactoryBean;
use crate::lifecycle::{
    ApplicationContextAware, ApplicationEventPublisherAware, BeanFactoryAware, BeanNameAware,
    BeanTypeAware, BindingContext, DisposableBean, EnvironmentAware, InitializingBean,
    MessageSourceAware, ResourceLoaderAware, SmartInitializingSingleton,
};
use crate::resolver::{BeanArgs, BeanCreationContext};
use crate::scope::BeanScope;
use infrastructure_common::{Bean, BeanObject, BeanType, LifecycleStep, TypeInfo};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 构造函数
pub type ConstructorFn =
    Arc<dyn Fn(&BeanCreationContext<'_>, &BeanArgs) -> anyhow::Result<BeanObject> + Send + Sync>;

/// 工厂方法，第一个参数是工厂 bean 实例
pub type FactoryMethodFn = Arc<
    dyn Fn(&Bean, &BeanCreationContext<'_>, &BeanArgs) -> anyhow::Result<BeanObject> + Send + Sync,
>;

/// 无参 supplier
pub type SupplierFn =
    Arc<dyn Fn(&BeanCreationContext<'_>) -> anyhow::Result<BeanObject> + Send + Sync>;

/// 生命周期能力，实例类型不符或协作者缺失时返回 `None`
pub type CapabilityFn =
    Arc<dyn Fn(&Bean, &BindingContext<'_>) -> Option<anyhow::Result<()>> + Send + Sync>;

/// 属性 setter，目标实例类型不符时返回 `None`
pub type PropertySetterFn = Arc<dyn Fn(&Bean, &Bean) -> Option<anyhow::Result<()>> + Send + Sync>;

type FactoryAccessor = Arc<dyn Fn(&Bean) -> Option<Arc<dyn FactoryBean>> + Send + Sync>;

/// 实例化方式
#[derive(Clone)]
pub enum Instantiation {
    /// 构造函数，接收解析后的构造参数
    Constructor(ConstructorFn),
    /// 另一个 bean 上的工厂方法
    FactoryMethod {
        factory_bean: String,
        method_name: String,
        method: FactoryMethodFn,
    },
    /// 不接收参数的 supplier
    Supplier(SupplierFn),
}

impl Instantiation {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Constructor(_) => "constructor",
            Self::FactoryMethod { .. } => "factory-method",
            Self::Supplier(_) => "supplier",
        }
    }
}

impl fmt::Debug for Instantiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FactoryMethod {
                factory_bean,
                method_name,
                ..
            } => write!(f, "FactoryMethod({}.{})", factory_bean, method_name),
            other => f.write_str(other.kind()),
        }
    }
}

/// 构造参数或属性值
#[derive(Clone, Debug)]
pub enum ConstructorArg {
    /// 直接给出的值
    Value(Bean),
    /// 对另一个 bean 的引用，在创建时解析
    BeanRef(String),
}

impl ConstructorArg {
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Value(Bean::new(value))
    }

    pub fn bean_ref(name: impl Into<String>) -> Self {
        Self::BeanRef(name.into())
    }
}

/// 属性注入
#[derive(Clone)]
pub struct PropertyValue {
    name: String,
    value: ConstructorArg,
    setter: PropertySetterFn,
}

impl PropertyValue {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ConstructorArg {
        &self.value
    }

    /// 把已解析的值写入目标实例
    pub fn apply(&self, target: &Bean, value: &Bean) -> Option<anyhow::Result<()>> {
        (self.setter)(target, value)
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValue")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

/// 单个生命周期能力
#[derive(Clone)]
pub struct Capability {
    step: LifecycleStep,
    method_name: Option<String>,
    invoke: CapabilityFn,
}

impl Capability {
    pub fn step(&self) -> LifecycleStep {
        self.step
    }

    /// 自定义初始化/销毁方法的名称
    pub fn method_name(&self) -> Option<&str> {
        self.method_name.as_deref()
    }

    pub fn invoke(&self, bean: &Bean, ctx: &BindingContext<'_>) -> Option<anyhow::Result<()>> {
        (self.invoke)(bean, ctx)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method_name {
            Some(method) => write!(f, "{}({})", self.step, method),
            None => write!(f, "{}", self.step),
        }
    }
}

/// FactoryBean 元数据
#[derive(Clone)]
pub struct FactoryBeanMetadata {
    object_type: Option<Arc<BeanType>>,
    product_singleton: bool,
    accessor: FactoryAccessor,
}

impl FactoryBeanMetadata {
    /// 声明的产品类型
    pub fn object_type(&self) -> Option<&Arc<BeanType>> {
        self.object_type.as_ref()
    }

    /// 产品是否为共享单例
    pub fn is_product_singleton(&self) -> bool {
        self.product_singleton
    }

    /// 把工厂实例视为 [`FactoryBean`]
    pub fn factory_of(&self, bean: &Bean) -> Option<Arc<dyn FactoryBean>> {
        (self.accessor)(bean)
    }
}

/// bean 定义
#[derive(Clone)]
pub struct BeanDefinition {
    bean_type: Arc<BeanType>,
    instantiation: Instantiation,
    scope: BeanScope,
    constructor_args: Vec<ConstructorArg>,
    property_values: Vec<PropertyValue>,
    depends_on: Vec<String>,
    capabilities: Vec<Capability>,
    factory_bean: Option<FactoryBeanMetadata>,
    is_abstract: bool,
    lazy_init: bool,
    primary: bool,
    description: Option<String>,
}

impl BeanDefinition {
    /// 用 supplier 创建定义
    pub fn supplier<T, F>(supplier: F) -> BeanDefinitionBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&BeanCreationContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let instantiation = Instantiation::Supplier(Arc::new(move |ctx: &BeanCreationContext<'_>| {
            supplier(ctx).map(|value| Arc::new(value) as BeanObject)
        }));
        BeanDefinitionBuilder::new(instantiation)
    }

    /// 用构造函数创建定义，构造参数由 [`BeanDefinitionBuilder::arg`] 声明
    pub fn constructor<T, F>(constructor: F) -> BeanDefinitionBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&BeanCreationContext<'_>, &BeanArgs) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let instantiation = Instantiation::Constructor(Arc::new(
            move |ctx: &BeanCreationContext<'_>, args: &BeanArgs| {
                constructor(ctx, args).map(|value| Arc::new(value) as BeanObject)
            },
        ));
        BeanDefinitionBuilder::new(instantiation)
    }

    /// 用另一个 bean 上的工厂方法创建定义
    ///
    /// 工厂 bean 必须可以作为 `FB` 使用，否则实例化失败。
    pub fn factory_method<FB, T, F>(
        factory_bean: impl Into<String>,
        method_name: impl Into<String>,
        method: F,
    ) -> BeanDefinitionBuilder<T>
    where
        FB: ?Sized + Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(&FB, &BeanCreationContext<'_>, &BeanArgs) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let factory_bean = factory_bean.into();
        let method_name = method_name.into();
        let owner = factory_bean.clone();
        let method: FactoryMethodFn = Arc::new(move |factory: &Bean, ctx: &BeanCreationContext<'_>, args: &BeanArgs| {
            let target = factory.cast::<FB>().ok_or_else(|| {
                anyhow::anyhow!(
                    "工厂 bean '{}' 的类型 {} 不能作为 {} 使用",
                    owner,
                    factory.type_info(),
                    TypeInfo::of::<FB>()
                )
            })?;
            method(&target, ctx, args).map(|value| Arc::new(value) as BeanObject)
        });
        BeanDefinitionBuilder::new(Instantiation::FactoryMethod {
            factory_bean,
            method_name,
            method,
        })
    }

    /// 创建 FactoryBean 定义，按名称获取到的是它生产的对象
    pub fn factory_bean<FB, F>(supplier: F) -> BeanDefinitionBuilder<FB>
    where
        FB: FactoryBean + 'static,
        F: Fn(&BeanCreationContext<'_>) -> anyhow::Result<FB> + Send + Sync + 'static,
    {
        let mut builder = Self::supplier(supplier);
        builder.definition.factory_bean = Some(FactoryBeanMetadata {
            object_type: None,
            product_singleton: true,
            accessor: Arc::new(|bean: &Bean| {
                bean.downcast::<FB>()
                    .map(|factory| factory as Arc<dyn FactoryBean>)
            }),
        });
        builder
    }

    pub fn bean_type(&self) -> &Arc<BeanType> {
        &self.bean_type
    }

    pub fn instantiation(&self) -> &Instantiation {
        &self.instantiation
    }

    pub fn scope(&self) -> &BeanScope {
        &self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }

    pub fn is_prototype(&self) -> bool {
        self.scope.is_prototype()
    }

    pub fn constructor_args(&self) -> &[ConstructorArg] {
        &self.constructor_args
    }

    pub fn property_values(&self) -> &[PropertyValue] {
        &self.property_values
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// 指定阶段的能力
    pub fn capability(&self, step: LifecycleStep) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.step == step)
    }

    pub fn has_capability(&self, step: LifecycleStep) -> bool {
        self.capability(step).is_some()
    }

    pub fn factory_bean_metadata(&self) -> Option<&FactoryBeanMetadata> {
        self.factory_bean.as_ref()
    }

    pub fn is_factory_bean(&self) -> bool {
        self.factory_bean.is_some()
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn init_method_name(&self) -> Option<&str> {
        self.capability(LifecycleStep::CustomInitialization)
            .and_then(Capability::method_name)
    }

    pub fn destroy_method_name(&self) -> Option<&str> {
        self.capability(LifecycleStep::CustomDestroy)
            .and_then(Capability::method_name)
    }

    /// 是否声明了销毁回调
    pub fn has_destruction_callbacks(&self) -> bool {
        self.has_capability(LifecycleStep::Destroy) || self.has_capability(LifecycleStep::CustomDestroy)
    }

    /// 构造参数和属性中引用的 bean 名称
    pub fn referenced_beans(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .constructor_args
            .iter()
            .chain(self.property_values.iter().map(|p| &p.value))
            .filter_map(|arg| match arg {
                ConstructorArg::BeanRef(name) => Some(name.as_str()),
                ConstructorArg::Value(_) => None,
            })
            .collect();
        if let Instantiation::FactoryMethod { factory_bean, .. } = &self.instantiation {
            names.push(factory_bean);
        }
        names
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("bean_type", &self.bean_type.type_info().name)
            .field("instantiation", &self.instantiation)
            .field("scope", &self.scope)
            .field("constructor_args", &self.constructor_args.len())
            .field("property_values", &self.property_values)
            .field("depends_on", &self.depends_on)
            .field("capabilities", &self.capabilities)
            .field("factory_bean", &self.factory_bean.is_some())
            .field("abstract", &self.is_abstract)
            .field("lazy_init", &self.lazy_init)
            .field("primary", &self.primary)
            .finish()
    }
}

/// 类型化的 bean 定义构建器
pub struct BeanDefinitionBuilder<T> {
    definition: BeanDefinition,
    bean_type: BeanType,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> BeanDefinitionBuilder<T> {
    fn new(instantiation: Instantiation) -> Self {
        let bean_type = BeanType::of::<T>();
        Self {
            definition: BeanDefinition {
                bean_type: Arc::new(bean_type.clone()),
                instantiation,
                scope: BeanScope::Singleton,
                constructor_args: Vec::new(),
                property_values: Vec::new(),
                depends_on: Vec::new(),
                capabilities: Vec::new(),
                factory_bean: None,
                is_abstract: false,
                lazy_init: false,
                primary: false,
                description: None,
            },
            bean_type,
            _marker: PhantomData,
        }
    }

    /// 声明 bean 还可以作为 `U` 使用
    pub fn implements<U, F>(mut self, convert: F) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    {
        self.bean_type = self.bean_type.implements(convert);
        self
    }

    pub fn scope(mut self, scope: BeanScope) -> Self {
        self.definition.scope = scope;
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(BeanScope::Prototype)
    }

    pub fn custom_scope(self, name: impl Into<String>) -> Self {
        self.scope(BeanScope::Custom(name.into()))
    }

    pub fn lazy_init(mut self, lazy: bool) -> Self {
        self.definition.lazy_init = lazy;
        self
    }

    /// 标记为抽象定义，不能被实例化，也不参与按类型解析
    pub fn abstract_definition(mut self) -> Self {
        self.definition.is_abstract = true;
        self
    }

    /// 按类型解析存在多个候选时优先选择
    pub fn primary(mut self) -> Self {
        self.definition.primary = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.definition.description = Some(description.into());
        self
    }

    /// 追加构造参数
    pub fn arg(mut self, arg: ConstructorArg) -> Self {
        self.definition.constructor_args.push(arg);
        self
    }

    /// 追加值参数
    pub fn arg_value<V: Send + Sync + 'static>(self, value: V) -> Self {
        self.arg(ConstructorArg::value(value))
    }

    /// 追加引用参数
    pub fn arg_ref(self, name: impl Into<String>) -> Self {
        self.arg(ConstructorArg::bean_ref(name))
    }

    /// 声明必须先于本 bean 初始化的 bean
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.definition.depends_on.push(name.into());
        self
    }

    /// setter 风格的属性注入
    pub fn property<U, S>(mut self, name: impl Into<String>, value: ConstructorArg, setter: S) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
        S: Fn(&T, Arc<U>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let property = name.clone();
        let setter: PropertySetterFn = Arc::new(move |target: &Bean, value: &Bean| {
            let target = target.downcast::<T>()?;
            Some(match value.cast::<U>() {
                Some(value) => setter(&target, value),
                None => Err(anyhow::anyhow!(
                    "属性 '{}' 的值类型为 {}，期望 {}",
                    property,
                    value.type_info(),
                    TypeInfo::of::<U>()
                )),
            })
        });
        self.definition.property_values.retain(|p| p.name != name);
        self.definition.property_values.push(PropertyValue {
            name,
            value,
            setter,
        });
        self
    }

    /// 注入另一个 bean 的属性
    pub fn property_ref<U, S>(self, name: impl Into<String>, bean_name: impl Into<String>, setter: S) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
        S: Fn(&T, Arc<U>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.property(name, ConstructorArg::bean_ref(bean_name), setter)
    }

    /// 注册一项生命周期能力，同一阶段只保留最后一次注册
    pub fn capability<F>(mut self, step: LifecycleStep, method_name: Option<String>, invoke: F) -> Self
    where
        F: Fn(&T, &BindingContext<'_>) -> Option<anyhow::Result<()>> + Send + Sync + 'static,
    {
        let invoke: CapabilityFn = Arc::new(move |bean: &Bean, ctx: &BindingContext<'_>| {
            let typed = bean.downcast::<T>()?;
            invoke(&typed, ctx)
        });
        self.definition.capabilities.retain(|c| c.step != step);
        self.definition.capabilities.push(Capability {
            step,
            method_name,
            invoke,
        });
        self
    }

    /// 自定义初始化方法
    pub fn init_method<F>(self, method_name: impl Into<String>, init: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.capability(
            LifecycleStep::CustomInitialization,
            Some(method_name.into()),
            move |bean, _| Some(init(bean)),
        )
    }

    /// 自定义销毁方法
    pub fn destroy_method<F>(self, method_name: impl Into<String>, destroy: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.capability(
            LifecycleStep::CustomDestroy,
            Some(method_name.into()),
            move |bean, _| Some(destroy(bean)),
        )
    }

    /// 完成构建
    pub fn build(mut self) -> BeanDefinition {
        self.definition.bean_type = Arc::new(self.bean_type);
        self.definition
    }
}

impl<T: BeanNameAware + 'static> BeanDefinitionBuilder<T> {
    pub fn bean_name_aware(self) -> Self {
        self.capability(LifecycleStep::NameBinding, None, |bean, ctx| {
            Some(bean.set_bean_name(ctx.bean_name()))
        })
    }
}

impl<T: BeanTypeAware + 'static> BeanDefinitionBuilder<T> {
    pub fn bean_type_aware(self) -> Self {
        self.capability(LifecycleStep::TypeBinding, None, |bean, ctx| {
            Some(bean.set_bean_type(ctx.bean_type()))
        })
    }
}

impl<T: BeanFactoryAware + 'static> BeanDefinitionBuilder<T> {
    pub fn bean_factory_aware(self) -> Self {
        self.capability(LifecycleStep::RegistryBinding, None, |bean, ctx| {
            ctx.bean_factory()
                .map(|factory| bean.set_bean_factory(factory))
        })
    }
}

impl<T: EnvironmentAware + 'static> BeanDefinitionBuilder<T> {
    pub fn environment_aware(self) -> Self {
        self.capability(LifecycleStep::EnvironmentBinding, None, |bean, ctx| {
            ctx.collaborators()
                .environment
                .clone()
                .map(|environment| bean.set_environment(environment))
        })
    }
}

impl<T: ResourceLoaderAware + 'static> BeanDefinitionBuilder<T> {
    pub fn resource_loader_aware(self) -> Self {
        self.capability(LifecycleStep::ResourceLoaderBinding, None, |bean, ctx| {
            ctx.collaborators()
                .resource_loader
                .clone()
                .map(|loader| bean.set_resource_loader(loader))
        })
    }
}

impl<T: ApplicationEventPublisherAware + 'static> BeanDefinitionBuilder<T> {
    pub fn event_publisher_aware(self) -> Self {
        self.capability(LifecycleStep::EventPublisherBinding, None, |bean, ctx| {
            ctx.collaborators()
                .event_publisher
                .clone()
                .map(|publisher| bean.set_application_event_publisher(publisher))
        })
    }
}

impl<T: MessageSourceAware + 'static> BeanDefinitionBuilder<T> {
    pub fn message_source_aware(self) -> Self {
        self.capability(LifecycleStep::MessageSourceBinding, None, |bean, ctx| {
            ctx.collaborators()
                .message_source
                .clone()
                .map(|source| bean.set_message_source(source))
        })
    }
}

impl<T: ApplicationContextAware + 'static> BeanDefinitionBuilder<T> {
    pub fn application_context_aware(self) -> Self {
        self.capability(LifecycleStep::ContextBinding, None, |bean, ctx| {
            ctx.collaborators()
                .application_context
                .clone()
                .map(|context| bean.set_application_context(context))
        })
    }
}

impl<T: InitializingBean + 'static> BeanDefinitionBuilder<T> {
    pub fn initializing(self) -> Self {
        self.capability(LifecycleStep::Initialization, None, |bean, _| {
            Some(bean.after_properties_set())
        })
    }
}

impl<T: DisposableBean + 'static> BeanDefinitionBuilder<T> {
    pub fn disposable(self) -> Self {
        self.capability(LifecycleStep::Destroy, None, |bean, _| Some(bean.destroy()))
    }
}

impl<T: SmartInitializingSingleton + 'static> BeanDefinitionBuilder<T> {
    pub fn smart_initializing(self) -> Self {
        self.capability(LifecycleStep::AfterSingletonsInstantiated, None, |bean, _| {
            Some(bean.after_singletons_instantiated())
        })
    }
}

impl<T: FactoryBean + 'static> BeanDefinitionBuilder<T> {
    /// 声明 FactoryBean 的产品类型，类型查询不再需要实例化工厂
    pub fn produces(mut self, object_type: BeanType) -> Self {
        if let Some(metadata) = self.definition.factory_bean.as_mut() {
            metadata.object_type = Some(Arc::new(object_type));
        }
        self
    }

    /// FactoryBean 的产品每次获取都重新生产
    pub fn product_prototype(mut self) -> Self {
        if let Some(metadata) = self.definition.factory_bean.as_mut() {
            metadata.product_singleton = false;
        }
        self
    }
}
