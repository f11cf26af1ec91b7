//! 默认 bean 工厂
//!
//! 组合别名表、定义存储和单例注册表，实现按名称和按类型的解析、
//! 生命周期编排以及向父工厂的委托。

use crate::alias::AliasTable;
use crate::definitions::DefinitionStore;
use crate::lifecycle::{
    apply_after_initialization, creation_error, nested_error, DisposableBeanAdapter,
    LifecycleOrchestrator,
};
use crate::resolution::ResolutionGuard;
use crate::singletons::SingletonRegistry;
use dashmap::DashMap;
use di_abstractions::{
    is_factory_dereference, transformed_bean_name, AwareCollaborators, BeanArgs,
    BeanCreationContext, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanPostProcessor,
    BeanScope, BindingContext, ConfigurableBeanFactory, ConstructorArg, ContainerConfig,
    ContainerStats, FactoryBean, HierarchicalBeanFactory, Instantiation, ListableBeanFactory,
    Scope, TypeMatch, FACTORY_BEAN_PREFIX, SCOPE_PROTOTYPE, SCOPE_SINGLETON,
};
use infrastructure_common::{Bean, BeanError, BeanResult, BeanType, LifecycleStep, TypeInfo};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace};
use uuid::Uuid;

static RESERVED_SCOPES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| [SCOPE_SINGLETON, SCOPE_PROTOTYPE].into_iter().collect());

/// 本级可确定的类型信息
enum LocalType {
    Known(Arc<BeanType>),
    NotAFactory,
    Unknown,
}

/// 默认 bean 工厂
///
/// 通过 [`DefaultBeanFactory::new`] 创建，总是以 `Arc` 形式持有，
/// 感知工厂的 bean 拿到的就是这个 `Arc`。
pub struct DefaultBeanFactory {
    id: Uuid,
    config: ContainerConfig,
    self_ref: Weak<DefaultBeanFactory>,
    parent: RwLock<Option<Weak<dyn BeanFactory>>>,
    aliases: AliasTable,
    definitions: DefinitionStore,
    singletons: SingletonRegistry,
    factory_products: DashMap<String, Bean>,
    post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
    scopes: DashMap<String, Arc<dyn Scope>>,
    collaborators: RwLock<AwareCollaborators>,
    admin_lock: Mutex<()>,
    resolution_started: AtomicBool,
    created_instances: AtomicUsize,
    resolution_errors: AtomicUsize,
}

impl DefaultBeanFactory {
    /// 使用默认配置创建工厂
    pub fn new() -> Arc<Self> {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定配置创建工厂
    pub fn with_config(config: ContainerConfig) -> Arc<Self> {
        let factory = Arc::new_cyclic(|self_ref| Self {
            id: Uuid::new_v4(),
            config,
            self_ref: self_ref.clone(),
            parent: RwLock::new(None),
            aliases: AliasTable::new(),
            definitions: DefinitionStore::new(),
            singletons: SingletonRegistry::new(),
            factory_products: DashMap::new(),
            post_processors: RwLock::new(Vec::new()),
            scopes: DashMap::new(),
            collaborators: RwLock::new(AwareCollaborators::default()),
            admin_lock: Mutex::new(()),
            resolution_started: AtomicBool::new(false),
            created_instances: AtomicUsize::new(0),
            resolution_errors: AtomicUsize::new(0),
        });
        debug!("创建 bean 工厂 {}", factory.id);
        factory
    }

    /// 创建以 `parent` 为父工厂的子工厂
    pub fn with_parent(config: ContainerConfig, parent: &Arc<dyn BeanFactory>) -> Arc<Self> {
        let factory = Self::with_config(config);
        *factory.parent.write() = Some(Arc::downgrade(parent));
        factory
    }

    /// 工厂唯一标识
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 单例是否正在创建
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.singletons.is_in_creation(&self.canonical_name(name))
    }

    /// 依赖于 `name` 的 bean，销毁 `name` 之前会先销毁它们
    pub fn dependent_beans(&self, name: &str) -> Vec<String> {
        self.singletons.dependents_of(&self.canonical_name(name))
    }

    /// `name` 依赖的 bean
    pub fn dependencies_for_bean(&self, name: &str) -> Vec<String> {
        self.singletons.dependencies_of(&self.canonical_name(name))
    }

    /// 已完成的单例名称，按完成顺序
    pub fn singleton_names(&self) -> Vec<String> {
        self.singletons.names()
    }

    fn canonical_name(&self, name: &str) -> String {
        self.aliases.canonical_name(transformed_bean_name(name))
    }

    fn parent_factory(&self) -> Option<Arc<dyn BeanFactory>> {
        self.parent.read().as_ref().and_then(Weak::upgrade)
    }

    /// 沿候选父工厂的委托链向上检查，链上出现本工厂说明设置后会形成环
    fn check_parent_chain(&self, candidate: Arc<dyn BeanFactory>) -> BeanResult<()> {
        let mut visited = HashSet::new();
        let mut current = Some(candidate);
        while let Some(factory) = current {
            if factory.factory_id() == Some(self.id) {
                return Err(BeanError::illegal_state(format!(
                    "工厂 {} 已经是候选父工厂的祖先，不能形成环",
                    self.id
                )));
            }
            if !visited.insert(Arc::as_ptr(&factory).cast::<()>() as usize) {
                return Err(BeanError::illegal_state("候选父工厂的委托链本身存在环"));
            }
            current = factory.delegation_parent();
        }
        Ok(())
    }

    fn as_bean_factory(&self) -> Option<Arc<dyn BeanFactory>> {
        self.self_ref
            .upgrade()
            .map(|factory| factory as Arc<dyn BeanFactory>)
    }

    fn post_processor_snapshot(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.post_processors.read().clone()
    }

    fn record<T>(&self, result: BeanResult<T>) -> BeanResult<T> {
        if result.is_err() && self.config.track_statistics {
            self.resolution_errors.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn do_get_bean(&self, name: &str, args: Option<Vec<ConstructorArg>>) -> BeanResult<Bean> {
        self.resolution_started.store(true, Ordering::SeqCst);
        let is_deref = is_factory_dereference(name);
        let canonical = self.canonical_name(name);
        let definition = self.definitions.get(&canonical);

        if args.is_none() {
            let shared = self
                .singletons
                .get(&canonical, self.config.allow_circular_references);
            if let Some(shared) = shared {
                return self.object_for_instance(shared, &canonical, is_deref, definition.as_deref());
            }
        } else if definition.is_none() && self.singletons.contains(&canonical) {
            return Err(BeanError::InvalidScopeUsage {
                name: canonical,
                scope: SCOPE_SINGLETON.to_string(),
            });
        }

        let Some(definition) = definition else {
            if let Some(parent) = self.parent_factory() {
                let forwarded = original_name(&canonical, is_deref);
                debug!("本级没有 '{}'，委托父工厂", forwarded);
                return match args {
                    Some(args) => parent.get_bean_with_args(&forwarded, args),
                    None => parent.get_bean(&forwarded),
                };
            }
            return Err(BeanError::no_such_bean(name));
        };

        if definition.is_abstract() {
            return Err(BeanError::BeanIsAbstract { name: canonical });
        }
        if is_deref && !definition.is_factory_bean() {
            return Err(BeanError::BeanIsNotAFactory { name: canonical });
        }
        if args.is_some() && !definition.is_prototype() {
            return Err(BeanError::InvalidScopeUsage {
                name: canonical,
                scope: definition.scope().to_string(),
            });
        }

        let instance = match definition.scope() {
            BeanScope::Singleton => self.get_or_create_singleton(&canonical, &definition)?,
            BeanScope::Prototype => self.create_bean(&canonical, &definition, args)?,
            BeanScope::Custom(scope_name) => self.get_scoped(&canonical, &definition, scope_name)?,
        };
        self.object_for_instance(instance, &canonical, is_deref, Some(definition.as_ref()))
    }

    fn get_or_create_singleton(
        &self,
        name: &str,
        definition: &Arc<BeanDefinition>,
    ) -> BeanResult<Bean> {
        let _lock = self.singletons.creation_lock();
        if let Some(existing) = self.singletons.get(name, false) {
            return Ok(existing);
        }
        if self.singletons.is_destroying() {
            return Err(BeanError::illegal_state(format!(
                "单例正在销毁，不能创建 bean '{}'",
                name
            )));
        }

        let outermost = self.singletons.begin_creation(name);
        let result = self.create_bean(name, definition, None);
        if !outermost {
            // 嵌套进入同一名称：缓存和回滚都交给外层
            return result;
        }
        self.singletons.end_creation(name);

        match result {
            Ok(bean) => {
                self.singletons.add(name, bean.clone());
                self.register_disposable(name, &bean, definition);
                Ok(bean)
            }
            Err(e) => {
                debug!("bean '{}' 创建失败，回滚缓存: {}", name, e);
                self.factory_products.remove(name);
                self.singletons.destroy_singleton(name);
                Err(e)
            }
        }
    }

    fn get_scoped(
        &self,
        name: &str,
        definition: &Arc<BeanDefinition>,
        scope_name: &str,
    ) -> BeanResult<Bean> {
        let scope = self
            .scopes
            .get(scope_name)
            .map(|scope| scope.value().clone())
            .ok_or_else(|| BeanError::NoSuchScope {
                scope: scope_name.to_string(),
            })?;
        let mut created: Option<Bean> = None;
        let mut create = || -> BeanResult<Bean> {
            let bean = self.create_bean(name, definition, None)?;
            created = Some(bean.clone());
            Ok(bean)
        };
        let bean = scope.get(name, &mut create)?;

        // 只为作用域实际保留的实例注册销毁回调
        match created {
            Some(created) if created.ptr_eq(&bean) => {
                let processors = self.post_processor_snapshot();
                if let Some(adapter) = DisposableBeanAdapter::new(name, &bean, definition, &processors) {
                    scope.register_destruction_callback(name, Box::new(move || adapter.destroy()));
                }
            }
            Some(_) => debug!("作用域 '{}' 保留了其他实例，丢弃新建的 '{}'", scope_name, name),
            None => {}
        }
        Ok(bean)
    }

    fn register_disposable(&self, name: &str, bean: &Bean, definition: &Arc<BeanDefinition>) {
        let processors = self.post_processor_snapshot();
        if let Some(adapter) = DisposableBeanAdapter::new(name, bean, definition, &processors) {
            self.singletons.register_disposable(adapter);
        }
    }

    fn create_bean(
        &self,
        name: &str,
        definition: &BeanDefinition,
        args: Option<Vec<ConstructorArg>>,
    ) -> BeanResult<Bean> {
        let _guard = ResolutionGuard::enter(self.id, name, self.config.max_resolution_depth)?;
        self.resolve_depends_on(name, definition)?;
        debug!(
            "创建 bean '{}' ({}, {}, {})",
            name,
            definition.bean_type(),
            definition.scope(),
            definition.instantiation().kind()
        );

        let ctx = BeanCreationContext::new(name, self);
        let raw = self.instantiate(name, definition, args, &ctx);
        for dependency in ctx.take_requested() {
            self.singletons
                .register_dependent(&self.canonical_name(&dependency), name);
        }
        let raw = raw?;

        let early = definition.is_singleton() && self.config.allow_circular_references;
        if early {
            self.singletons.add_early_reference(name, raw.clone());
        }
        let bean = self.initialize_bean(name, definition, raw.clone())?;
        if early && self.singletons.early_reference_exposed(name) && !bean.ptr_eq(&raw) {
            return Err(BeanError::creation(
                name,
                LifecycleStep::PostInitialization,
                format!(
                    "bean '{}' 的原始实例已在循环引用中提前暴露，但随后被后处理器替换",
                    name
                ),
            ));
        }

        if self.config.track_statistics {
            self.created_instances.fetch_add(1, Ordering::Relaxed);
        }
        Ok(bean)
    }

    fn resolve_depends_on(&self, name: &str, definition: &BeanDefinition) -> BeanResult<()> {
        for dependency in definition.depends_on() {
            self.singletons
                .register_dependent(&self.canonical_name(dependency), name);
            self.get_bean(dependency)
                .map_err(|e| nested_error(name, LifecycleStep::DependsOn, e))?;
        }
        Ok(())
    }

    fn instantiate(
        &self,
        name: &str,
        definition: &BeanDefinition,
        args: Option<Vec<ConstructorArg>>,
        ctx: &BeanCreationContext<'_>,
    ) -> BeanResult<Bean> {
        let declared = args.unwrap_or_else(|| definition.constructor_args().to_vec());
        let resolved = declared
            .iter()
            .map(|arg| self.resolve_value(name, arg, LifecycleStep::Instantiation))
            .collect::<BeanResult<Vec<_>>>()?;
        let args = BeanArgs::new(resolved);

        let instance = match definition.instantiation() {
            Instantiation::Constructor(constructor) => constructor(ctx, &args),
            Instantiation::Supplier(supplier) => supplier(ctx),
            Instantiation::FactoryMethod {
                factory_bean,
                method_name,
                method,
            } => {
                trace!("通过 {}.{} 创建 '{}'", factory_bean, method_name, name);
                self.singletons
                    .register_dependent(&self.canonical_name(factory_bean), name);
                let factory = self
                    .get_bean(factory_bean)
                    .map_err(|e| nested_error(name, LifecycleStep::Instantiation, e))?;
                method(&factory, ctx, &args)
            }
        }
        .map_err(|e| creation_error(name, LifecycleStep::Instantiation, e))?;

        Ok(Bean::with_type(instance, definition.bean_type().clone()))
    }

    fn resolve_value(&self, owner: &str, arg: &ConstructorArg, step: LifecycleStep) -> BeanResult<Bean> {
        match arg {
            ConstructorArg::Value(bean) => Ok(bean.clone()),
            ConstructorArg::BeanRef(reference) => {
                self.singletons
                    .register_dependent(&self.canonical_name(reference), owner);
                self.get_bean(reference)
                    .map_err(|e| nested_error(owner, step, e))
            }
        }
    }

    fn initialize_bean(&self, name: &str, definition: &BeanDefinition, raw: Bean) -> BeanResult<Bean> {
        self.populate_properties(name, definition, &raw)?;

        let processors = self.post_processor_snapshot();
        let collaborators = self.collaborators.read().clone();
        let binding = BindingContext::new(
            name,
            definition.bean_type(),
            self.as_bean_factory(),
            &collaborators,
        );
        let orchestrator = LifecycleOrchestrator::new(name, definition, &processors, &binding);
        orchestrator.apply_bindings(&raw)?;
        orchestrator.initialize(raw)
    }

    fn populate_properties(&self, name: &str, definition: &BeanDefinition, target: &Bean) -> BeanResult<()> {
        for property in definition.property_values() {
            let value = self.resolve_value(name, property.value(), LifecycleStep::PropertyPopulation)?;
            match property.apply(target, &value) {
                Some(Ok(())) => trace!("bean '{}' 注入属性 '{}'", name, property.name()),
                Some(Err(e)) => {
                    return Err(creation_error(name, LifecycleStep::PropertyPopulation, e));
                }
                None => debug!("bean '{}' 的实例不接受属性 '{}'，跳过", name, property.name()),
            }
        }
        Ok(())
    }

    fn object_for_instance(
        &self,
        instance: Bean,
        name: &str,
        is_deref: bool,
        definition: Option<&BeanDefinition>,
    ) -> BeanResult<Bean> {
        let metadata = definition.and_then(BeanDefinition::factory_bean_metadata);
        if is_deref {
            return match metadata {
                Some(_) => Ok(instance),
                None => Err(BeanError::BeanIsNotAFactory {
                    name: name.to_string(),
                }),
            };
        }
        let Some(metadata) = metadata else {
            return Ok(instance);
        };
        let Some(factory) = metadata.factory_of(&instance) else {
            debug!("'{}' 的实例已不是 FactoryBean，直接返回实例", name);
            return Ok(instance);
        };

        let shared = definition.map_or(false, BeanDefinition::is_singleton)
            && metadata.is_product_singleton()
            && factory.is_singleton();
        if !shared {
            return self.produce(name, factory.as_ref());
        }
        if let Some(product) = self.cached_product(name) {
            return Ok(product);
        }
        let _lock = self.singletons.creation_lock();
        if let Some(product) = self.cached_product(name) {
            return Ok(product);
        }
        let product = self.produce(name, factory.as_ref())?;
        self.factory_products
            .insert(name.to_string(), product.clone());
        Ok(product)
    }

    fn cached_product(&self, name: &str) -> Option<Bean> {
        self.factory_products
            .get(name)
            .map(|product| product.value().clone())
    }

    fn produce(&self, name: &str, factory: &dyn FactoryBean) -> BeanResult<Bean> {
        trace!("从 FactoryBean '{}' 获取产品", name);
        let product = factory
            .get_object()
            .map_err(|e| creation_error(name, LifecycleStep::FactoryObject, e))?;
        let processors = self.post_processor_snapshot();
        apply_after_initialization(&processors, product, name, LifecycleStep::FactoryObject)
    }

    /// FactoryBean 产品的类型，无法确定时返回 `None`
    fn product_type(
        &self,
        name: &str,
        definition: &BeanDefinition,
        allow_init: bool,
    ) -> Option<Arc<BeanType>> {
        let metadata = definition.factory_bean_metadata()?;
        if let Some(declared) = metadata.object_type() {
            return Some(declared.clone());
        }
        if let Some(product) = self.cached_product(name) {
            return Some(product.bean_type().clone());
        }
        let factory_instance = match self.singletons.get(name, false) {
            Some(instance) => instance,
            None if allow_init && !definition.is_abstract() => {
                match self.get_bean(&original_name(name, true)) {
                    Ok(instance) => instance,
                    Err(e) => {
                        debug!("无法实例化 FactoryBean '{}' 以确定产品类型: {}", name, e);
                        return None;
                    }
                }
            }
            None => return None,
        };
        metadata
            .factory_of(&factory_instance)?
            .object_type()
            .map(Arc::new)
    }

    fn local_type(&self, canonical: &str, is_deref: bool, allow_init: bool) -> Option<LocalType> {
        let definition = self.definitions.get(canonical);
        let instance = self.singletons.get(canonical, false);
        let is_factory = definition
            .as_ref()
            .map_or(false, |definition| definition.is_factory_bean());

        match (definition, instance) {
            (None, None) => None,
            _ if is_deref && !is_factory => Some(LocalType::NotAFactory),
            (Some(definition), _) if is_factory && !is_deref => Some(
                self.product_type(canonical, &definition, allow_init)
                    .map_or(LocalType::Unknown, LocalType::Known),
            ),
            (_, Some(instance)) => Some(LocalType::Known(instance.bean_type().clone())),
            (Some(definition), None) => Some(LocalType::Known(definition.bean_type().clone())),
        }
    }

    fn is_local_factory(&self, canonical: &str) -> bool {
        self.definitions
            .get(canonical)
            .map_or(false, |definition| definition.is_factory_bean())
    }

    /// 根据已缓存的工厂实例判断产品是否共享
    fn is_product_shared(&self, canonical: &str, definition: &BeanDefinition) -> bool {
        let Some(metadata) = definition.factory_bean_metadata() else {
            return false;
        };
        let factory_singleton = self
            .singletons
            .get(canonical, false)
            .and_then(|instance| metadata.factory_of(&instance))
            .map_or(true, |factory| factory.is_singleton());
        metadata.is_product_singleton() && factory_singleton
    }

    fn resolve_by_type(&self, required: &TypeInfo, args: Option<Vec<ConstructorArg>>) -> BeanResult<Bean> {
        let candidates = self.bean_names_for_type(required, true, true);
        let chosen = match candidates.as_slice() {
            [] => {
                if let Some(parent) = self.parent_factory() {
                    debug!("本级没有类型为 {} 的 bean，委托父工厂", required);
                    return match args {
                        Some(args) => parent.get_bean_by_type_with_args(required, args),
                        None => parent.get_bean_by_type(required),
                    };
                }
                return Err(BeanError::no_such_bean_of_type(required.name.clone()));
            }
            [single] => single.clone(),
            _ => {
                let primary: Vec<&String> = candidates
                    .iter()
                    .filter(|name| {
                        self.definitions
                            .get(transformed_bean_name(name))
                            .map_or(false, |definition| definition.is_primary())
                    })
                    .collect();
                match primary.as_slice() {
                    [only] => (*only).clone(),
                    _ => {
                        return Err(BeanError::NoUniqueBean {
                            type_name: required.name.clone(),
                            candidates: candidates.clone(),
                        })
                    }
                }
            }
        };
        debug!("按类型 {} 解析到 '{}'", required, chosen);
        let bean = self.do_get_bean(&chosen, args)?;
        check_type(&chosen, bean, required)
    }

    fn reset_bean(&self, name: &str) {
        self.factory_products.remove(name);
        if self.singletons.contains(name) {
            self.singletons.destroy_singleton(name);
        }
    }
}

fn original_name(canonical: &str, is_deref: bool) -> String {
    if is_deref {
        format!("{}{}", FACTORY_BEAN_PREFIX, canonical)
    } else {
        canonical.to_string()
    }
}

fn check_type(name: &str, bean: Bean, required: &TypeInfo) -> BeanResult<Bean> {
    if bean.is_assignable_to(required) {
        Ok(bean)
    } else {
        Err(BeanError::BeanNotOfRequiredType {
            name: name.to_string(),
            required_type: required.name.clone(),
            actual_type: bean.type_info().name.clone(),
        })
    }
}

impl fmt::Debug for DefaultBeanFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultBeanFactory")
            .field("id", &self.id)
            .field("definitions", &self.definitions.names())
            .field("singletons", &self.singletons.len())
            .field("has_parent", &self.parent_factory().is_some())
            .finish()
    }
}

impl BeanFactory for DefaultBeanFactory {
    fn get_bean(&self, name: &str) -> BeanResult<Bean> {
        self.record(self.do_get_bean(name, None))
    }

    fn get_bean_of_type(&self, name: &str, required_type: &TypeInfo) -> BeanResult<Bean> {
        let result = self
            .do_get_bean(name, None)
            .and_then(|bean| check_type(name, bean, required_type));
        self.record(result)
    }

    fn get_bean_with_args(&self, name: &str, args: Vec<ConstructorArg>) -> BeanResult<Bean> {
        self.record(self.do_get_bean(name, Some(args)))
    }

    fn get_bean_by_type(&self, required_type: &TypeInfo) -> BeanResult<Bean> {
        self.record(self.resolve_by_type(required_type, None))
    }

    fn get_bean_by_type_with_args(
        &self,
        required_type: &TypeInfo,
        args: Vec<ConstructorArg>,
    ) -> BeanResult<Bean> {
        self.record(self.resolve_by_type(required_type, Some(args)))
    }

    fn contains_bean(&self, name: &str) -> bool {
        let canonical = self.canonical_name(name);
        if self.singletons.contains(&canonical) || self.definitions.contains(&canonical) {
            return !is_factory_dereference(name) || self.is_local_factory(&canonical);
        }
        self.parent_factory().map_or(false, |parent| {
            parent.contains_bean(&original_name(&canonical, is_factory_dereference(name)))
        })
    }

    fn is_singleton(&self, name: &str) -> BeanResult<bool> {
        let is_deref = is_factory_dereference(name);
        let canonical = self.canonical_name(name);
        if let Some(definition) = self.definitions.get(&canonical) {
            if !definition.is_singleton() {
                return Ok(false);
            }
            if definition.is_factory_bean() {
                return Ok(is_deref || self.is_product_shared(&canonical, &definition));
            }
            return Ok(!is_deref);
        }
        if self.singletons.contains(&canonical) {
            return Ok(!is_deref);
        }
        match self.parent_factory() {
            Some(parent) => parent.is_singleton(&original_name(&canonical, is_deref)),
            None => Err(BeanError::no_such_bean(name)),
        }
    }

    fn is_prototype(&self, name: &str) -> BeanResult<bool> {
        let is_deref = is_factory_dereference(name);
        let canonical = self.canonical_name(name);
        if let Some(definition) = self.definitions.get(&canonical) {
            if definition.is_prototype() {
                return Ok(!is_deref || definition.is_factory_bean());
            }
            if is_deref || !definition.is_factory_bean() || !definition.is_singleton() {
                return Ok(false);
            }
            return Ok(!self.is_product_shared(&canonical, &definition));
        }
        if self.singletons.contains(&canonical) {
            return Ok(false);
        }
        match self.parent_factory() {
            Some(parent) => parent.is_prototype(&original_name(&canonical, is_deref)),
            None => Err(BeanError::no_such_bean(name)),
        }
    }

    fn is_type_match(
        &self,
        name: &str,
        type_to_match: &TypeInfo,
        allow_factory_bean_init: bool,
    ) -> BeanResult<TypeMatch> {
        let is_deref = is_factory_dereference(name);
        let canonical = self.canonical_name(name);
        match self.local_type(&canonical, is_deref, allow_factory_bean_init) {
            Some(LocalType::Known(bean_type)) => {
                Ok(TypeMatch::from_bool(bean_type.is_assignable_to(type_to_match)))
            }
            Some(LocalType::NotAFactory) => Ok(TypeMatch::DoesNotMatch),
            Some(LocalType::Unknown) => Ok(TypeMatch::Undeterminable),
            None => match self.parent_factory() {
                Some(parent) => parent.is_type_match(
                    &original_name(&canonical, is_deref),
                    type_to_match,
                    allow_factory_bean_init,
                ),
                None => Err(BeanError::no_such_bean(name)),
            },
        }
    }

    fn get_type(
        &self,
        name: &str,
        allow_factory_bean_init: bool,
    ) -> BeanResult<Option<Arc<BeanType>>> {
        let is_deref = is_factory_dereference(name);
        let canonical = self.canonical_name(name);
        match self.local_type(&canonical, is_deref, allow_factory_bean_init) {
            Some(LocalType::Known(bean_type)) => Ok(Some(bean_type)),
            Some(LocalType::NotAFactory | LocalType::Unknown) => Ok(None),
            None => match self.parent_factory() {
                Some(parent) => {
                    parent.get_type(&original_name(&canonical, is_deref), allow_factory_bean_init)
                }
                None => Err(BeanError::no_such_bean(name)),
            },
        }
    }

    fn factory_id(&self) -> Option<Uuid> {
        Some(self.id)
    }

    fn delegation_parent(&self) -> Option<Arc<dyn BeanFactory>> {
        self.parent_factory()
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        let is_deref = is_factory_dereference(name);
        let requested = transformed_bean_name(name);
        let canonical = self.aliases.canonical_name(requested);

        let mut aliases = Vec::new();
        if canonical != requested {
            aliases.push(original_name(&canonical, is_deref));
        }
        aliases.extend(
            self.aliases
                .aliases(&canonical)
                .into_iter()
                .filter(|alias| alias != requested)
                .map(|alias| original_name(&alias, is_deref)),
        );

        let known_locally =
            self.singletons.contains(&canonical) || self.definitions.contains(&canonical);
        if !known_locally {
            if let Some(parent) = self.parent_factory() {
                aliases.extend(parent.get_aliases(&original_name(&canonical, is_deref)));
            }
        }
        aliases
    }
}

impl HierarchicalBeanFactory for DefaultBeanFactory {
    fn parent_bean_factory(&self) -> Option<Arc<dyn BeanFactory>> {
        self.parent_factory()
    }

    fn contains_local_bean(&self, name: &str) -> bool {
        let canonical = self.canonical_name(name);
        (self.singletons.contains(&canonical) || self.definitions.contains(&canonical))
            && (!is_factory_dereference(name) || self.is_local_factory(&canonical))
    }
}

impl ListableBeanFactory for DefaultBeanFactory {
    fn contains_bean_definition(&self, name: &str) -> bool {
        self.definitions.contains(name)
    }

    fn bean_definition_count(&self) -> usize {
        self.definitions.len()
    }

    fn bean_definition_names(&self) -> Vec<String> {
        self.definitions.names()
    }

    fn bean_names_for_type(
        &self,
        ty: &TypeInfo,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String> {
        let mut names = Vec::new();
        for (name, definition) in self.definitions.snapshot() {
            if definition.is_abstract() {
                continue;
            }
            let scope_ok = include_non_singletons || definition.is_singleton();
            if definition.is_factory_bean() {
                let product_ok = include_non_singletons || self.is_product_shared(&name, &definition);
                let product_matches = product_ok
                    && scope_ok
                    && self
                        .product_type(&name, &definition, allow_eager_init)
                        .map_or(false, |product| product.is_assignable_to(ty));
                if product_matches {
                    names.push(name);
                } else if scope_ok && definition.bean_type().is_assignable_to(ty) {
                    names.push(original_name(&name, true));
                }
            } else if scope_ok && definition.bean_type().is_assignable_to(ty) {
                names.push(name);
            }
        }

        for name in self.singletons.manual_names() {
            if self.definitions.contains(&name) {
                continue;
            }
            if let Some(bean) = self.singletons.get(&name, false) {
                if bean.is_assignable_to(ty) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn beans_of_type(&self, ty: &TypeInfo) -> BeanResult<Vec<(String, Bean)>> {
        let mut beans = Vec::new();
        for name in self.bean_names_for_type(ty, true, true) {
            match self.get_bean(&name) {
                Ok(bean) => beans.push((name, bean)),
                Err(BeanError::CircularReference { .. }) => {
                    debug!("bean '{}' 正在创建中，跳过", name);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(beans)
    }
}

impl BeanDefinitionRegistry for DefaultBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()> {
        let previous = {
            let _admin = self.admin_lock.lock();
            if name.is_empty() || is_factory_dereference(name) {
                return Err(BeanError::conflict(
                    name,
                    format!("bean 名称不能为空，也不能以 '{}' 开头", FACTORY_BEAN_PREFIX),
                ));
            }
            if self.aliases.is_alias(name) {
                return Err(BeanError::conflict(name, "名称已被用作别名"));
            }
            self.definitions.register(
                name,
                definition,
                self.config.allow_bean_definition_overriding,
            )?
        };
        if previous.is_some() {
            self.reset_bean(name);
        } else {
            info!("注册 bean 定义: {}", name);
        }
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> BeanResult<()> {
        let removed = {
            let _admin = self.admin_lock.lock();
            self.definitions.remove(name)
        };
        if removed.is_none() {
            return Err(BeanError::no_such_bean(name));
        }
        self.reset_bean(name);
        info!("移除 bean 定义: {}", name);
        Ok(())
    }

    fn bean_definition(&self, name: &str) -> BeanResult<Arc<BeanDefinition>> {
        self.definitions
            .get(&self.canonical_name(name))
            .ok_or_else(|| BeanError::no_such_bean(name))
    }

    fn is_bean_name_in_use(&self, name: &str) -> bool {
        let canonical = self.canonical_name(name);
        self.aliases.is_alias(name)
            || self.definitions.contains(&canonical)
            || self.singletons.contains(&canonical)
    }

    fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()> {
        let _admin = self.admin_lock.lock();
        if name.is_empty() || alias.is_empty() {
            return Err(BeanError::conflict(alias, "名称和别名都不能为空"));
        }
        if alias != name && self.definitions.contains(alias) {
            return Err(BeanError::conflict(alias, "别名与已有的 bean 定义同名"));
        }
        self.aliases
            .register(name, alias, self.config.allow_bean_definition_overriding)
    }

    fn remove_alias(&self, alias: &str) -> BeanResult<()> {
        let _admin = self.admin_lock.lock();
        self.aliases.remove(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.aliases.is_alias(name)
    }
}

impl ConfigurableBeanFactory for DefaultBeanFactory {
    fn config(&self) -> &ContainerConfig {
        &self.config
    }

    fn set_parent_bean_factory(&self, parent: Weak<dyn BeanFactory>) -> BeanResult<()> {
        if self.resolution_started.load(Ordering::SeqCst) {
            return Err(BeanError::illegal_state("首次解析之后不能再设置父工厂"));
        }
        let parent_ptr = parent.as_ptr().cast::<()>();
        if std::ptr::eq(parent_ptr, (self as *const Self).cast::<()>()) {
            return Err(BeanError::illegal_state("工厂不能以自身为父工厂"));
        }
        let candidate = parent
            .upgrade()
            .ok_or_else(|| BeanError::illegal_state("父工厂已经释放"))?;
        self.check_parent_chain(candidate)?;
        let mut current = self.parent.write();
        if let Some(existing) = current.as_ref().and_then(Weak::upgrade) {
            if !std::ptr::eq(Arc::as_ptr(&existing).cast::<()>(), parent_ptr) {
                return Err(BeanError::illegal_state("已经设置了其他父工厂"));
            }
        }
        *current = Some(parent);
        debug!("工厂 {} 设置父工厂", self.id);
        Ok(())
    }

    fn register_singleton(&self, name: &str, bean: Bean) -> BeanResult<()> {
        let _admin = self.admin_lock.lock();
        self.singletons.register_manual(name, bean)
    }

    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        info!("添加后处理器: {}", processor.name());
        self.post_processors.write().push(processor);
    }

    fn bean_post_processor_count(&self) -> usize {
        self.post_processors.read().len()
    }

    fn register_scope(&self, name: &str, scope: Arc<dyn Scope>) -> BeanResult<()> {
        if RESERVED_SCOPES.contains(name) {
            return Err(BeanError::illegal_state(format!(
                "不能替换内置作用域 '{}'",
                name
            )));
        }
        if self.scopes.insert(name.to_string(), scope).is_some() {
            info!("替换作用域: {}", name);
        } else {
            info!("注册作用域: {}", name);
        }
        Ok(())
    }

    fn registered_scope_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scopes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn set_aware_collaborators(&self, collaborators: AwareCollaborators) {
        *self.collaborators.write() = collaborators;
    }

    fn pre_instantiate_singletons(&self) -> BeanResult<()> {
        let names = self.definitions.names();
        info!("预实例化单例，共 {} 个定义", names.len());
        for name in &names {
            let Some(definition) = self.definitions.get(name) else {
                continue;
            };
            if definition.is_abstract() || !definition.is_singleton() || definition.is_lazy_init() {
                continue;
            }
            if definition.is_factory_bean() {
                self.get_bean(&original_name(name, true))?;
            } else {
                self.get_bean(name)?;
            }
        }

        let collaborators = self.collaborators.read().clone();
        let factory = self.as_bean_factory();
        for name in &names {
            let Some(definition) = self.definitions.get(name) else {
                continue;
            };
            let Some(capability) = definition.capability(LifecycleStep::AfterSingletonsInstantiated)
            else {
                continue;
            };
            let Some(bean) = self.singletons.get(name, false) else {
                continue;
            };
            let binding =
                BindingContext::new(name, definition.bean_type(), factory.clone(), &collaborators);
            if let Some(Err(e)) = capability.invoke(&bean, &binding) {
                return Err(creation_error(
                    name,
                    LifecycleStep::AfterSingletonsInstantiated,
                    e,
                ));
            }
        }
        Ok(())
    }

    fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains(&self.canonical_name(name))
    }

    fn destroy_singleton(&self, name: &str) {
        let canonical = self.canonical_name(name);
        self.factory_products.remove(&canonical);
        self.singletons.destroy_singleton(&canonical);
    }

    fn destroy_singletons(&self) {
        info!("工厂 {} 销毁所有单例", self.id);
        self.singletons.destroy_all();
        self.factory_products.clear();
    }

    fn stats(&self) -> ContainerStats {
        ContainerStats {
            registered_definitions: self.definitions.len(),
            active_singletons: self.singletons.len(),
            created_instances: self.created_instances.load(Ordering::Relaxed),
            resolution_errors: self.resolution_errors.load(Ordering::Relaxed),
        }
    }
}
