//! 生命周期顺序、失败回滚和销毁顺序的集成测试

use di_abstractions::{
    BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryAware, BeanFactoryExt,
    BeanNameAware, BeanPostProcessor, ConfigurableBeanFactory, DisposableBean, InitializingBean,
    SmartInitializingSingleton,
};
use di_impl::DefaultBeanFactory;
use infrastructure_common::{Bean, BeanError, LifecycleStep};
use parking_lot::Mutex;
use std::sync::Arc;

type EventLog = Arc<Mutex<Vec<String>>>;

fn push(log: &EventLog, event: impl Into<String>) {
    log.lock().push(event.into());
}

struct Recorder {
    log: EventLog,
    dependency: Mutex<Option<Arc<String>>>,
}

impl Recorder {
    fn new(log: EventLog) -> Self {
        push(&log, "construct");
        Self {
            log,
            dependency: Mutex::new(None),
        }
    }
}

impl BeanNameAware for Recorder {
    fn set_bean_name(&self, name: &str) -> anyhow::Result<()> {
        push(&self.log, format!("name:{name}"));
        Ok(())
    }
}

impl BeanFactoryAware for Recorder {
    fn set_bean_factory(&self, factory: Arc<dyn BeanFactory>) -> anyhow::Result<()> {
        push(&self.log, format!("factory:{}", factory.contains_bean("recorder")));
        Ok(())
    }
}

impl InitializingBean for Recorder {
    fn after_properties_set(&self) -> anyhow::Result<()> {
        let dependency = self.dependency.lock().clone();
        push(&self.log, format!("init:{}", dependency.map_or("none".into(), |d| d.to_string())));
        Ok(())
    }
}

impl SmartInitializingSingleton for Recorder {
    fn after_singletons_instantiated(&self) -> anyhow::Result<()> {
        push(&self.log, "all-singletons");
        Ok(())
    }
}

impl DisposableBean for Recorder {
    fn destroy(&self) -> anyhow::Result<()> {
        push(&self.log, "destroy");
        Ok(())
    }
}

/// 只记录名为 `recorder` 的 bean
struct Recording {
    log: EventLog,
}

impl BeanPostProcessor for Recording {
    fn post_process_before_initialization(&self, bean: Bean, bean_name: &str) -> anyhow::Result<Bean> {
        if bean_name == "recorder" {
            push(&self.log, "before-init");
        }
        Ok(bean)
    }

    fn post_process_after_initialization(&self, bean: Bean, bean_name: &str) -> anyhow::Result<Bean> {
        if bean_name == "recorder" {
            push(&self.log, "after-init");
        }
        Ok(bean)
    }

    fn requires_destruction(&self, bean: &Bean) -> bool {
        bean.downcast::<Recorder>().is_some()
    }

    fn post_process_before_destruction(&self, _bean: &Bean, bean_name: &str) -> anyhow::Result<()> {
        push(&self.log, format!("before-destroy:{bean_name}"));
        Ok(())
    }
}

fn recorder_definition(log: &EventLog) -> BeanDefinition {
    let log = log.clone();
    BeanDefinition::supplier(move |_| Ok(Recorder::new(log.clone())))
        .property_ref("dependency", "dependency", |recorder: &Recorder, value: Arc<String>| {
            push(&recorder.log, format!("property:{value}"));
            *recorder.dependency.lock() = Some(value);
            Ok(())
        })
        .bean_name_aware()
        .bean_factory_aware()
        .initializing()
        .init_method("start", |recorder: &Recorder| {
            push(&recorder.log, "custom-init");
            Ok(())
        })
        .smart_initializing()
        .disposable()
        .destroy_method("stop", |recorder: &Recorder| {
            push(&recorder.log, "custom-destroy");
            Ok(())
        })
        .build()
}

#[test]
fn test_full_lifecycle_runs_in_documented_order() {
    let log = EventLog::default();
    let factory = DefaultBeanFactory::new();
    factory.add_bean_post_processor(Arc::new(Recording { log: log.clone() }));
    factory.register_bean_definition("recorder", recorder_definition(&log)).unwrap();
    factory
        .register_bean_definition(
            "dependency",
            BeanDefinition::supplier(|_| Ok(String::from("db"))).build(),
        )
        .unwrap();

    factory.pre_instantiate_singletons().unwrap();
    factory.destroy_singletons();

    assert_eq!(
        *log.lock(),
        vec![
            "construct",
            "property:db",
            "name:recorder",
            "factory:true",
            "before-init",
            "init:db",
            "custom-init",
            "after-init",
            "all-singletons",
            "before-destroy:recorder",
            "destroy",
            "custom-destroy",
        ]
    );
    assert!(!factory.contains_singleton("recorder"));
}

#[test]
fn test_prototypes_are_never_destroyed_by_the_factory() {
    let log = EventLog::default();
    let factory = DefaultBeanFactory::new();
    let definition_log = log.clone();
    factory
        .register_bean_definition(
            "recorder",
            BeanDefinition::supplier(move |_| Ok(Recorder::new(definition_log.clone())))
                .prototype()
                .disposable()
                .build(),
        )
        .unwrap();

    factory.get_bean("recorder").unwrap();
    factory.get_bean("recorder").unwrap();
    factory.destroy_singletons();

    assert_eq!(*log.lock(), vec!["construct", "construct"]);
}

#[test]
fn test_post_processor_can_replace_the_instance() {
    struct Shouting;

    impl BeanPostProcessor for Shouting {
        fn post_process_after_initialization(&self, bean: Bean, _: &str) -> anyhow::Result<Bean> {
            Ok(match bean.downcast::<String>() {
                Some(text) => Bean::new(text.to_uppercase()),
                None => bean,
            })
        }
    }

    let factory = DefaultBeanFactory::new();
    factory.add_bean_post_processor(Arc::new(Shouting));
    factory
        .register_bean_definition(
            "greeting",
            BeanDefinition::supplier(|_| Ok(String::from("hello"))).build(),
        )
        .unwrap();

    assert_eq!(*factory.get_bean_typed::<String>("greeting").unwrap(), "HELLO");
    assert_eq!(factory.bean_post_processor_count(), 1);
}

#[test]
fn test_failing_initializer_rolls_back_and_allows_retry() {
    let attempts = Arc::new(Mutex::new(0_u32));
    let factory = DefaultBeanFactory::new();
    let counter = attempts.clone();
    factory
        .register_bean_definition(
            "flaky",
            BeanDefinition::supplier(|_| Ok(String::from("flaky")))
                .init_method("connect", move |_: &String| {
                    let mut attempts = counter.lock();
                    *attempts += 1;
                    if *attempts == 1 {
                        anyhow::bail!("connection refused");
                    }
                    Ok(())
                })
                .build(),
        )
        .unwrap();

    let err = factory.get_bean("flaky").unwrap_err();
    match &err {
        BeanError::BeanCreation { name, step, source } => {
            assert_eq!(name, "flaky");
            assert_eq!(*step, LifecycleStep::CustomInitialization);
            assert!(source.to_string().contains("connection refused"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!factory.contains_singleton("flaky"));
    assert!(!factory.is_currently_in_creation("flaky"));

    assert!(factory.get_bean("flaky").is_ok());
    assert_eq!(*attempts.lock(), 2);
}

#[test]
fn test_nested_failure_names_the_outer_bean() {
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition(
            "broken",
            BeanDefinition::supplier(|_| -> anyhow::Result<String> { anyhow::bail!("no disk") }).build(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "consumer",
            BeanDefinition::supplier(|_| Ok(1_u8))
                .property_ref("input", "broken", |_: &u8, _: Arc<String>| Ok(()))
                .build(),
        )
        .unwrap();

    let err = factory.get_bean("consumer").unwrap_err();
    match &err {
        BeanError::BeanCreation { name, step, .. } => {
            assert_eq!(name, "consumer");
            assert_eq!(*step, LifecycleStep::PropertyPopulation);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        err.root_cause(),
        BeanError::BeanCreation { name, step: LifecycleStep::Instantiation, .. } if name == "broken"
    ));
    assert!(factory.singleton_names().is_empty());
}

fn tracked(log: &EventLog, name: &'static str) -> di_abstractions::BeanDefinitionBuilder<String> {
    let log = log.clone();
    BeanDefinition::supplier(move |_| Ok(name.to_string())).destroy_method("close", move |_: &String| {
        push(&log, name);
        Ok(())
    })
}

#[test]
fn test_depends_on_controls_creation_and_destruction_order() {
    let log = EventLog::default();
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition("service", tracked(&log, "service").depends_on("database").build())
        .unwrap();
    factory
        .register_bean_definition("database", tracked(&log, "database").build())
        .unwrap();
    factory
        .register_bean_definition("cache", tracked(&log, "cache").build())
        .unwrap();

    factory.pre_instantiate_singletons().unwrap();
    assert_eq!(factory.singleton_names(), vec!["database", "service", "cache"]);
    assert_eq!(factory.dependent_beans("database"), vec!["service"]);
    assert_eq!(factory.dependencies_for_bean("service"), vec!["database"]);

    factory.destroy_singletons();
    assert_eq!(*log.lock(), vec!["cache", "service", "database"]);
}

#[test]
fn test_destroying_a_dependency_destroys_its_dependents_first() {
    let log = EventLog::default();
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition("database", tracked(&log, "database").build())
        .unwrap();
    factory
        .register_bean_definition(
            "repository",
            tracked(&log, "repository").arg_ref("database").build(),
        )
        .unwrap();

    factory.get_bean("repository").unwrap();
    factory.destroy_singleton("database");

    assert_eq!(*log.lock(), vec!["repository", "database"]);
    assert!(!factory.contains_singleton("repository"));
    assert!(!factory.contains_singleton("database"));
}

#[test]
fn test_lazy_singletons_are_created_on_first_use() {
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition(
            "lazy",
            BeanDefinition::supplier(|_| Ok(String::from("later")))
                .lazy_init(true)
                .build(),
        )
        .unwrap();

    factory.pre_instantiate_singletons().unwrap();
    assert!(!factory.contains_singleton("lazy"));
    factory.get_bean("lazy").unwrap();
    assert!(factory.contains_singleton("lazy"));
}
