//! 应用上下文的集成测试

use di_abstractions::{
    ApplicationContext, ApplicationContextAware, ApplicationEvent, BeanDefinition,
    BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, Environment,
    EnvironmentAware, HierarchicalBeanFactory, MessageSource, MessageSourceAware,
};
use infrastructure_common::{BeanError, BeanResult, InfrastructureError};
use infrastructure_composition::{
    ApplicationContextBuilder, ContextRefreshedEvent, ContextStatus, SimpleEventPublisher,
    StaticMessageSource,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

#[derive(Default)]
struct Settings {
    url: Mutex<Option<String>>,
    greeting: Mutex<Option<String>>,
    context_name: Mutex<Option<String>>,
}

impl EnvironmentAware for Settings {
    fn set_environment(&self, environment: Arc<dyn Environment>) -> anyhow::Result<()> {
        *self.url.lock() = environment.get_property("db.url");
        Ok(())
    }
}

impl MessageSourceAware for Settings {
    fn set_message_source(&self, source: Arc<dyn MessageSource>) -> anyhow::Result<()> {
        *self.greeting.lock() = source.get_message("welcome", &["orders".to_string()], "en");
        Ok(())
    }
}

impl ApplicationContextAware for Settings {
    fn set_application_context(&self, context: Weak<dyn ApplicationContext>) -> anyhow::Result<()> {
        let context = context
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("context already dropped"))?;
        *self.context_name.lock() = Some(context.application_name().to_string());
        Ok(())
    }
}

fn settings_definitions(registry: &dyn BeanDefinitionRegistry) -> BeanResult<usize> {
    registry.register_bean_definition(
        "settings",
        BeanDefinition::supplier(|_| Ok(Settings::default()))
            .environment_aware()
            .message_source_aware()
            .application_context_aware()
            .build(),
    )?;
    registry.register_alias("settings", "config")?;
    Ok(1)
}

#[test]
fn test_refresh_wires_collaborators_into_beans() {
    let messages = StaticMessageSource::new("en");
    messages.add_message("welcome", "en", "welcome to {0}");
    let publisher = Arc::new(SimpleEventPublisher::new());
    let refreshed = Arc::new(Mutex::new(Vec::new()));
    let sink = refreshed.clone();
    publisher.add_listener(move |event: &ApplicationEvent| {
        if let Some(payload) = event.payload::<ContextRefreshedEvent>() {
            sink.lock().push(payload.context_id.clone());
        }
    });

    let mut builder = ApplicationContextBuilder::new()
        .id("orders-context")
        .application_name("orders")
        .message_source(Arc::new(messages))
        .event_publisher(publisher.clone())
        .add_definitions(settings_definitions);
    builder = builder.environment(Arc::new(
        infrastructure_composition::StandardEnvironment::new().with_properties(
            [("db.url".to_string(), "postgres://orders".to_string())].into(),
        ),
    ));
    let context = builder.build_and_refresh().unwrap();

    assert_eq!(context.status(), ContextStatus::Active);
    assert!(context.startup_date().is_some());
    assert_eq!(context.display_name(), "GenericApplicationContext[orders-context]");

    let settings = context.get_bean_typed::<Settings>("config").unwrap();
    assert_eq!(settings.url.lock().as_deref(), Some("postgres://orders"));
    assert_eq!(settings.greeting.lock().as_deref(), Some("welcome to orders"));
    assert_eq!(settings.context_name.lock().as_deref(), Some("orders"));
    assert_eq!(*refreshed.lock(), vec!["orders-context"]);

    context.close();
    assert_eq!(context.status(), ContextStatus::Closed);
    assert_eq!(publisher.published_count(), 2);
    context.close();
    assert_eq!(publisher.published_count(), 2);
}

#[test]
fn test_second_refresh_is_rejected() {
    let context = ApplicationContextBuilder::new().build_and_refresh().unwrap();
    let err = context.refresh().unwrap_err();
    assert!(matches!(err, InfrastructureError::BootstrapFailed { .. }));
    assert!(context.is_active());
}

#[test]
fn test_failed_refresh_destroys_created_singletons() {
    let destroyed = Arc::new(Mutex::new(Vec::new()));
    let context = ApplicationContextBuilder::new().build().unwrap();
    let log = destroyed.clone();
    context
        .register_bean_definition(
            "healthy",
            BeanDefinition::supplier(|_| Ok(String::from("ok")))
                .destroy_method("close", move |value: &String| {
                    log.lock().push(value.clone());
                    Ok(())
                })
                .build(),
        )
        .unwrap();
    context
        .register_bean_definition(
            "broken",
            BeanDefinition::supplier(|_| -> anyhow::Result<u8> { anyhow::bail!("bad config") }).build(),
        )
        .unwrap();

    let err = context.refresh().unwrap_err();
    match err {
        InfrastructureError::BeanError {
            source: BeanError::BeanCreation { name, .. },
        } => assert_eq!(name, "broken"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(context.status(), ContextStatus::Failed);
    assert_eq!(*destroyed.lock(), vec!["ok"]);
    assert!(!context.bean_factory().contains_singleton("healthy"));
}

#[test]
fn test_child_context_resolves_through_parent() {
    let parent = ApplicationContextBuilder::new()
        .id("parent")
        .add_definitions(settings_definitions)
        .build_and_refresh()
        .unwrap();
    let child = ApplicationContextBuilder::new()
        .id("child")
        .parent(parent.clone())
        .build_and_refresh()
        .unwrap();

    assert!(child.parent().is_some());
    assert!(child.parent_bean_factory().is_some());
    assert!(child.contains_bean("config"));
    assert!(!child.contains_local_bean("config"));
    let from_child = child.get_bean("settings").unwrap();
    let from_parent = parent.get_bean("settings").unwrap();
    assert!(from_child.ptr_eq(&from_parent));

    child
        .register_bean_definition(
            "settings",
            BeanDefinition::supplier(|_| Ok(Settings::default())).build(),
        )
        .unwrap();
    assert!(!child.get_bean("settings").unwrap().ptr_eq(&from_parent));
    assert!(child.get_bean("config").unwrap().ptr_eq(&from_parent));

    child.close();
    assert!(parent.is_active());
    assert!(parent.get_bean("settings").unwrap().ptr_eq(&from_parent));
}

#[test]
fn test_context_built_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("context.toml");
    std::fs::write(
        &path,
        r#"
id = "file-context"
application_name = "billing"
active_profiles = ["test"]

[container]
allow_circular_references = false

[properties]
"billing.currency" = "EUR"
"#,
    )
    .unwrap();

    let context = ApplicationContextBuilder::from_file(&path)
        .unwrap()
        .build_and_refresh()
        .unwrap();

    assert_eq!(ApplicationContext::id(context.as_ref()), "file-context");
    assert_eq!(context.application_name(), "billing");
    assert_eq!(
        context.environment().get_property("billing.currency").as_deref(),
        Some("EUR")
    );
    assert!(context.environment().accepts_profile("test"));
    assert!(!context.bean_factory().config().allow_circular_references);

    let missing = ApplicationContextBuilder::from_file(dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(InfrastructureError::ConfigError { .. })));
}

#[tokio::test]
async fn test_async_listeners_observe_close_events() {
    let publisher = Arc::new(SimpleEventPublisher::new());
    let context = ApplicationContextBuilder::new()
        .event_publisher(publisher.clone())
        .build_and_refresh()
        .unwrap();

    let handle = tokio::spawn({
        let context = context.clone();
        async move {
            context.close();
            context.status()
        }
    });
    assert_eq!(handle.await.unwrap(), ContextStatus::Closed);
    assert_eq!(publisher.published_count(), 2);
    assert!(context.bean_factory().get_bean("anything").is_err());
}
