//! 按名称和按类型解析的集成测试

use di_abstractions::{
    BeanCreationContext, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt,
    ConfigurableBeanFactory, ConstructorArg, HierarchicalBeanFactory, ListableBeanFactory, TypeMatch,
};
use di_impl::DefaultBeanFactory;
use infrastructure_common::{BeanError, BeanErrorKind, LifecycleStep, TypeInfo};
use std::sync::Arc;

trait Repository: Send + Sync {
    fn table(&self) -> &str;
}

#[derive(Debug)]
struct OrderRepository;

impl Repository for OrderRepository {
    fn table(&self) -> &str {
        "orders"
    }
}

struct OrderService {
    repository: Arc<dyn Repository>,
}

fn repository_definition() -> BeanDefinition {
    BeanDefinition::supplier(|_| Ok(OrderRepository))
        .implements(|r: Arc<OrderRepository>| r as Arc<dyn Repository>)
        .build()
}

fn service_definition() -> BeanDefinition {
    BeanDefinition::supplier(|ctx: &BeanCreationContext<'_>| {
        Ok(OrderService {
            repository: ctx.get_bean_typed::<dyn Repository>("repository")?,
        })
    })
    .build()
}

#[test]
fn test_singleton_scenario() {
    let factory = DefaultBeanFactory::new();
    factory.register_bean_definition("x", repository_definition()).unwrap();

    let first = factory.get_bean("x").unwrap();
    let second = factory.get_bean("x").unwrap();
    assert!(first.ptr_eq(&second));
    assert!(factory.is_singleton("x").unwrap());
    assert!(!factory.is_prototype("x").unwrap());
}

#[test]
fn test_prototype_scenario() {
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition(
            "y",
            BeanDefinition::supplier(|_| Ok(OrderRepository)).prototype().build(),
        )
        .unwrap();

    let first = factory.get_bean_typed::<OrderRepository>("y").unwrap();
    let second = factory.get_bean_typed::<OrderRepository>("y").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(factory.is_prototype("y").unwrap());
    assert!(!factory.is_singleton("y").unwrap());
    assert!(!factory.contains_singleton("y"));
}

#[test]
fn test_wrong_type_is_not_not_found() {
    let factory = DefaultBeanFactory::new();
    factory.register_bean_definition("x", repository_definition()).unwrap();

    let err = factory.get_bean_typed::<String>("x").err().unwrap();
    assert_eq!(err.kind(), BeanErrorKind::WrongType);
    match err {
        BeanError::BeanNotOfRequiredType {
            name,
            required_type,
            actual_type,
        } => {
            assert_eq!(name, "x");
            assert_eq!(required_type, TypeInfo::of::<String>().name);
            assert_eq!(actual_type, TypeInfo::of::<OrderRepository>().name);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(factory.get_bean_typed::<dyn Repository>("x").is_ok());
    let missing = factory.get_bean("nope").unwrap_err();
    assert!(missing.is_not_found());
}

#[test]
fn test_explicit_args_on_singleton_are_rejected() {
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition(
            "label",
            BeanDefinition::constructor(|_: &BeanCreationContext<'_>, args: &di_abstractions::BeanArgs| {
                Ok(format!("#{}", args.get::<u32>(0)?))
            })
            .arg_value(1_u32)
            .build(),
        )
        .unwrap();

    let err = factory
        .get_bean_with_args("label", vec![ConstructorArg::value(2_u32)])
        .unwrap_err();
    assert_eq!(err.kind(), BeanErrorKind::InvalidScopeUsage);
    assert_eq!(*factory.get_bean_typed::<String>("label").unwrap(), "#1");
}

#[test]
fn test_aliases_resolve_like_the_canonical_name() {
    let factory = DefaultBeanFactory::new();
    factory.register_bean_definition("repository", repository_definition()).unwrap();
    factory.register_alias("repository", "repo").unwrap();
    factory.register_alias("repository", "orders").unwrap();

    let aliases = factory.get_aliases("repository");
    assert!(aliases.contains(&"repo".to_string()));
    assert!(aliases.contains(&"orders".to_string()));
    assert_eq!(factory.get_aliases("repo"), vec!["repository", "orders"]);

    let canonical = factory.get_bean("repository").unwrap();
    for alias in ["repo", "orders"] {
        assert!(factory.get_bean(alias).unwrap().ptr_eq(&canonical));
        assert!(factory.is_singleton(alias).unwrap());
        assert!(factory.contains_bean(alias));
        assert!(factory.contains_singleton(alias));
        assert!(factory.is_bean_name_in_use(alias));
    }

    factory.destroy_singleton("repo");
    assert!(!factory.contains_singleton("repository"));
    assert!(!factory.contains_singleton("orders"));

    factory.remove_alias("orders").unwrap();
    assert!(!factory.contains_bean("orders"));
    assert!(factory.remove_alias("orders").is_err());

    factory.register_alias("ghost", "dangling").unwrap();
    assert!(factory.get_bean("dangling").unwrap_err().is_not_found());
}

#[test]
fn test_alias_and_definition_names_conflict() {
    let factory = DefaultBeanFactory::new();
    factory.register_bean_definition("repository", repository_definition()).unwrap();
    factory.register_alias("repository", "repo").unwrap();

    let err = factory
        .register_bean_definition("repo", repository_definition())
        .unwrap_err();
    assert_eq!(err.kind(), BeanErrorKind::StoreConflict);

    factory.register_bean_definition("service", service_definition()).unwrap();
    let err = factory.register_alias("repository", "service").unwrap_err();
    assert_eq!(err.kind(), BeanErrorKind::StoreConflict);
}

#[test]
fn test_metadata_queries_are_idempotent_and_lazy() {
    let factory = DefaultBeanFactory::new();
    factory.register_bean_definition("repository", repository_definition()).unwrap();

    assert!(factory.contains_local_bean("repository"));
    assert!(!factory.contains_singleton("repository"));

    for _ in 0..3 {
        assert!(factory.contains_bean("repository"));
        assert!(factory.is_singleton("repository").unwrap());
        let bean_type = factory.get_type("repository", false).unwrap().unwrap();
        assert!(bean_type.is_assignable_to(&TypeInfo::of::<dyn Repository>()));
        assert_eq!(
            factory.is_type_match_of::<dyn Repository>("repository").unwrap(),
            TypeMatch::Matches
        );
        assert_eq!(
            factory.is_type_match_of::<String>("repository").unwrap(),
            TypeMatch::DoesNotMatch
        );
    }
    assert!(!factory.contains_singleton("repository"));
    assert_eq!(factory.stats().created_instances, 0);

    assert!(factory.is_singleton("missing").unwrap_err().is_not_found());
    assert!(factory.get_type("missing", false).unwrap_err().is_not_found());
}

#[test]
fn test_by_type_resolution() {
    let factory = DefaultBeanFactory::new();
    factory.register_bean_definition("repository", repository_definition()).unwrap();
    factory.register_bean_definition("service", service_definition()).unwrap();

    let service = factory.get_bean_of::<OrderService>().unwrap();
    assert_eq!(service.repository.table(), "orders");
    assert_eq!(
        factory.bean_names_for_type(&TypeInfo::of::<dyn Repository>(), true, false),
        vec!["repository"]
    );

    let err = factory.get_bean_of::<String>().err().unwrap();
    assert!(matches!(err, BeanError::NoSuchBeanOfType { .. }));

    factory
        .register_bean_definition("archive", repository_definition())
        .unwrap();
    let err = factory.get_bean_of::<dyn Repository>().err().unwrap();
    match err {
        BeanError::NoUniqueBean { candidates, .. } => {
            assert_eq!(candidates, vec!["repository", "archive"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let provider = factory.get_bean_provider::<dyn Repository>();
    assert!(provider.get_if_unique().unwrap().is_none());
    assert!(provider.get_object().is_err());
    let beans = factory.beans_of_type(&TypeInfo::of::<dyn Repository>()).unwrap();
    assert_eq!(beans.len(), 2);
}

#[test]
fn test_abstract_definitions_are_not_instantiated() {
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition(
            "template",
            BeanDefinition::supplier(|_| Ok(OrderRepository))
                .abstract_definition()
                .build(),
        )
        .unwrap();

    assert!(matches!(
        factory.get_bean("template").unwrap_err(),
        BeanError::BeanIsAbstract { .. }
    ));
    assert!(factory
        .bean_names_for_type(&TypeInfo::of::<OrderRepository>(), true, true)
        .is_empty());
    factory.pre_instantiate_singletons().unwrap();
}

#[test]
fn test_creation_failure_reports_step_and_rolls_back() {
    let factory = DefaultBeanFactory::new();
    factory.register_bean_definition("service", service_definition()).unwrap();

    let err = factory.get_bean("service").unwrap_err();
    match &err {
        BeanError::BeanCreation { name, step, .. } => {
            assert_eq!(name, "service");
            assert_eq!(*step, LifecycleStep::Instantiation);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.root_cause().is_not_found());
    assert!(!factory.contains_singleton("service"));
    assert!(factory.stats().resolution_errors >= 1);

    factory.register_bean_definition("repository", repository_definition()).unwrap();
    assert!(factory.get_bean_typed::<OrderService>("service").is_ok());
}

#[test]
fn test_external_singletons_participate_in_lookup() {
    let factory = DefaultBeanFactory::new();
    factory
        .register_singleton("clock", infrastructure_common::Bean::new(42_u64))
        .unwrap();

    assert_eq!(*factory.get_bean_typed::<u64>("clock").unwrap(), 42);
    assert_eq!(*factory.get_bean_of::<u64>().unwrap(), 42);
    assert!(factory.contains_local_bean("clock"));
    assert!(!factory.contains_bean_definition("clock"));
    let err = factory
        .register_singleton("clock", infrastructure_common::Bean::new(1_u64))
        .unwrap_err();
    assert_eq!(err.kind(), BeanErrorKind::StoreConflict);
}

#[test]
fn test_removing_a_definition_destroys_its_singleton() {
    let factory = DefaultBeanFactory::new();
    factory.register_bean_definition("repository", repository_definition()).unwrap();
    factory.get_bean("repository").unwrap();
    assert!(factory.contains_singleton("repository"));

    factory.remove_bean_definition("repository").unwrap();
    assert!(!factory.contains_singleton("repository"));
    assert!(!factory.contains_bean("repository"));
    assert!(factory.remove_bean_definition("repository").unwrap_err().is_not_found());
    assert!(factory.parent_bean_factory().is_none());
}
