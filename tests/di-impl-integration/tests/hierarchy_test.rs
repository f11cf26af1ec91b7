//! 父子工厂委托的集成测试

use di_abstractions::{
    BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
    ContainerConfig, HierarchicalBeanFactory, TypeMatch,
};
use di_impl::DefaultBeanFactory;
use infrastructure_common::{BeanError, BeanErrorKind, TypeInfo};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn text(value: &'static str) -> BeanDefinition {
    BeanDefinition::supplier(move |_| Ok(value.to_string())).build()
}

fn family() -> (Arc<DefaultBeanFactory>, Arc<DefaultBeanFactory>) {
    let parent = DefaultBeanFactory::new();
    parent.register_bean_definition("shared", text("from-parent")).unwrap();
    parent.register_bean_definition("overridden", text("parent-version")).unwrap();
    parent.register_alias("shared", "common").unwrap();

    let parent_dyn: Arc<dyn BeanFactory> = parent.clone();
    let child = DefaultBeanFactory::with_parent(ContainerConfig::default(), &parent_dyn);
    child.register_bean_definition("overridden", text("child-version")).unwrap();
    (parent, child)
}

#[test]
fn test_child_delegates_unknown_names_to_parent() {
    let (parent, child) = family();

    assert!(child.contains_bean("shared"));
    assert!(!child.contains_local_bean("shared"));
    assert!(child.contains_bean("common"));

    let from_child = child.get_bean("shared").unwrap();
    let from_parent = parent.get_bean("shared").unwrap();
    assert!(from_child.ptr_eq(&from_parent));
    assert!(child.is_singleton("shared").unwrap());
    assert_eq!(child.is_type_match_of::<String>("shared").unwrap(), TypeMatch::Matches);
    assert_eq!(child.get_aliases("shared"), vec!["common"]);
    assert!(!child.contains_singleton("shared"));
}

#[test]
fn test_local_definition_shadows_parent() {
    let (parent, child) = family();

    assert_eq!(*child.get_bean_typed::<String>("overridden").unwrap(), "child-version");
    assert_eq!(*parent.get_bean_typed::<String>("overridden").unwrap(), "parent-version");
    assert!(child.contains_local_bean("overridden"));
}

#[test]
fn test_parent_never_sees_child_beans() {
    let (parent, child) = family();
    child.register_bean_definition("child-only", text("local")).unwrap();

    assert!(child.contains_bean("child-only"));
    assert!(!parent.contains_bean("child-only"));
    assert_eq!(
        parent.get_bean("child-only").unwrap_err().kind(),
        BeanErrorKind::NotFound
    );
    assert!(child.get_bean("nowhere").unwrap_err().is_not_found());
}

#[test]
fn test_by_type_lookup_falls_back_to_parent() {
    let parent = DefaultBeanFactory::new();
    parent
        .register_bean_definition("port", BeanDefinition::supplier(|_| Ok(8080_u16)).build())
        .unwrap();
    let parent_dyn: Arc<dyn BeanFactory> = parent.clone();
    let child = DefaultBeanFactory::with_parent(ContainerConfig::default(), &parent_dyn);

    assert_eq!(*child.get_bean_of::<u16>().unwrap(), 8080);
    assert!(child.get_bean_of::<u32>().unwrap_err().is_not_found());
}

#[test]
fn test_parent_can_be_set_once_before_first_resolution() {
    let parent = DefaultBeanFactory::new();
    parent.register_bean_definition("shared", text("from-parent")).unwrap();
    let other = DefaultBeanFactory::new();
    let child = DefaultBeanFactory::new();

    let parent_dyn: Arc<dyn BeanFactory> = parent.clone();
    let other_dyn: Arc<dyn BeanFactory> = other.clone();
    child.set_parent_bean_factory(Arc::downgrade(&parent_dyn)).unwrap();
    child.set_parent_bean_factory(Arc::downgrade(&parent_dyn)).unwrap();
    assert_eq!(
        child
            .set_parent_bean_factory(Arc::downgrade(&other_dyn))
            .unwrap_err()
            .kind(),
        BeanErrorKind::IllegalUsage
    );

    let child_dyn: Arc<dyn BeanFactory> = child.clone();
    assert!(child.set_parent_bean_factory(Arc::downgrade(&child_dyn)).is_err());
    assert!(child.parent_bean_factory().is_some());
    assert_eq!(*child.get_bean_typed::<String>("shared").unwrap(), "from-parent");
}

#[test]
fn test_indirect_parent_cycle_is_rejected() {
    let first = DefaultBeanFactory::new();
    let second = DefaultBeanFactory::new();
    let third = DefaultBeanFactory::new();
    let first_dyn: Arc<dyn BeanFactory> = first.clone();
    let second_dyn: Arc<dyn BeanFactory> = second.clone();
    let third_dyn: Arc<dyn BeanFactory> = third.clone();

    first.set_parent_bean_factory(Arc::downgrade(&second_dyn)).unwrap();
    let err = second
        .set_parent_bean_factory(Arc::downgrade(&first_dyn))
        .unwrap_err();
    assert_eq!(err.kind(), BeanErrorKind::IllegalUsage);
    assert!(second.parent_bean_factory().is_none());

    second.set_parent_bean_factory(Arc::downgrade(&third_dyn)).unwrap();
    let err = third
        .set_parent_bean_factory(Arc::downgrade(&first_dyn))
        .unwrap_err();
    assert_eq!(err.kind(), BeanErrorKind::IllegalUsage);

    assert!(!first.contains_bean("missing"));
    assert!(first.get_bean("missing").unwrap_err().is_not_found());
    assert!(first.is_singleton("missing").unwrap_err().is_not_found());
}

/// 父工厂中的 `x` 是一个计数的原型，用来确认子工厂有没有询问父工厂
fn counting_parent() -> (Arc<DefaultBeanFactory>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let parent = DefaultBeanFactory::new();
    parent
        .register_bean_definition(
            "x",
            BeanDefinition::supplier(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("parent-x".to_string())
            })
            .prototype()
            .build(),
        )
        .unwrap();
    (parent, calls)
}

#[test]
fn test_local_failures_are_not_delegated() {
    let (parent, calls) = counting_parent();
    let parent_dyn: Arc<dyn BeanFactory> = parent.clone();

    let abstract_child = DefaultBeanFactory::with_parent(ContainerConfig::default(), &parent_dyn);
    abstract_child
        .register_bean_definition(
            "x",
            BeanDefinition::supplier(|_| Ok("template".to_string()))
                .abstract_definition()
                .build(),
        )
        .unwrap();
    let err = abstract_child.get_bean("x").unwrap_err();
    assert!(matches!(err, BeanError::BeanIsAbstract { .. }));

    let typed_child = DefaultBeanFactory::with_parent(ContainerConfig::default(), &parent_dyn);
    typed_child
        .register_bean_definition("x", BeanDefinition::supplier(|_| Ok(7_u16)).build())
        .unwrap();
    let err = typed_child
        .get_bean_of_type("x", &TypeInfo::of::<String>())
        .unwrap_err();
    assert_eq!(err.kind(), BeanErrorKind::WrongType);
    assert!(!err.is_not_found());

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(*parent.get_bean_typed::<String>("x").unwrap(), "parent-x");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_metadata_queries_delegate_to_parent() {
    let (parent, calls) = counting_parent();
    let parent_dyn: Arc<dyn BeanFactory> = parent.clone();
    let child = DefaultBeanFactory::with_parent(ContainerConfig::default(), &parent_dyn);

    assert!(child.is_prototype("x").unwrap());
    assert!(!child.is_singleton("x").unwrap());
    let bean_type = child.get_type("x", false).unwrap().unwrap();
    assert!(bean_type.is_assignable_to(&TypeInfo::of::<String>()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert!(child.is_prototype("missing").unwrap_err().is_not_found());
    assert!(child.get_type("missing", false).unwrap_err().is_not_found());
}
