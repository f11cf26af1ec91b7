//! 多线程并发解析的集成测试

use di_abstractions::{BeanDefinition, BeanDefinitionRegistry, BeanFactoryExt, ConfigurableBeanFactory};
use di_impl::DefaultBeanFactory;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const THREADS: usize = 16;

struct Connection {
    serial: usize,
}

fn slow_definition(created: &Arc<AtomicUsize>) -> di_abstractions::BeanDefinitionBuilder<Connection> {
    let created = created.clone();
    BeanDefinition::supplier(move |_| {
        let serial = created.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        Ok(Connection { serial })
    })
}

async fn resolve_concurrently(factory: Arc<DefaultBeanFactory>, name: &'static str) -> Vec<Arc<Connection>> {
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let factory = factory.clone();
            let barrier = barrier.clone();
            tokio::task::spawn_blocking(move || {
                barrier.wait();
                factory.get_bean_typed::<Connection>(name)
            })
        })
        .collect();

    let mut connections = Vec::with_capacity(THREADS);
    for handle in handles {
        connections.push(handle.await.unwrap().unwrap());
    }
    connections
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_singleton_is_constructed_once_under_contention() {
    let created = Arc::new(AtomicUsize::new(0));
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition("connection", slow_definition(&created).build())
        .unwrap();

    let connections = resolve_concurrently(factory.clone(), "connection").await;

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(connections.iter().all(|c| Arc::ptr_eq(c, &connections[0])));
    assert_eq!(connections[0].serial, 0);
    assert_eq!(factory.stats().created_instances, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_prototypes_are_constructed_per_request_under_contention() {
    let created = Arc::new(AtomicUsize::new(0));
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition("connection", slow_definition(&created).prototype().build())
        .unwrap();

    let connections = resolve_concurrently(factory.clone(), "connection").await;

    assert_eq!(created.load(Ordering::SeqCst), THREADS);
    let mut serials: Vec<usize> = connections.iter().map(|c| c.serial).collect();
    serials.sort_unstable();
    assert_eq!(serials, (0..THREADS).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dependent_singletons_are_shared_across_threads() {
    struct Pool {
        connection: Arc<Connection>,
    }

    let created = Arc::new(AtomicUsize::new(0));
    let factory = DefaultBeanFactory::new();
    factory
        .register_bean_definition("connection", slow_definition(&created).build())
        .unwrap();
    factory
        .register_bean_definition(
            "pool",
            BeanDefinition::supplier(|ctx: &di_abstractions::BeanCreationContext<'_>| {
                Ok(Pool {
                    connection: ctx.get_bean_typed::<Connection>("connection")?,
                })
            })
            .build(),
        )
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let factory = factory.clone();
            let barrier = barrier.clone();
            tokio::task::spawn_blocking(move || {
                barrier.wait();
                if i % 2 == 0 {
                    factory
                        .get_bean_typed::<Pool>("pool")
                        .map(|pool| pool.connection.clone())
                } else {
                    factory.get_bean_of::<Connection>()
                }
            })
        })
        .collect();

    let mut connections = Vec::new();
    for handle in handles {
        connections.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(connections.iter().all(|c| Arc::ptr_eq(c, &connections[0])));
    assert_eq!(factory.dependent_beans("connection"), vec!["pool"]);
}
