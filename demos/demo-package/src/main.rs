//! # 订单上下文演示
//!
//! 用一个小型订单系统演示 bean 容器的主要能力：
//! - 构造参数和属性注入
//! - 感知回调、初始化和销毁回调
//! - 后处理器、FactoryBean 和自定义作用域
//! - 上下文刷新、事件发布和关闭

use clap::Parser;
use di_abstractions::{
    ApplicationContext, ApplicationEvent, ApplicationEventPublisher,
    ApplicationEventPublisherAware, BeanArgs, BeanCreationContext, BeanDefinition,
    BeanDefinitionRegistry, BeanFactoryExt, BeanNameAware, BeanPostProcessor, DisposableBean,
    EnvironmentAware, Environment, FactoryBean, InitializingBean, ListableBeanFactory,
    MessageSource,
};
use di_impl::MapScope;
use infrastructure_common::{Bean, BeanResult, BeanType, TypeInfo};
use infrastructure_composition::{
    ApplicationContextBuilder, LoggingConfig, SimpleEventPublisher, StaticMessageSource,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "order-context-demo")]
#[command(about = "bean 容器与应用上下文演示")]
struct Args {
    /// 上下文配置文件（TOML 或 JSON）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    json: bool,

    /// 下单数量
    #[arg(long, default_value_t = 3)]
    orders: u32,
}

// ========== 领域组件 ==========

/// 订单
#[derive(Debug, Clone)]
struct Order {
    id: u64,
    item: String,
    total: f64,
}

/// 订单仓储
trait OrderRepository: Send + Sync {
    fn save(&self, order: Order);
    fn count(&self) -> usize;
}

/// 内存订单仓储
#[derive(Default)]
struct InMemoryOrderRepository {
    orders: Mutex<Vec<Order>>,
}

impl OrderRepository for InMemoryOrderRepository {
    fn save(&self, order: Order) {
        self.orders.lock().push(order);
    }

    fn count(&self) -> usize {
        self.orders.lock().len()
    }
}

impl DisposableBean for InMemoryOrderRepository {
    fn destroy(&self) -> anyhow::Result<()> {
        info!("仓储关闭，共保存 {} 个订单", self.count());
        Ok(())
    }
}

/// 计价策略，税率来自环境属性 `pricing.tax-rate`
#[derive(Default)]
struct PricingPolicy {
    tax_rate: Mutex<f64>,
}

impl PricingPolicy {
    fn price(&self, net: f64) -> f64 {
        let rate = *self.tax_rate.lock();
        (net * (1.0 + rate) * 100.0).round() / 100.0
    }
}

impl EnvironmentAware for PricingPolicy {
    fn set_environment(&self, environment: Arc<dyn Environment>) -> anyhow::Result<()> {
        let rate: f64 = environment.get_property_or("pricing.tax-rate", "0.2").parse()?;
        *self.tax_rate.lock() = rate;
        Ok(())
    }
}

/// 订单号生成器，作为 FactoryBean 每次生产一个新订单号
struct OrderIdGenerator {
    next: AtomicU64,
}

/// 订单号
#[derive(Debug)]
struct OrderId(u64);

impl FactoryBean for OrderIdGenerator {
    fn get_object(&self) -> anyhow::Result<Bean> {
        Ok(Bean::new(OrderId(self.next.fetch_add(1, Ordering::SeqCst))))
    }

    fn object_type(&self) -> Option<BeanType> {
        Some(BeanType::of::<OrderId>())
    }

    fn is_singleton(&self) -> bool {
        false
    }
}

/// 购物车，位于 `session` 作用域
#[derive(Default)]
struct Cart {
    items: Mutex<Vec<(String, f64)>>,
}

/// 下单事件
#[derive(Debug, Clone)]
struct OrderPlaced {
    order_id: u64,
}

/// 订单服务
struct OrderService {
    repository: Arc<dyn OrderRepository>,
    pricing: Mutex<Option<Arc<PricingPolicy>>>,
    publisher: Mutex<Option<Arc<dyn ApplicationEventPublisher>>>,
    name: Mutex<String>,
}

impl OrderService {
    fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self {
            repository,
            pricing: Mutex::new(None),
            publisher: Mutex::new(None),
            name: Mutex::new(String::new()),
        }
    }

    fn place(&self, id: &OrderId, item: &str, net: f64) -> anyhow::Result<Order> {
        let pricing = self
            .pricing
            .lock()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("计价策略尚未注入"))?;
        let order = Order {
            id: id.0,
            item: item.to_string(),
            total: pricing.price(net),
        };
        self.repository.save(order.clone());

        let publisher = self.publisher.lock().clone();
        if let Some(publisher) = publisher {
            publisher.publish_event(ApplicationEvent::new(
                self.name.lock().clone(),
                OrderPlaced { order_id: order.id },
            ));
        }
        Ok(order)
    }
}

impl BeanNameAware for OrderService {
    fn set_bean_name(&self, name: &str) -> anyhow::Result<()> {
        *self.name.lock() = name.to_string();
        Ok(())
    }
}

impl ApplicationEventPublisherAware for OrderService {
    fn set_application_event_publisher(
        &self,
        publisher: Arc<dyn ApplicationEventPublisher>,
    ) -> anyhow::Result<()> {
        *self.publisher.lock() = Some(publisher);
        Ok(())
    }
}

impl InitializingBean for OrderService {
    fn after_properties_set(&self) -> anyhow::Result<()> {
        let ready = self.pricing.lock().is_some();
        anyhow::ensure!(ready, "订单服务缺少计价策略");
        Ok(())
    }
}

/// 记录每个完成初始化的 bean
struct AuditingPostProcessor;

impl BeanPostProcessor for AuditingPostProcessor {
    fn name(&self) -> &str {
        "auditing"
    }

    fn post_process_after_initialization(&self, bean: Bean, bean_name: &str) -> anyhow::Result<Bean> {
        info!("bean '{}' 初始化完成，类型: {}", bean_name, bean.type_info().short_name());
        Ok(bean)
    }
}

// ========== 定义注册 ==========

fn register_definitions(registry: &dyn BeanDefinitionRegistry) -> BeanResult<usize> {
    registry.register_bean_definition(
        "orderRepository",
        BeanDefinition::supplier(|_| Ok(InMemoryOrderRepository::default()))
            .implements(|r: Arc<InMemoryOrderRepository>| r as Arc<dyn OrderRepository>)
            .disposable()
            .build(),
    )?;

    registry.register_bean_definition(
        "pricingPolicy",
        BeanDefinition::supplier(|_| Ok(PricingPolicy::default()))
            .environment_aware()
            .build(),
    )?;

    registry.register_bean_definition(
        "orderService",
        BeanDefinition::constructor(|_: &BeanCreationContext<'_>, args: &BeanArgs| {
            Ok(OrderService::new(args.get::<dyn OrderRepository>(0)?))
        })
        .arg_ref("orderRepository")
        .property_ref("pricing", "pricingPolicy", |service: &OrderService, pricing: Arc<PricingPolicy>| {
            *service.pricing.lock() = Some(pricing);
            Ok(())
        })
        .bean_name_aware()
        .event_publisher_aware()
        .initializing()
        .init_method("warmUp", |service: &OrderService| {
            info!("订单服务预热完成，已有订单: {}", service.repository.count());
            Ok(())
        })
        .destroy_method("shutdown", |_: &OrderService| {
            info!("订单服务停止接单");
            Ok(())
        })
        .build(),
    )?;
    registry.register_alias("orderService", "orders")?;

    registry.register_bean_definition(
        "orderId",
        BeanDefinition::factory_bean(|_| {
            Ok(OrderIdGenerator {
                next: AtomicU64::new(1000),
            })
        })
        .produces(BeanType::of::<OrderId>())
        .build(),
    )?;

    registry.register_bean_definition(
        "cart",
        BeanDefinition::supplier(|_| Ok(Cart::default()))
            .custom_scope("session")
            .destroy_method("abandon", |cart: &Cart| {
                let left = cart.items.lock().len();
                if left > 0 {
                    warn!("会话结束时购物车里还有 {} 件商品", left);
                }
                Ok(())
            })
            .build(),
    )?;
    Ok(5)
}

// ========== 演示流程 ==========

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = LoggingConfig {
        level: args.log_level.parse()?,
        json_format: args.json,
        ..LoggingConfig::default()
    };

    let messages = StaticMessageSource::new("en");
    messages.add_message("order.placed", "en", "Order {0}: {1} for {2}");
    messages.add_message("order.placed", "zh", "订单 {0}：{1}，金额 {2}");

    let publisher = Arc::new(SimpleEventPublisher::new());
    publisher.add_listener(|event: &ApplicationEvent| {
        if let Some(placed) = event.payload::<OrderPlaced>() {
            info!("收到事件，来源 '{}'，订单 {}", event.source(), placed.order_id);
        }
    });

    let session = Arc::new(MapScope::new("session"));
    let builder = match &args.config {
        Some(path) => ApplicationContextBuilder::from_file(path)?,
        None => ApplicationContextBuilder::new()
            .id("order-demo")
            .application_name("order-context-demo"),
    };
    let context = builder
        .with_logging(logging)
        .message_source(Arc::new(messages))
        .event_publisher(publisher.clone())
        .add_bean_post_processor(Arc::new(AuditingPostProcessor))
        .register_scope("session", session.clone())
        .add_definitions(register_definitions)
        .build_and_refresh()?;

    info!(
        "上下文 '{}' 已就绪，定义 {} 个",
        context.display_name(),
        context.bean_definition_count()
    );

    let service = context.get_bean_typed::<OrderService>("orders")?;
    let cart = context.get_bean_typed::<Cart>("cart")?;
    for index in 0..args.orders {
        let item = format!("item-{}", index + 1);
        let net = 10.0 * f64::from(index + 1);
        cart.items.lock().push((item, net));
    }

    let checkout: Vec<(String, f64)> = cart.items.lock().drain(..).collect();
    for (item, net) in checkout {
        let id = context.get_bean_typed::<OrderId>("orderId")?;
        let order = service.place(&id, &item, net)?;
        let text = context
            .message_source()
            .get_message_or_default(
                "order.placed",
                &[order.id.to_string(), order.item.clone(), format!("{:.2}", order.total)],
                "order placed",
                "zh",
            );
        info!("{}", text);
    }

    let repository = context.get_bean_of::<dyn OrderRepository>()?;
    info!("仓储中共有 {} 个订单", repository.count());
    info!(
        "可作为 OrderRepository 使用的 bean: {:?}",
        context.bean_names_for_type(&TypeInfo::of::<dyn OrderRepository>(), true, false)
    );

    session.close();
    info!("已发布事件 {} 个，统计: {:?}", publisher.published_count(), context.stats());

    context.close();
    info!("演示结束");
    Ok(())
}
