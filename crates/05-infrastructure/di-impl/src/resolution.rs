//! 解析链跟踪
//!
//! 每个线程维护一条正在创建的 bean 链，键为 (工厂 id, 名称)。
//! 同一工厂中重复进入同一名称说明存在无法通过提前引用解决的循环依赖。

use infrastructure_common::{BeanError, BeanResult};
use std::cell::RefCell;
use std::marker::PhantomData;
use uuid::Uuid;

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<(Uuid, String)>> = RefCell::new(Vec::new());
}

/// 解析链上的一个节点，离开作用域时自动出栈
///
/// 绑定在创建它的线程上，不能跨线程移动。
pub struct ResolutionGuard {
    _thread_bound: PhantomData<*const ()>,
}

impl ResolutionGuard {
    /// 进入解析链
    pub fn enter(factory_id: Uuid, name: &str, max_depth: usize) -> BeanResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|(id, n)| *id == factory_id && n == name) {
                return Err(BeanError::CircularReference {
                    name: name.to_string(),
                    chain: format_chain(&stack, name),
                });
            }
            if stack.len() >= max_depth {
                return Err(BeanError::CircularReference {
                    name: name.to_string(),
                    chain: format!(
                        "超过最大解析深度 {}: {}",
                        max_depth,
                        format_chain(&stack, name)
                    ),
                });
            }
            stack.push((factory_id, name.to_string()));
            Ok(Self {
                _thread_bound: PhantomData,
            })
        })
    }

    /// 当前线程的解析深度
    #[cfg(test)]
    pub fn depth() -> usize {
        RESOLUTION_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn format_chain(stack: &[(Uuid, String)], name: &str) -> String {
    stack
        .iter()
        .map(|(_, n)| n.as_str())
        .chain(std::iter::once(name))
        .collect::<Vec<_>>()
        .join(" -> ")
}
