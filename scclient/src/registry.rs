// scclient/src/registry.rs

//! 关联 ID 登记表。
//!
//! 为出站请求分配严格递增的关联 ID (`cid`)，并保存 "ID -> (名称, 响应回调)" 的未决映射。
//! 响应帧到达时按 `rid` 取出回调，每个回调至多被取出一次。
//! 计数器与映射由同一把互斥锁保护：调用方线程上的 `emit` / `publish`
//! 与后台接收循环上的握手、响应分发共用这一份状态。

use crate::error::ClientError;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 响应回调：`(名称, 错误, 数据)`。
///
/// 名称是发出请求时的事件名或频道名，便于同一个回调函数区分来源。
/// 回调在后台接收循环上同步执行，不得阻塞。
pub type ResponseHandler = Box<dyn FnOnce(&str, Option<Value>, Value) + Send + 'static>;

/// 一条未决的请求记录。
pub struct PendingCallback {
    pub name: String,
    handler: ResponseHandler,
}

impl PendingCallback {
    /// 消费这条记录并调用回调。
    pub fn invoke(self, error: Option<Value>, data: Value) {
        (self.handler)(&self.name, error, data)
    }
}

impl std::fmt::Debug for PendingCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCallback").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryState {
    last_id: u64,
    pending: HashMap<u64, PendingCallback>,
}

/// 关联 ID 登记表，见模块文档。
#[derive(Default)]
pub struct CallbackRegistry {
    state: Mutex<RegistryState>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 分配一个新的关联 ID。重置后的第一个 ID 为 1。
    pub fn next_id(&self) -> u64 {
        let mut state = self.state();
        state.last_id += 1;
        state.last_id
    }

    /// 为已分配的 ID 登记回调。
    pub fn register(&self, id: u64, name: impl Into<String>, handler: ResponseHandler) {
        let name = name.into();
        debug!("[关联登记] 登记未决回调: cid={}, 名称='{}'", id, name);
        self.state().pending.insert(id, PendingCallback { name, handler });
    }

    /// 在一次加锁内分配 ID 并登记回调。
    pub fn allocate(&self, name: impl Into<String>, handler: ResponseHandler) -> u64 {
        let name = name.into();
        let mut state = self.state();
        state.last_id += 1;
        let id = state.last_id;
        debug!("[关联登记] 分配并登记未决回调: cid={}, 名称='{}'", id, name);
        state.pending.insert(id, PendingCallback { name, handler });
        id
    }

    /// 取出 `id` 对应的未决回调。未知 ID 返回 `ClientError::CallbackNotFound`。
    pub fn resolve(&self, id: u64) -> Result<PendingCallback, ClientError> {
        self.state().pending.remove(&id).ok_or(ClientError::CallbackNotFound(id))
    }

    /// 撤销一条未决记录 (例如请求发送失败时)。
    pub fn cancel(&self, id: u64) -> bool {
        self.state().pending.remove(&id).is_some()
    }

    /// 为新连接清空登记表：ID 从 1 重新开始，旧连接上的未决回调全部作废。
    ///
    /// 返回被丢弃的未决回调数量。
    pub fn reset(&self) -> usize {
        let mut state = self.state();
        let orphaned = state.pending.len();
        state.pending.clear();
        state.last_id = 0;
        orphaned
    }

    /// 当前未决回调数量。
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::mpsc;

    fn noop() -> ResponseHandler {
        Box::new(|_: &str, _, _| {})
    }

    #[test]
    fn test_ids_strictly_increase_from_one() {
        let registry = CallbackRegistry::new();
        assert_eq!(registry.next_id(), 1);
        assert_eq!(registry.allocate("a", noop()), 2);
        assert_eq!(registry.next_id(), 3);
        assert_eq!(registry.allocate("b", noop()), 4);
        assert_eq!(registry.pending_count(), 2);
    }

    #[test]
    fn test_resolve_consumes_exactly_once() {
        let registry = CallbackRegistry::new();
        let (tx, rx) = mpsc::channel();
        let id = registry.allocate(
            "room1",
            Box::new(move |name: &str, error, data| {
                tx.send((name.to_string(), error, data)).expect("测试通道不应关闭");
            }),
        );

        let pending = registry.resolve(id).expect("刚登记的 ID 应能取出");
        assert_eq!(pending.name, "room1");
        pending.invoke(Some(json!("boom")), json!({"x": 1}));
        assert_eq!(
            rx.recv().unwrap(),
            ("room1".to_string(), Some(json!("boom")), json!({"x": 1}))
        );

        assert!(matches!(registry.resolve(id), Err(ClientError::CallbackNotFound(i)) if i == id));
    }

    #[test]
    fn test_register_with_explicit_id() {
        let registry = CallbackRegistry::new();
        let id = registry.next_id();
        registry.register(id, "my_event", noop());
        assert_eq!(registry.resolve(id).map(|p| p.name).ok(), Some("my_event".to_string()));
    }

    #[test]
    fn test_reset_restarts_ids_and_orphans_pending() {
        let registry = CallbackRegistry::new();
        registry.allocate("a", noop());
        registry.allocate("b", noop());
        let stale = registry.allocate("c", noop());

        assert_eq!(registry.reset(), 3);
        assert_eq!(registry.pending_count(), 0);
        assert!(matches!(registry.resolve(stale), Err(ClientError::CallbackNotFound(_))));
        assert_eq!(registry.next_id(), 1, "重置后 ID 应从 1 重新开始");
    }

    #[test]
    fn test_cancel_removes_entry() {
        let registry = CallbackRegistry::new();
        let id = registry.allocate("a", noop());
        assert!(registry.cancel(id));
        assert!(!registry.cancel(id));
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_concurrent_allocation_yields_unique_ids() {
        let registry = Arc::new(CallbackRegistry::new());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || (0..100).map(|_| registry.allocate("e", noop())).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for id in worker.join().expect("工作线程不应 panic") {
                assert!(seen.insert(id), "关联 ID {} 被重复分配", id);
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(registry.pending_count(), 800);
        assert_eq!(seen.iter().max().copied(), Some(800));
    }
}
