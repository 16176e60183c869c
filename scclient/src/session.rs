// scclient/src/session.rs

//! 会话状态机。
//!
//! 会话持有服务端分配的会话标识、连接状态与重连策略，并负责：
//! - 响应传输层的打开 / 消息 / 关闭回调 (`SessionEvents`)；
//! - 在后台任务中驱动连接尝试与固定间隔的重连循环 (`run_connection_loop`)；
//! - 向应用层按注册顺序同步派发连接 / 断开通知。
//!
//! 状态流转：`Disconnected` -> `Connecting` -> `Connected` -> `Disconnected`，
//! 若启用了自动重连，则在等待 `reconnect_delay` 后再次进入 `Connecting`。

use crate::client::{ClientInner, SocketClient};
use crate::dispatcher;
use crate::handshake::{self, HandshakeInfo};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rust_websocket_utils::client::transport::TransportHandler;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

/// 会话生命周期状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// 初始状态，或连接关闭之后。
    #[default]
    Disconnected,
    /// 传输层连接尝试进行中，或连接已打开但握手尚未完成。
    Connecting,
    /// 握手已完成。
    Connected,
}

/// 连接 / 断开通知的监听器，参数是客户端本身。
pub type SessionListener = Arc<dyn Fn(&SocketClient) + Send + Sync + 'static>;

/// 需要整体一致读写的会话字段。
#[derive(Debug, Default)]
struct SessionStatus {
    state: SessionState,
    identity: Option<String>,
    connected_at: Option<DateTime<Utc>>,
    handshake: Option<HandshakeInfo>,
}

pub(crate) struct Session {
    status: RwLock<SessionStatus>,
    reconnect_enabled: AtomicBool,
    reconnect_delay: Duration,
    /// 调用过 `disconnect` 且之后没有再次 `connect`。
    disconnect_requested: AtomicBool,
    /// 当前这次传输运行是否已经触发过 `on_open`。
    transport_open: AtomicBool,
    /// 后台连接循环是否在运行，保证同一时刻只有一个循环。
    loop_running: AtomicBool,
    /// 循环仍在运行时 (通常正在处理 `disconnect` 引起的关闭) 又调用了 `connect`。
    restart_requested: AtomicBool,
    connect_listeners: RwLock<Vec<SessionListener>>,
    disconnect_listeners: RwLock<Vec<SessionListener>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub(crate) fn new(reconnect_enabled: bool, reconnect_delay: Duration) -> Self {
        Self {
            status: RwLock::new(SessionStatus::default()),
            reconnect_enabled: AtomicBool::new(reconnect_enabled),
            reconnect_delay,
            disconnect_requested: AtomicBool::new(false),
            transport_open: AtomicBool::new(false),
            loop_running: AtomicBool::new(false),
            restart_requested: AtomicBool::new(false),
            connect_listeners: RwLock::new(Vec::new()),
            disconnect_listeners: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        read(&self.status).state
    }

    pub(crate) fn identity(&self) -> Option<String> {
        read(&self.status).identity.clone()
    }

    pub(crate) fn connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    pub(crate) fn connected_at(&self) -> Option<DateTime<Utc>> {
        read(&self.status).connected_at
    }

    pub(crate) fn handshake_info(&self) -> Option<HandshakeInfo> {
        read(&self.status).handshake.clone()
    }

    pub(crate) fn reconnect_enabled(&self) -> bool {
        self.reconnect_enabled.load(Ordering::SeqCst)
    }

    /// 重新启用自动重连同时撤销之前的断开请求，之后打开的连接会正常握手。
    pub(crate) fn set_reconnect_enabled(&self, enabled: bool) {
        self.reconnect_enabled.store(enabled, Ordering::SeqCst);
        if enabled {
            self.disconnect_requested.store(false, Ordering::SeqCst);
        }
    }

    pub(crate) fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// 关闭自动重连并记录断开请求。
    pub(crate) fn request_disconnect(&self) {
        self.reconnect_enabled.store(false, Ordering::SeqCst);
        self.disconnect_requested.store(true, Ordering::SeqCst);
    }

    pub(crate) fn disconnect_requested(&self) -> bool {
        self.disconnect_requested.load(Ordering::SeqCst)
    }

    /// 尝试占用后台连接循环；已有循环在运行时返回 `false`。
    pub(crate) fn try_begin_loop(&self) -> bool {
        let acquired = self
            .loop_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if acquired {
            self.disconnect_requested.store(false, Ordering::SeqCst);
            self.restart_requested.store(false, Ordering::SeqCst);
        }
        acquired
    }

    /// 循环已在运行时的 `connect`：若之前请求过断开，则撤销断开请求并要求循环继续连接。
    /// 返回是否确实登记了重新连接请求。
    pub(crate) fn request_restart(&self) -> bool {
        if self.disconnect_requested.swap(false, Ordering::SeqCst) {
            self.restart_requested.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub(crate) fn take_restart_request(&self) -> bool {
        self.restart_requested.swap(false, Ordering::SeqCst)
    }

    /// 释放后台连接循环。
    ///
    /// 释放前后到达的 `connect` / `set_reconnect_enabled(true)` 不能丢失：
    /// 若释放后仍需继续连接且成功重新占用循环，返回 `true`，调用方应继续循环。
    pub(crate) fn release_loop(&self) -> bool {
        self.loop_running.store(false, Ordering::SeqCst);
        let wanted = self.take_restart_request() || self.reconnect_enabled();
        wanted && self.try_begin_loop()
    }

    pub(crate) fn begin_attempt(&self) {
        write(&self.status).state = SessionState::Connecting;
    }

    pub(crate) fn mark_transport_open(&self) {
        self.transport_open.store(true, Ordering::SeqCst);
        // 新连接已打开，之前的重新连接请求已满足
        self.restart_requested.store(false, Ordering::SeqCst);
        write(&self.status).state = SessionState::Connecting;
    }

    /// 握手完成：写入会话标识并进入 `Connected`。
    pub(crate) fn mark_connected(&self, info: HandshakeInfo) {
        let mut status = write(&self.status);
        status.state = SessionState::Connected;
        status.identity = info.id.clone();
        status.connected_at = Some(Utc::now());
        status.handshake = Some(info);
    }

    /// 连接结束：清空会话标识与状态。返回本次运行是否曾经打开过连接。
    pub(crate) fn mark_closed(&self) -> bool {
        *write(&self.status) = SessionStatus::default();
        self.transport_open.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn add_connect_listener(&self, listener: SessionListener) {
        write(&self.connect_listeners).push(listener);
    }

    pub(crate) fn add_disconnect_listener(&self, listener: SessionListener) {
        write(&self.disconnect_listeners).push(listener);
    }

    pub(crate) fn fire_connect(&self, client: &SocketClient) {
        // 先复制再调用，监听器内部可以再注册监听器或读取会话状态
        let listeners = read(&self.connect_listeners).clone();
        for listener in listeners {
            listener(client);
        }
    }

    pub(crate) fn fire_disconnect(&self, client: &SocketClient) {
        let listeners = read(&self.disconnect_listeners).clone();
        for listener in listeners {
            listener(client);
        }
    }
}

/// 传输层回调到会话的桥接。
///
/// 只持有客户端的弱引用，传输实现即使长期保存回调也不会让客户端无法释放。
pub(crate) struct SessionEvents {
    client: Weak<ClientInner>,
}

impl SessionEvents {
    pub(crate) fn new(client: &SocketClient) -> Self {
        Self {
            client: Arc::downgrade(&client.inner),
        }
    }

    fn client(&self) -> Option<SocketClient> {
        self.client.upgrade().map(SocketClient::from_inner)
    }
}

impl TransportHandler for SessionEvents {
    fn on_open(&self) {
        let Some(client) = self.client() else { return };
        let session = &client.inner.session;
        session.mark_transport_open();
        if session.disconnect_requested() {
            info!("[会话] 连接打开时已请求断开，立即关闭连接，不再握手。");
            client.inner.transport.close();
            return;
        }
        handshake::begin(&client);
    }

    fn on_message(&self, text: &str) {
        if let Some(client) = self.client() {
            dispatcher::dispatch(&client, text);
        }
    }

    fn on_close(&self) {
        let Some(client) = self.client() else { return };
        let session = &client.inner.session;
        if session.mark_closed() {
            info!("[会话] 连接已关闭，会话标识已清除。");
            session.fire_disconnect(&client);
        } else {
            warn!("[会话] 连接尝试失败，连接未能打开。");
        }
    }
}

/// 后台连接循环：运行一次传输连接，结束后按重连策略决定是否等待并再次连接。
///
/// 只有 `disconnect` 或关闭自动重连能让循环退出；退出是协作式的，发生在当前这次传输运行结束之后。
/// 退出前到达的 `connect` 会让循环继续，而不是被忽略。
pub(crate) async fn run_connection_loop(client: SocketClient) {
    let handler: Arc<dyn TransportHandler> = Arc::new(SessionEvents::new(&client));
    let inner = &client.inner;
    let session = &inner.session;
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        session.begin_attempt();
        info!("[会话] 第 {} 次连接尝试，目标: {}", attempt, inner.config.url);
        inner.transport.run(&inner.config.url, handler.clone()).await;

        if session.take_restart_request() {
            info!("[会话] 断开期间收到新的 connect 请求，立即重新连接。");
            continue;
        }
        if session.reconnect_enabled() {
            let delay = session.reconnect_delay();
            info!("[会话] {} 毫秒后尝试重连。", delay.as_millis());
            tokio::time::sleep(delay).await;
            if session.reconnect_enabled() || session.take_restart_request() {
                continue;
            }
            info!("[会话] 等待重连期间自动重连被关闭，准备退出连接循环。");
        } else {
            info!("[会话] 自动重连未启用，准备退出连接循环。");
        }

        if !session.release_loop() {
            break;
        }
        info!("[会话] 退出连接循环前收到新的连接请求，继续连接。");
    }

    debug!("[会话] 后台连接任务已结束 (共 {} 次尝试)。", attempt);
}
