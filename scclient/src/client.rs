// scclient/src/client.rs

//! 面向应用层的客户端句柄 `SocketClient`。
//!
//! `SocketClient` 是一个可廉价克隆的句柄，所有克隆共享同一个会话。
//! `emit` / `publish` 与各个访问器都是同步方法，可以在任意线程并发调用；
//! 连接、握手与消息接收则运行在 `connect` 启动的单个后台 tokio 任务上。

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::handshake::HandshakeInfo;
use crate::registry::CallbackRegistry;
use crate::session::{self, Session, SessionListener, SessionState};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rust_websocket_utils::client::transport::{Transport, WsTransport};
use sc_protocol_models::OutboundEnvelope;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// 所有克隆共享的客户端状态。
pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) registry: CallbackRegistry,
    pub(crate) session: Session,
}

/// 发布/订阅协议客户端。
///
/// # 回调约定
/// 响应回调与连接 / 断开监听器都在后台接收循环上同步执行，
/// 执行期间不会处理任何其他入站消息，因此它们不得阻塞。
///
/// 后台连接循环运行期间持有客户端的一份引用，调用 `disconnect` 后循环才会退出并释放它。
#[derive(Clone)]
pub struct SocketClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl std::fmt::Debug for SocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketClient")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("identity", &self.identity())
            .finish()
    }
}

fn to_payload<T: Serialize + ?Sized>(data: &T) -> Result<Value, ClientError> {
    serde_json::to_value(data)
        .map_err(|e| ClientError::Serialization(format!("出站负载序列化为JSON失败: {}", e)))
}

impl SocketClient {
    /// 使用默认的 `WsTransport` 创建客户端。配置会先经过校验。
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_transport(config, Arc::new(WsTransport::new()))
    }

    /// 使用自定义传输实现创建客户端。
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        config.validate()?;
        info!(
            "[客户端] 正在初始化，服务端地址: {}，自动重连: {}，重连间隔: {} 毫秒",
            config.url, config.reconnect_enabled, config.reconnect_delay_ms
        );
        let session = Session::new(config.reconnect_enabled, config.reconnect_delay());
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                registry: CallbackRegistry::new(),
                session,
            }),
        })
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// 在当前 tokio 运行时上启动后台连接循环，立即返回。
    ///
    /// 连接循环已在运行时不会启动第二个循环；若此前调用过 `disconnect` 而循环尚未退出，
    /// 则撤销断开请求，循环在当前连接关闭后立即重新连接。
    /// 连接结果通过 `on_connect` / `on_disconnect` 异步通知。
    pub fn connect(&self) -> Result<(), ClientError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        let session = &self.inner.session;
        if !session.try_begin_loop() {
            if session.request_restart() {
                info!("[客户端] 后台连接循环正在因断开请求退出，已改为重新连接。");
            } else {
                info!("[客户端] 后台连接循环已在运行，忽略本次 connect 调用。");
            }
            return Ok(());
        }
        info!("[客户端] 启动后台连接循环: {}", self.inner.config.url);
        runtime.spawn(session::run_connection_loop(self.clone()));
        Ok(())
    }

    /// 关闭自动重连并请求关闭当前连接。
    ///
    /// 断开是异步完成的：状态清理与断开通知发生在传输层的关闭回调中。重复调用是安全的。
    pub fn disconnect(&self) {
        info!("[客户端] 请求断开连接，自动重连已关闭。");
        self.inner.session.request_disconnect();
        self.inner.transport.close();
    }

    /// 发送不需要响应的事件，信封中不包含 `cid`。
    pub fn emit<T>(&self, event: &str, data: &T) -> Result<(), ClientError>
    where
        T: Serialize + ?Sized,
    {
        let envelope = OutboundEnvelope::emit(event, to_payload(data)?, None);
        self.send_envelope(&envelope)
    }

    /// 发送事件并在响应到达时调用 `handler(事件名, 错误, 数据)`。
    pub fn emit_with_ack<T, F>(&self, event: &str, data: &T, handler: F) -> Result<(), ClientError>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&str, Option<Value>, Value) + Send + 'static,
    {
        let data = to_payload(data)?;
        let cid = self.inner.registry.allocate(event, Box::new(handler));
        self.send_tracked(cid, &OutboundEnvelope::emit(event, data, Some(cid)))
    }

    /// 向频道发布消息。发布总是请求服务端确认；确认中的错误会以警告日志记录。
    pub fn publish<T>(&self, channel: &str, data: &T) -> Result<(), ClientError>
    where
        T: Serialize + ?Sized,
    {
        self.publish_with_ack(channel, data, |channel: &str, error: Option<Value>, _data: Value| {
            if let Some(error) = error {
                warn!("[客户端] 频道 '{}' 的发布被服务端拒绝: {}", channel, error);
            }
        })
    }

    /// 向频道发布消息并在确认到达时调用 `handler(频道名, 错误, 数据)`。
    pub fn publish_with_ack<T, F>(&self, channel: &str, data: &T, handler: F) -> Result<(), ClientError>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&str, Option<Value>, Value) + Send + 'static,
    {
        let data = to_payload(data)?;
        let cid = self.inner.registry.allocate(channel, Box::new(handler));
        self.send_tracked(cid, &OutboundEnvelope::publish(channel, data, cid))
    }

    pub(crate) fn send_envelope(&self, envelope: &OutboundEnvelope) -> Result<(), ClientError> {
        let text = envelope
            .to_text()
            .map_err(|e| ClientError::Serialization(format!("信封序列化为JSON失败: {}", e)))?;
        debug!("[客户端] 发送: {}", text);
        self.inner.transport.send(text)?;
        Ok(())
    }

    // 发送失败时撤销刚登记的回调，避免它永远留在登记表中
    fn send_tracked(&self, cid: u64, envelope: &OutboundEnvelope) -> Result<(), ClientError> {
        match self.send_envelope(envelope) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.inner.registry.cancel(cid);
                Err(e)
            }
        }
    }

    /// 服务端在最近一次握手中分配的会话标识；未连接时为 `None`。
    pub fn identity(&self) -> Option<String> {
        self.inner.session.identity()
    }

    /// 握手完成且连接尚未关闭时为 `true`。
    pub fn connected(&self) -> bool {
        self.inner.session.connected()
    }

    pub fn state(&self) -> SessionState {
        self.inner.session.state()
    }

    /// 最近一次握手完成的时间。
    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.inner.session.connected_at()
    }

    pub fn handshake_info(&self) -> Option<HandshakeInfo> {
        self.inner.session.handshake_info()
    }

    pub fn reconnect_enabled(&self) -> bool {
        self.inner.session.reconnect_enabled()
    }

    pub fn set_reconnect_enabled(&self, enabled: bool) {
        self.inner.session.set_reconnect_enabled(enabled);
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.inner.session.reconnect_delay()
    }

    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// 当前连接上尚未收到响应的请求数量。
    pub fn pending_requests(&self) -> usize {
        self.inner.registry.pending_count()
    }

    /// 注册连接通知：每次握手完成时调用一次。
    pub fn on_connect<F>(&self, listener: F)
    where
        F: Fn(&SocketClient) + Send + Sync + 'static,
    {
        let listener: SessionListener = Arc::new(listener);
        self.inner.session.add_connect_listener(listener);
    }

    /// 注册断开通知：每次已打开的连接关闭时调用一次。
    pub fn on_disconnect<F>(&self, listener: F)
    where
        F: Fn(&SocketClient) + Send + Sync + 'static,
    {
        let listener: SessionListener = Arc::new(listener);
        self.inner.session.add_disconnect_listener(listener);
    }
}
