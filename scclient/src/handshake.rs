// scclient/src/handshake.rs

//! 握手协调。
//!
//! 每条物理连接打开后，第一个请求必须是 `#handshake`：
//! 1. 重置关联 ID 登记表 (ID 只在单条连接内有效)；
//! 2. 分配关联 ID 并登记握手回调；
//! 3. 发送携带认证令牌的握手请求；
//! 4. 收到响应后写入会话标识、进入 `Connected` 并派发连接通知。
//!
//! 响应携带错误时仍以 "收到响应" 作为握手完成的依据，错误只记录日志并保存在 `HandshakeInfo::error` 中。

use crate::client::SocketClient;
use log::{debug, error, info, warn};
use sc_protocol_models::{OutboundEnvelope, HANDSHAKE_EVENT};
use serde_json::Value;
use std::sync::Arc;

/// 握手响应中解析出的会话信息。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandshakeInfo {
    /// 服务端分配的会话标识 (`data.id`)。
    pub id: Option<String>,
    /// 服务端是否认可了认证令牌 (`data.isAuthenticated`)。
    pub is_authenticated: Option<bool>,
    /// 服务端声明的心跳超时，单位毫秒 (`data.pingTimeout`)。
    pub ping_timeout_ms: Option<u64>,
    /// 握手响应携带的错误，原样保存。
    pub error: Option<Value>,
}

impl HandshakeInfo {
    pub(crate) fn from_response(error: Option<Value>, data: &Value) -> Self {
        Self {
            id: data.get("id").and_then(Value::as_str).map(str::to_owned),
            is_authenticated: data.get("isAuthenticated").and_then(Value::as_bool),
            ping_timeout_ms: data.get("pingTimeout").and_then(Value::as_u64),
            error,
        }
    }
}

/// 在新打开的连接上发起握手。
pub(crate) fn begin(client: &SocketClient) {
    let inner = &client.inner;
    let orphaned = inner.registry.reset();
    if orphaned > 0 {
        warn!("[握手] 新连接已建立，上一条连接遗留的 {} 个未决回调已作废。", orphaned);
    }

    let weak_inner = Arc::downgrade(inner);
    let cid = inner.registry.allocate(
        HANDSHAKE_EVENT,
        Box::new(move |_name: &str, error: Option<Value>, data: Value| match weak_inner.upgrade() {
            Some(inner) => complete(&SocketClient::from_inner(inner), error, data),
            None => debug!("[握手] 客户端已释放，忽略握手响应。"),
        }),
    );

    let envelope = OutboundEnvelope::handshake(inner.config.auth_token.clone(), cid);
    match client.send_envelope(&envelope) {
        Ok(()) => info!("[握手] 已发送握手请求 (cid={})。", cid),
        Err(e) => {
            inner.registry.cancel(cid);
            error!("[握手] 发送握手请求失败: {}", e);
        }
    }
}

/// 处理握手响应。
pub(crate) fn complete(client: &SocketClient, error: Option<Value>, data: Value) {
    if let Some(err) = &error {
        warn!("[握手] 握手响应携带错误 (仍按握手完成处理): {}", err);
    }
    let info = HandshakeInfo::from_response(error, &data);
    if info.id.is_none() {
        warn!("[握手] 握手响应中没有会话标识，原始数据: {}", data);
    }
    info!(
        "[握手] 握手完成，会话标识: {:?}，已认证: {:?}",
        info.id, info.is_authenticated
    );
    let session = &client.inner.session;
    session.mark_connected(info);
    session.fire_connect(client);
}
