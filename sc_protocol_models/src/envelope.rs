// sc_protocol_models/src/envelope.rs

//! 协议信封结构体与保留常量。
//!
//! 出站方向只有一种信封形状 (`event` / `channel` / `data` / `cid`)，
//! 普通事件、频道发布与握手请求都由它表示；可选字段缺省时不会出现在 JSON 中，
//! 服务端据此区分 "无需响应" 的请求。
//! 入站方向的结构化帧统一解码为 `InboundEnvelope`，心跳帧不是 JSON，必须在解码之前识别。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 每条物理连接上第一个请求使用的保留事件名。
pub const HANDSHAKE_EVENT: &str = "#handshake";
/// 频道发布使用的保留事件名，频道名放在 `channel` 字段中单独携带。
pub const PUBLISH_EVENT: &str = "#publish";
/// 服务端发来的心跳请求帧 (非 JSON)。
pub const PING_FRAME: &str = "#1";
/// 客户端回复的心跳应答帧 (非 JSON)。
pub const PONG_FRAME: &str = "#2";

/// 客户端发往服务端的请求信封。
///
/// # 字段
/// - `event`: 事件名；发布时固定为 `#publish`，握手时固定为 `#handshake`。
/// - `channel`: 仅在发布时出现的频道名。
/// - `data`: 任意 JSON 负载。
/// - `cid`: 关联 ID；缺省表示不期望服务端响应。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutboundEnvelope {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<u64>,
}

impl OutboundEnvelope {
    /// 构造普通事件信封。`cid` 为 `None` 时序列化结果中不含 `cid` 键。
    pub fn emit(event: impl Into<String>, data: Value, cid: Option<u64>) -> Self {
        Self {
            event: event.into(),
            channel: None,
            data,
            cid,
        }
    }

    /// 构造频道发布信封。发布总是请求确认，因此 `cid` 为必填。
    pub fn publish(channel: impl Into<String>, data: Value, cid: u64) -> Self {
        Self {
            event: PUBLISH_EVENT.to_string(),
            channel: Some(channel.into()),
            data,
            cid: Some(cid),
        }
    }

    /// 构造握手请求信封，`auth_token` 原样放入 `data.authToken` (缺省时为 JSON `null`)。
    pub fn handshake(auth_token: Option<String>, cid: u64) -> Self {
        let data = HandshakeRequestData { auth_token };
        Self {
            event: HANDSHAKE_EVENT.to_string(),
            channel: None,
            // 只含 Option<String> 的结构体转换为 Value 不会失败
            data: serde_json::to_value(data).unwrap_or(Value::Null),
            cid: Some(cid),
        }
    }

    /// 将信封编码为可直接交给传输层发送的 JSON 文本。
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// 握手请求的 `data` 部分。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct HandshakeRequestData {
    /// 认证令牌；没有令牌时序列化为 `null` 而不是省略。
    #[serde(rename = "authToken")]
    pub auth_token: Option<String>,
}

/// 服务端发往客户端的结构化帧。
///
/// 携带 `rid` 的帧是对某个出站请求的响应；不带 `rid` 的帧是服务端主动推送的事件。
/// `data` 缺省或为 `null` 时都解码为 `Value::Null`，`error` 为 `null` 时解码为 `None`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct InboundEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl InboundEnvelope {
    /// 从传输层收到的文本解码入站信封。文本不是合法 JSON 对象时返回错误。
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
