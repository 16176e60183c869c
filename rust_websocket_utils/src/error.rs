// rust_websocket_utils/src/error.rs

//! 定义 WebSocket 传输层相关的错误类型。

use thiserror::Error;

/// WebSocket 传输层的统一错误类型。
#[derive(Error, Debug)]
pub enum WsError {
    /// WebSocket 协议相关的错误。
    /// 例如，连接被拒绝、握手失败、读取帧时连接异常中断等。
    #[error("WebSocket协议错误: {0}")]
    WebSocketProtocolError(#[from] tokio_tungstenite::tungstenite::Error),

    /// 当尝试发送消息到一个已关闭的发送队列时发生。
    #[error("发送错误: 通道已关闭")]
    SendErrorClosed,

    /// 无效的 URL 格式。
    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    /// 未连接错误，当尝试在未建立连接时发送消息。
    #[error("未连接")]
    NotConnected,
}
