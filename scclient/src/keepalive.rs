// scclient/src/keepalive.rs

//! 心跳应答。服务端的 `#1` 帧不是 JSON，必须在任何解码之前识别并立即回复 `#2`。

use log::{debug, warn};
use rust_websocket_utils::client::transport::Transport;
use sc_protocol_models::{PING_FRAME, PONG_FRAME};

/// 若 `text` 是心跳请求帧，则在同一传输上回复应答帧并返回 `true`；否则返回 `false`，不做任何事。
pub fn respond_to_ping(transport: &dyn Transport, text: &str) -> bool {
    if text != PING_FRAME {
        return false;
    }
    debug!("[心跳] 收到心跳请求帧，回复应答帧。");
    if let Err(e) = transport.send(PONG_FRAME.to_string()) {
        warn!("[心跳] 回复心跳应答帧失败: {}", e);
    }
    true
}
