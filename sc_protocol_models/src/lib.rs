//! `sc_protocol_models` 协议模型库 crate。
//!
//! 本 crate 集中定义了发布/订阅实时消息协议在线路上传输的信封结构，
//! 以及协议保留的事件名与心跳哨兵帧。传输层 (`rust_websocket_utils`)
//! 只负责搬运文本帧，而协议引擎 (`scclient`) 通过这里的模型完成编码与解码。
//!
//! 主要包含：
//! - **信封 (`envelope`)**: 出站请求信封 `OutboundEnvelope`、握手数据 `HandshakeRequestData`
//!   以及入站响应信封 `InboundEnvelope`。
//! - **保留常量**: `#handshake`、`#publish` 事件名，以及 `#1` / `#2` 心跳帧。
//!
//! 所有模型都派生 `Serialize`, `Deserialize`, `Debug`, `Clone`，与其他共享模型保持一致。

pub mod envelope;

pub use envelope::{
    HandshakeRequestData, InboundEnvelope, OutboundEnvelope, HANDSHAKE_EVENT, PING_FRAME,
    PONG_FRAME, PUBLISH_EVENT,
};
