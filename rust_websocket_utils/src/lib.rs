//! `rust_websocket_utils` 是一个提供 WebSocket 客户端传输能力的 Rust Crate。
//!
//! 它只负责 "文本帧进、文本帧出"：建立连接、驱动接收循环、排队发送、关闭连接，
//! 并通过回调把打开 / 收到消息 / 关闭三类事件交给上层协议引擎。
//! 帧内容的编码与协议语义由上层 (`scclient`) 决定。
//!
//! 主要模块包括：
//! - `error`: 定义传输层使用的错误类型 `WsError`。
//! - `client`: 定义 `Transport` / `TransportHandler` 约定，以及基于 `tokio-tungstenite` 的 `WsTransport` 实现。

pub mod client;
pub mod error;
