// rust_websocket_utils/src/client/mod.rs

//! WebSocket 客户端模块。
//!
//! 本模块 (`client`) 及其子模块 `transport` 构成了协议引擎与网络之间的边界：
//! - **传输约定**: `Transport` 描述引擎对传输层的全部要求 (`run` / `send` / `close`)，
//!   `TransportHandler` 描述传输层回调引擎的三个钩子 (`on_open` / `on_message` / `on_close`)。
//! - **默认实现**: `WsTransport` 使用 `tokio-tungstenite` 建立连接并驱动读写。
//!
//! 引擎只依赖这两个 trait，因此测试中可以用内存实现替换真实网络。

pub mod transport;
