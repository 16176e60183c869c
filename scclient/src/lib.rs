// scclient/src/lib.rs

//! `scclient` 是发布/订阅实时消息协议的客户端协议引擎。
//!
//! 它在一条 WebSocket 连接之上负责：
//! - 连接打开后发送 `#handshake` 并记录服务端分配的会话标识；
//! - 为需要响应的请求分配单调递增的关联 ID (`cid`)，并把响应 (`rid`) 路由回对应回调；
//! - 应答服务端心跳 (`#1` -> `#2`)；
//! - 连接断开后按固定间隔自动重连，并向应用层派发连接 / 断开通知。
//!
//! 传输层通过 `rust_websocket_utils::client::transport::Transport` 注入，默认使用基于
//! `tokio-tungstenite` 的 `WsTransport`。
//!
//! ```rust,no_run
//! use scclient::{ClientConfig, SocketClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), scclient::ClientError> {
//!     let client = SocketClient::new(ClientConfig::new("ws://127.0.0.1:8000/socketcluster/"))?;
//!     client.on_connect(|client| {
//!         println!("已连接，会话标识: {:?}", client.identity());
//!         let _ = client.publish("room1", &json!({"text": "hello"}));
//!     });
//!     client.connect()?;
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handshake;
pub mod keepalive;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use client::SocketClient;
pub use config::{ClientConfig, ResponseDialect};
pub use error::ClientError;
pub use handshake::HandshakeInfo;
pub use registry::ResponseHandler;
pub use session::{SessionListener, SessionState};
