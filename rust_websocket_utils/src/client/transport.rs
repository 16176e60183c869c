// rust_websocket_utils/src/client/transport.rs

//! 客户端 WebSocket 传输层核心逻辑。
//!
//! 本模块定义了协议引擎所依赖的传输约定 (`Transport` / `TransportHandler`)，
//! 并提供基于 `tokio-tungstenite` 的默认实现 `WsTransport`。
//! `WsTransport::run` 在一个异步任务中完成 "连接 -> 回调 on_open -> 读写循环 -> 回调 on_close" 的完整周期，
//! 而 `send` / `close` 是同步、非阻塞的，可以在任意线程 (包括回调内部) 调用：
//! 它们只是把帧放入发送队列，由 `run` 所在的任务负责真正写出。

use crate::error::WsError;
use futures_util::{
    future::BoxFuture,
    stream::{SplitSink, SplitStream},
    FutureExt, SinkExt, StreamExt,
};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    tungstenite::Error as TungsteniteError,
    MaybeTlsStream, WebSocketStream,
};
use url::Url;
use uuid::Uuid;

/// `ClientWsStream` 类型别名，代表一个可能经过 TLS 加密的 TCP WebSocket 流。
pub type ClientWsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// 传输层回调钩子。
///
/// 三个回调都在 `Transport::run` 所在的后台任务上同步调用，实现方不得在其中阻塞。
/// 对每一次 `run` 调用，`on_close` 恰好被调用一次 (即使连接从未打开)；
/// `on_open` 至多调用一次，且总在该次运行的任何 `on_message` 之前。
pub trait TransportHandler: Send + Sync {
    /// 物理连接已建立，可以开始发送。
    fn on_open(&self);
    /// 收到一条完整的文本帧。
    fn on_message(&self, text: &str);
    /// 本次连接尝试结束 (连接失败、对端关闭或本地调用了 `close`)。
    fn on_close(&self);
}

/// 协议引擎对传输层的全部要求。
pub trait Transport: Send + Sync {
    /// 连接到 `url` 并驱动接收循环，直到连接关闭后才返回。
    fn run<'a>(&'a self, url: &'a str, handler: Arc<dyn TransportHandler>) -> BoxFuture<'a, ()>;

    /// 发送一条文本帧。未连接时返回 `WsError::NotConnected`。
    fn send(&self, text: String) -> Result<(), WsError>;

    /// 请求关闭当前连接；关闭结果通过 `TransportHandler::on_close` 异步通知。
    /// 没有活动连接时为空操作。
    fn close(&self);
}

/// `ClientConnection` 结构体代表一个刚建立的客户端 WebSocket 连接。
///
/// 它封装了与服务器进行通信所需的发送端 (`SplitSink`) 和接收端 (`SplitStream`)。
pub struct ClientConnection {
    /// 用于向 WebSocket 服务器异步发送消息的 `Sink` (发送端)。
    pub ws_sender: SplitSink<ClientWsStream, Message>,
    /// 用于从 WebSocket 服务器异步接收消息的 `Stream` (接收端)。
    pub ws_receiver: SplitStream<ClientWsStream>,
}

/// 异步连接到指定的 WebSocket 服务器。
///
/// 先用 `url` crate 校验地址，再调用 `connect_async` 完成 WebSocket 握手，
/// 成功后把流拆分为发送端与接收端。
///
/// # Returns
/// * `Result<ClientConnection, WsError>` - URL 无效时返回 `WsError::InvalidUrl`，
///   连接或握手失败时返回 `WsError::WebSocketProtocolError`。
pub async fn connect_client(url_str: &str) -> Result<ClientConnection, WsError> {
    debug!("[客户端传输] 开始尝试连接到 WebSocket 服务器，URL: {}", url_str);
    let parsed_url = Url::parse(url_str)
        .map_err(|e| WsError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", url_str, e)))?;

    let (ws_stream, response) = connect_async(parsed_url.as_str()).await?;
    info!("[客户端传输] 已成功连接到 {} (HTTP 状态码: {})", url_str, response.status());
    let (ws_sender, ws_receiver) = ws_stream.split();
    Ok(ClientConnection { ws_sender, ws_receiver })
}

/// 从接收流中读取下一条文本帧。
///
/// 控制帧 (Ping/Pong/Frame) 由 `tokio-tungstenite` 自动处理，这里直接跳过；
/// 二进制帧不属于本协议，记录警告后跳过。
///
/// # Returns
/// * `Some(Ok(text))` - 收到一条文本帧。
/// * `Some(Err(e))` - 读取时发生底层错误，调用方应结束本次连接。
/// * `None` - 连接已关闭 (收到 Close 帧或流已结束)。
pub async fn receive_text(
    ws_receiver: &mut SplitStream<ClientWsStream>,
) -> Option<Result<String, WsError>> {
    loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => break Some(Ok(text)),
            Some(Ok(Message::Binary(bin))) => {
                warn!("[客户端传输] 收到非预期的二进制消息 ({} 字节)，已忽略。", bin.len());
            }
            Some(Ok(Message::Close(close_frame))) => {
                debug!("[客户端传输] 收到 Close 控制帧: {:?}", close_frame);
                break None;
            }
            Some(Ok(_control)) => {
                // Ping/Pong/Frame
            }
            Some(Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed)) => {
                debug!("[客户端传输] 连接已关闭 (ConnectionClosed / AlreadyClosed)。");
                break None;
            }
            Some(Err(e)) => break Some(Err(WsError::WebSocketProtocolError(e))),
            None => {
                debug!("[客户端传输] WebSocket 接收流已结束。");
                break None;
            }
        }
    }
}

/// 基于 `tokio-tungstenite` 的默认传输实现。
///
/// 同一时刻最多持有一条物理连接；`run` 结束后可以再次调用 `run` 建立新连接 (重连)。
#[derive(Debug, Default)]
pub struct WsTransport {
    /// 当前连接的发送队列。`None` 表示没有活动连接。
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前是否持有一条已打开的连接。
    pub fn is_open(&self) -> bool {
        self.outbound().is_some()
    }

    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Message>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_connection(&self, url: &str, handler: Arc<dyn TransportHandler>) {
        let connection_id = Uuid::new_v4();
        let ClientConnection { mut ws_sender, mut ws_receiver } = match connect_client(url).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!("[客户端传输] (连接 {}) 连接到 {} 失败: {}", connection_id, url, e);
                handler.on_close();
                return;
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        *self.outbound() = Some(tx);
        info!("[客户端传输] (连接 {}) 连接已打开，开始读写循环。", connection_id);
        handler.on_open();

        loop {
            tokio::select! {
                outgoing = rx.recv() => match outgoing {
                    Some(Message::Close(frame)) => {
                        info!("[客户端传输] (连接 {}) 收到本地关闭请求，正在发送 Close 帧。", connection_id);
                        if let Err(e) = ws_sender.send(Message::Close(frame)).await {
                            debug!("[客户端传输] (连接 {}) 发送 Close 帧失败: {}", connection_id, e);
                        }
                        break;
                    }
                    Some(frame) => {
                        if let Err(e) = ws_sender.send(frame).await {
                            error!("[客户端传输] (连接 {}) 写出消息失败: {}", connection_id, e);
                            break;
                        }
                    }
                    None => break,
                },
                incoming = receive_text(&mut ws_receiver) => match incoming {
                    Some(Ok(text)) => {
                        debug!("[客户端传输] (连接 {}) 收到文本消息: '{}'", connection_id, text);
                        handler.on_message(&text);
                    }
                    Some(Err(e)) => {
                        error!("[客户端传输] (连接 {}) 接收消息时发生底层错误: {}", connection_id, e);
                        break;
                    }
                    None => {
                        info!("[客户端传输] (连接 {}) 连接已由对端关闭。", connection_id);
                        break;
                    }
                },
            }
        }

        self.outbound().take();
        if let Err(e) = ws_sender.close().await {
            debug!("[客户端传输] (连接 {}) 关闭发送端时出错: {}", connection_id, e);
        }
        info!("[客户端传输] (连接 {}) 读写循环已结束。", connection_id);
        handler.on_close();
    }
}

impl Transport for WsTransport {
    fn run<'a>(&'a self, url: &'a str, handler: Arc<dyn TransportHandler>) -> BoxFuture<'a, ()> {
        self.run_connection(url, handler).boxed()
    }

    fn send(&self, text: String) -> Result<(), WsError> {
        match self.outbound().as_ref() {
            Some(tx) => tx
                .send(Message::Text(text))
                .map_err(|_| WsError::SendErrorClosed),
            None => Err(WsError::NotConnected),
        }
    }

    fn close(&self) {
        match self.outbound().as_ref() {
            Some(tx) => {
                if tx.send(Message::Close(None)).is_err() {
                    debug!("[客户端传输] 发送队列已关闭，忽略关闭请求。");
                }
            }
            None => debug!("[客户端传输] 当前没有活动连接，忽略关闭请求。"),
        }
    }
}
