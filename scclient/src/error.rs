// scclient/src/error.rs

//! 定义协议引擎的错误类型。

use rust_websocket_utils::error::WsError;
use thiserror::Error;

/// 协议引擎的统一错误类型。
///
/// 只有调用方主动发起的操作 (`emit` / `publish` / `connect` / 加载配置) 会把错误返回给调用方；
/// 后台接收循环中遇到的 `Decode` 与 `CallbackNotFound` 只记录日志后丢弃，永远不会中断接收循环。
#[derive(Error, Debug)]
pub enum ClientError {
    /// 传输层错误，例如尚未连接时发送。
    #[error("传输层错误: {0}")]
    Transport(#[from] WsError),

    /// 出站负载无法序列化为 JSON。
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 入站文本不是合法的协议信封。
    #[error("解码错误: {0}")]
    Decode(String),

    /// 响应帧的关联 ID 没有对应的未决回调 (重复响应、未请求的响应，或重连后 ID 已重置)。
    #[error("未找到关联 ID 为 {0} 的未决回调")]
    CallbackNotFound(u64),

    /// 调用 `connect` 时当前线程不在 tokio 运行时中。
    #[error("当前上下文中没有可用的 tokio 运行时")]
    NoRuntime,

    /// 配置无效或无法加载。
    #[error("配置错误: {0}")]
    Config(String),
}
