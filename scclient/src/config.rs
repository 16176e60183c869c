// scclient/src/config.rs

//! 客户端配置。
//!
//! `ClientConfig` 可以直接在代码中构造 (`ClientConfig::new(url)` 加上 `with_*` 方法)，
//! 也可以从 JSON 配置文件加载。配置只属于单个客户端实例，不存在全局配置。

use crate::error::ClientError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// 默认的服务端地址。
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8000/socketcluster/";
/// 两次重连尝试之间的默认等待时间（单位：毫秒）。
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;

/// 响应帧中错误与数据字段的位置。
///
/// 不同版本的服务端对响应帧的组织方式不同，一个客户端实例只使用其中一种，并对所有响应一致地应用。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDialect {
    /// `{"rid": n, "data": ..., "error": ...}`
    #[default]
    TopLevel,
    /// `{"rid": n, "data": {"data": ..., "error": ...}}`
    Nested,
}

/// 客户端主配置结构体。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// 服务端 WebSocket 地址，必须是 `ws://` 或 `wss://`。
    pub url: String,
    /// 每次握手时原样发送的认证令牌。
    pub auth_token: Option<String>,
    /// 连接关闭后是否自动重连。
    pub reconnect_enabled: bool,
    /// 两次重连尝试之间的固定等待时间（单位：毫秒）。
    pub reconnect_delay_ms: u64,
    /// 响应帧的字段布局。
    pub response_dialect: ResponseDialect,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            auth_token: None,
            reconnect_enabled: true,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            response_dialect: ResponseDialect::TopLevel,
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_reconnect(mut self, enabled: bool) -> Self {
        self.reconnect_enabled = enabled;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_response_dialect(mut self, dialect: ResponseDialect) -> Self {
        self.response_dialect = dialect;
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// 校验配置：地址必须能被解析，且协议为 `ws` 或 `wss`。
    pub fn validate(&self) -> Result<Url, ClientError> {
        let url = Url::parse(&self.url)
            .map_err(|e| ClientError::Config(format!("无法解析服务端地址 '{}': {}", self.url, e)))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ClientError::Config(format!(
                "服务端地址 '{}' 的协议 '{}' 不受支持，只允许 ws 或 wss",
                self.url, other
            ))),
        }
    }

    /// 从 JSON 配置文件加载并校验配置。文件中缺失的字段取默认值。
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            warn!("[配置模块] 读取配置文件 {:?} 失败: {}", path, e);
            ClientError::Config(format!("读取配置文件 {:?} 失败: {}", path, e))
        })?;
        let config = serde_json::from_str::<ClientConfig>(&content).map_err(|e| {
            warn!("[配置模块] 从 {:?} 反序列化配置失败: {}", path, e);
            ClientError::Config(format!("配置文件 {:?} 格式错误: {}", path, e))
        })?;
        config.validate()?;
        info!("[配置模块] 已成功从配置文件 {:?} 加载客户端配置。", path);
        Ok(config)
    }
}
