// scclient/src/dispatcher.rs

//! 入站消息分发。
//!
//! 对传输层收到的每一条文本：
//! 1. 先交给心跳应答处理，命中即结束；
//! 2. 解码为 `InboundEnvelope`，失败则记录日志并丢弃；
//! 3. 带 `rid` 的帧从关联登记表中取出回调并以 `(名称, 错误, 数据)` 调用；
//! 4. 不带 `rid` 的帧是服务端主动推送的事件，本客户端不维护频道订阅，记录后丢弃。
//!
//! 这里的任何失败都不会向传输层回调传播，接收循环总能继续处理下一条消息。

use crate::client::SocketClient;
use crate::config::ResponseDialect;
use crate::error::ClientError;
use crate::keepalive;
use log::{debug, warn};
use sc_protocol_models::InboundEnvelope;
use serde_json::Value;

pub(crate) fn dispatch(client: &SocketClient, text: &str) {
    let inner = &client.inner;
    if keepalive::respond_to_ping(inner.transport.as_ref(), text) {
        return;
    }

    let envelope = match decode(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("[分发器] 丢弃无法解码的入站消息: {}", e);
            return;
        }
    };

    let Some(rid) = envelope.rid else {
        debug!(
            "[分发器] 收到服务端主动推送的事件 {:?}，未订阅任何频道，已丢弃。",
            envelope.event
        );
        return;
    };

    match inner.registry.resolve(rid) {
        Ok(pending) => {
            let (error, data) = split_response(inner.config.response_dialect, envelope);
            debug!("[分发器] 响应 rid={} 对应请求 '{}'，调用回调。", rid, pending.name);
            pending.invoke(error, data);
        }
        Err(e) => warn!("[分发器] 丢弃响应帧: {}", e),
    }
}

/// 把传输层文本解码为入站信封。
pub fn decode(text: &str) -> Result<InboundEnvelope, ClientError> {
    InboundEnvelope::from_text(text)
        .map_err(|e| ClientError::Decode(format!("{}，原始文本: '{}'", e, text)))
}

/// 按响应字段布局取出 `(错误, 数据)`。错误为 `null` 时视为没有错误。
pub fn split_response(dialect: ResponseDialect, envelope: InboundEnvelope) -> (Option<Value>, Value) {
    match dialect {
        ResponseDialect::TopLevel => (envelope.error, envelope.data),
        ResponseDialect::Nested => {
            let mut body = envelope.data;
            let error = body
                .get_mut("error")
                .map(Value::take)
                .filter(|value| !value.is_null());
            let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
            (error, data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_top_level_response() {
        let envelope = decode(r#"{"rid": 3, "data": {"ok": true}, "error": "boom"}"#).unwrap();
        assert_eq!(
            split_response(ResponseDialect::TopLevel, envelope),
            (Some(json!("boom")), json!({"ok": true}))
        );
    }

    #[test]
    fn test_split_nested_response() {
        let envelope =
            decode(r#"{"rid": 1, "data": {"error": "This is an error", "data": "This is some data"}}"#).unwrap();
        assert_eq!(
            split_response(ResponseDialect::Nested, envelope),
            (Some(json!("This is an error")), json!("This is some data"))
        );

        let without_error = decode(r#"{"rid": 1, "data": {"error": null, "data": [1, 2]}}"#).unwrap();
        assert_eq!(
            split_response(ResponseDialect::Nested, without_error),
            (None, json!([1, 2]))
        );
    }

    #[test]
    fn test_nested_dialect_with_non_object_body() {
        let envelope = decode(r#"{"rid": 1, "data": "plain"}"#).unwrap();
        assert_eq!(split_response(ResponseDialect::Nested, envelope), (None, Value::Null));
    }

    #[test]
    fn test_decode_error_carries_raw_text() {
        match decode("{broken") {
            Err(ClientError::Decode(details)) => assert!(details.contains("{broken")),
            other => panic!("预期 ClientError::Decode，但收到: {:?}", other.map(|_| ())),
        }
    }
}
