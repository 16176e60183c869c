// scclient/src/testing.rs

//! 单元测试使用的内存传输实现：只记录发出的帧，不建立任何网络连接。

use futures_util::future::{self, BoxFuture, FutureExt};
use rust_websocket_utils::client::transport::{Transport, TransportHandler};
use rust_websocket_utils::error::WsError;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    open: AtomicBool,
    close_requests: AtomicUsize,
    runs: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            close_requests: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// 已发送帧中能解析为 JSON 的部分。
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn close_requests(&self) -> usize {
        self.close_requests.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn run<'a>(&'a self, _url: &'a str, _handler: Arc<dyn TransportHandler>) -> BoxFuture<'a, ()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        // 永不结束，模拟一条一直保持的连接
        future::pending().boxed()
    }

    fn send(&self, text: String) -> Result<(), WsError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(WsError::NotConnected);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&self) {
        self.close_requests.fetch_add(1, Ordering::SeqCst);
    }
}
