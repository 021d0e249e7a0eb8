#![allow(dead_code)]

use async_trait::async_trait;
use binance_rest::core::errors::ExchangeError;
use binance_rest::core::kernel::{Transport, TransportRequest, TransportResponse};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder =
    dyn Fn(&TransportRequest) -> Result<TransportResponse, ExchangeError> + Send + Sync;

/// Transport double that records every request and answers from a closure
pub struct MockTransport {
    requests: Mutex<Vec<TransportRequest>>,
    responder: Box<Responder>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&TransportRequest) -> Result<TransportResponse, ExchangeError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            delay: None,
        })
    }

    /// Same as `new`, but every answer is held back for `delay`
    pub fn delayed<F>(delay: Duration, responder: F) -> Arc<Self>
    where
        F: Fn(&TransportRequest) -> Result<TransportResponse, ExchangeError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            delay: Some(delay),
        })
    }

    /// Answers every request with `200 {}` and a fixed weight header
    pub fn ok() -> Arc<Self> {
        Self::new(|_| Ok(ok_json("{}")))
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ExchangeError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request)
    }
}

pub fn ok_json(body: &str) -> TransportResponse {
    TransportResponse::new(200, body)
        .with_header("X-MBX-USED-WEIGHT", "1")
        .with_header("Date", "Wed, 21 Oct 2015 07:28:00 GMT")
}

pub fn query_param<'a>(request: &'a TransportRequest, name: &str) -> Option<&'a str> {
    let raw = request.query.as_deref().or(request.body.as_deref())?;
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

pub fn endpoint(request: &TransportRequest) -> &str {
    request.url.rsplit("/v3/").next().unwrap_or_default()
}

/// Kline row in Binance's positional wire format
pub fn kline_json(open_time: i64, open: &str, close: &str) -> String {
    format!(
        r#"[{open_time},"{open}","{close}","{open}","{close}","1.0",{},"1.0",1,"0.5","0.5","0"]"#,
        open_time + 59_999
    )
}

pub fn klines_json(rows: &[(i64, &str, &str)]) -> String {
    let rows: Vec<String> = rows
        .iter()
        .map(|(t, o, c)| kline_json(*t, o, c))
        .collect();
    format!("[{}]", rows.join(","))
}
