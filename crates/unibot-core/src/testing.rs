//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use reqwest::header::{self, HeaderMap};
use reqwest::{Method, StatusCode};

use crate::api::transport::{ApiResponse, Transport};
use crate::api::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl RecordedCall {
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

type Handler = Box<dyn Fn(&RecordedCall) -> ApiResult<ApiResponse> + Send + Sync>;

/// Transport that records every call and answers through a handler.
pub(crate) struct MockTransport {
    handler: Handler,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&RecordedCall) -> ApiResult<ApiResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers calls in order; panics once the script runs out.
    pub fn scripted(replies: Vec<ApiResult<ApiResponse>>) -> Self {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::new(move |call| {
            queue
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected call: {} {}", call.method, call.url))
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("lock").clone()
    }
}

impl Transport for MockTransport {
    async fn send(
        &self,
        method: &Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&serde_json::Value>,
    ) -> ApiResult<ApiResponse> {
        let call = RecordedCall {
            method: method.clone(),
            url: url.to_string(),
            headers,
            body: body.cloned(),
        };
        self.calls.lock().expect("lock").push(call.clone());
        // Let concurrently joined calls interleave like real I/O would
        tokio::task::yield_now().await;
        (self.handler)(&call)
    }
}

pub(crate) fn reply(status: u16, body: &str) -> ApiResult<ApiResponse> {
    let status = StatusCode::from_u16(status).expect("valid status");
    Ok(ApiResponse::new(status, body))
}

/// A genuine `reqwest::Error`, built from a URL that cannot parse.
pub(crate) fn network_error() -> ApiError {
    let err = reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("invalid url must fail");
    ApiError::Network(err)
}
