//! HTTP transport seam.
//!
//! `ApiRequest` is the pending request a caller hands to the session,
//! `ApiResponse` is a fully buffered reply. The `Transport` trait is the
//! only place bytes leave the process, which keeps the session logic
//! testable without a server.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::{ApiError, ApiResult};

/// A logical call against the API, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ApiResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Add a caller header. These win over the headers the session injects.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A buffered response: status plus the full body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
        })
    }

    /// Turn a non-2xx response into the matching `ApiError`.
    pub fn error_for_status(self) -> ApiResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.body))
        }
    }
}

/// Sends one fully built request. Implementations must not retry.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(
        &self,
        method: &Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&serde_json::Value>,
    ) -> ApiResult<ApiResponse>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> ApiResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    /// Use an existing client, sharing its connection pool.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        method: &Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&serde_json::Value>,
    ) -> ApiResult<ApiResponse> {
        let mut builder = self.client.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            // Raw bytes so the content-type header stays whatever the caller settled on
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%method, url, status = status.as_u16(), bytes = text.len(), "Response received");

        Ok(ApiResponse::new(status, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::ACCEPT;

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::post("/chat/")
            .json(&serde_json::json!({ "message": "hi" }))
            .expect("serializable body")
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.endpoint, "/chat/");
        assert_eq!(request.body, Some(serde_json::json!({ "message": "hi" })));
        assert_eq!(request.headers[ACCEPT], "application/json");
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse::new(StatusCode::CREATED, "{}");
        assert!(ok.error_for_status().is_ok());

        let missing = ApiResponse::new(StatusCode::NOT_FOUND, "no such course");
        assert!(matches!(
            missing.error_for_status(),
            Err(ApiError::NotFound(body)) if body == "no such course"
        ));
    }

    #[test]
    fn test_json_parse_failure_is_invalid_response() {
        let response = ApiResponse::new(StatusCode::OK, "<html>");
        let parsed: ApiResult<serde_json::Value> = response.json();
        assert!(matches!(parsed, Err(ApiError::InvalidResponse(_))));
    }
}
