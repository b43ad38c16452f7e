use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized - session expired or missing, please log in again")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed ({status}): {detail}")]
    Validation {
        status: u16,
        detail: serde_json::Value,
    },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Credential store error: {0}")]
    Store(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        ApiError::Store(msg.into())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 | 422 => ApiError::Validation {
                status: status.as_u16(),
                detail: serde_json::from_str(body)
                    .unwrap_or_else(|_| serde_json::Value::String(body.to_string())),
            },
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(Self::truncate_body(body)),
            404 => ApiError::NotFound(Self::truncate_body(body)),
            500..=599 => ApiError::ServerError(Self::truncate_body(body)),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// True for failures that mean the stored session can no longer be used.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::InvalidCredentials)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidResponse(err.to_string())
    }
}
