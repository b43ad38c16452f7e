//! REST API client module for the UNIBOT backend.
//!
//! This module provides the `UnibotClient` for the course, chat and account
//! endpoints, the `Transport` seam it sends through, and `ApiError`.
//!
//! The API uses JWT bearer token authentication; tokens are obtained from
//! `/auth/login/` and renewed through `/auth/token/refresh/`.

pub mod client;
pub mod error;
pub mod transport;

pub use client::UnibotClient;
pub use error::{ApiError, ApiResult};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
