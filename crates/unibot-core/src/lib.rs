//! Core library for the UNIBOT university chatbot client.
//!
//! - `auth`: token storage and the authenticated request session
//! - `api`: typed endpoint client, transport and errors
//! - `models`: users, courses, chat
//! - `config`: base URL and persisted settings

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
mod testing;

pub use api::{ApiError, ApiRequest, ApiResponse, ApiResult, HttpTransport, Transport, UnibotClient};
pub use auth::{CredentialPair, CredentialStore, FileStore, KeyringStore, MemoryStore, SessionClient};
pub use config::{ClientConfig, Settings, StoreBackend};
