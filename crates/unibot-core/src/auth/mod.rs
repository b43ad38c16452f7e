//! Authentication module for managing tokens and the request session.
//!
//! This module provides:
//! - `CredentialStore`: durable key-value storage for the token pair, with
//!   in-memory, file and OS keyring backends
//! - `SessionClient`: bearer-token requests with one refresh-and-retry on 401

pub mod credentials;
pub mod session;

pub use credentials::{
    CredentialPair, CredentialStore, FileStore, KeyringStore, MemoryStore, ACCESS_KEY, REFRESH_KEY,
};
pub use session::{SessionClient, REFRESH_ENDPOINT};
