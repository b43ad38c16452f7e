//! Authenticated request session.
//!
//! `SessionClient` owns the credential store and the transport. Every
//! authenticated call goes through [`SessionClient::request`], which injects
//! the bearer token and recovers from a single expired access token per call.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::api::ApiResult;
use crate::config::ClientConfig;

use super::credentials::{clear_pair, load_pair, save_pair, CredentialPair, CredentialStore};

/// Endpoint that trades a refresh token for a new access token.
pub const REFRESH_ENDPOINT: &str = "/auth/token/refresh/";

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Where a single logical call is. Phases only move forward and
/// `RetrySent` always returns, so a call refreshes at most once.
enum CallPhase {
    Sent,
    Refreshing {
        original: ApiResponse,
        refresh_token: String,
    },
    RetrySent {
        access_token: String,
    },
}

pub struct SessionClient<T, S> {
    transport: T,
    store: S,
    base_url: String,
}

impl<S: CredentialStore> SessionClient<HttpTransport, S> {
    /// Session over a fresh reqwest client.
    pub fn from_config(config: &ClientConfig, store: S) -> ApiResult<Self> {
        Ok(Self::new(HttpTransport::new()?, store, config))
    }
}

impl<T: Transport, S: CredentialStore> SessionClient<T, S> {
    /// The base URL is captured here and never re-read.
    pub fn new(transport: T, store: S, config: &ClientConfig) -> Self {
        Self {
            transport,
            store,
            base_url: config.base_url().to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    // ===== Credentials =====

    pub fn load_credentials(&self) -> ApiResult<Option<CredentialPair>> {
        load_pair(&self.store)
    }

    pub fn store_credentials(&self, pair: &CredentialPair) -> ApiResult<()> {
        save_pair(&self.store, pair)
    }

    pub fn clear_credentials(&self) -> ApiResult<()> {
        clear_pair(&self.store)
    }

    // ===== Requests =====

    /// Issue an authenticated request.
    ///
    /// Non-2xx statuses are returned as `Ok`; only transport and store
    /// failures are errors. A 401 with a stored refresh token triggers one
    /// refresh. If the refresh works the original request is reissued once
    /// and that outcome is returned as-is. If it fails the credentials are
    /// cleared and the original 401 is returned.
    pub async fn request(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let credentials = self.load_credentials()?;
        let mut phase = CallPhase::Sent;

        loop {
            phase = match phase {
                CallPhase::Sent => {
                    let access = credentials.as_ref().map(|c| c.access_token.as_str());
                    let response = self.dispatch(request, access).await?;

                    match credentials.as_ref() {
                        Some(pair) if response.status() == StatusCode::UNAUTHORIZED => {
                            CallPhase::Refreshing {
                                original: response,
                                refresh_token: pair.refresh_token.clone(),
                            }
                        }
                        _ => return Ok(response),
                    }
                }
                CallPhase::Refreshing {
                    original,
                    refresh_token,
                } => {
                    let refreshed = self.refresh_access(&refresh_token).await;
                    match refreshed {
                        Some(access_token) => {
                            self.store_credentials(&CredentialPair {
                                access_token: access_token.clone(),
                                refresh_token,
                            })?;
                            info!(endpoint = %request.endpoint, "Access token refreshed, retrying request");
                            CallPhase::RetrySent { access_token }
                        }
                        None => {
                            warn!(endpoint = %request.endpoint, "Token refresh failed, clearing credentials");
                            self.clear_credentials()?;
                            return Ok(original);
                        }
                    }
                }
                CallPhase::RetrySent { access_token } => {
                    return self.dispatch(request, Some(&access_token)).await;
                }
            };
        }
    }

    /// Send without credentials or refresh handling (login, registration).
    pub async fn request_public(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        self.dispatch(request, None).await
    }

    async fn dispatch(&self, request: &ApiRequest, access: Option<&str>) -> ApiResult<ApiResponse> {
        let url = self.url_for(&request.endpoint);
        let headers = build_headers(access, &request.headers)?;
        debug!(method = %request.method, url = %url, authenticated = access.is_some(), "Sending request");
        self.transport
            .send(&request.method, &url, headers, request.body.as_ref())
            .await
    }

    /// One refresh call. `None` on any failure: transport error, non-2xx
    /// (a 401 included) or a body without a usable access token.
    async fn refresh_access(&self, refresh_token: &str) -> Option<String> {
        let url = self.url_for(REFRESH_ENDPOINT);
        let body = match serde_json::to_value(RefreshRequest {
            refresh: refresh_token,
        }) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode refresh request");
                return None;
            }
        };

        let response = match self
            .transport
            .send(&Method::POST, &url, json_headers(), Some(&body))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Refresh request failed");
                return None;
            }
        };

        if !response.is_success() {
            warn!(status = response.status().as_u16(), "Refresh token rejected");
            return None;
        }

        match response.json::<RefreshResponse>() {
            Ok(parsed) if !parsed.access.is_empty() => Some(parsed.access),
            Ok(_) => {
                warn!("Refresh response carried an empty access token");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse refresh response");
                None
            }
        }
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers
}

/// JSON content type, then caller headers, then the bearer token if any.
/// A stored token always wins over a caller `Authorization`.
fn build_headers(access: Option<&str>, extra: &HeaderMap) -> ApiResult<HeaderMap> {
    let mut headers = json_headers();
    for (name, value) in extra {
        headers.insert(name.clone(), value.clone());
    }
    if let Some(token) = access {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
    }
    Ok(headers)
}
