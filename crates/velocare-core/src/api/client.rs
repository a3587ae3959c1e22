//! Session client for the VeloCare REST API.
//!
//! Every call goes through [`SessionClient::execute`], which attaches the
//! current access token, and on a 401 refreshes the token once and resends
//! the same call once. If that does not work the stored session is cleared
//! and the call fails with [`ClientError::SessionExpired`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::credentials::{
    ErrorDetail, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest,
};
use crate::auth::{CredentialPair, Role, SessionStore};
use crate::config::Config;

use super::error::GENERIC_AUTH_ERROR;
use super::request::{join_url, Attempt, PendingRequest};
use super::{endpoints, ClientError};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("velocare/", env!("CARGO_PKG_VERSION"));

/// API client that owns the login/refresh/logout lifecycle.
/// Clone is cheap; clones share the connection pool and the session store.
#[derive(Clone)]
pub struct SessionClient {
    client: Client,
    api_base_url: String,
    auth_base_url: String,
    store: Arc<dyn SessionStore>,
}

impl SessionClient {
    pub fn builder() -> SessionClientBuilder {
        SessionClientBuilder::default()
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: &Config, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        Self::builder()
            .api_base_url(&config.api_base_url)
            .auth_base_url(&config.auth_base_url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .store(store)
            .build()
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn auth_base_url(&self) -> &str {
        &self.auth_base_url
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Current access token. A store that cannot be read counts as no session.
    pub fn access_token(&self) -> Option<String> {
        match self.store.get() {
            Ok(pair) => pair.and_then(|p| p.access().map(str::to_owned)),
            Err(e) => {
                warn!(error = %e, "Failed to read session, sending without credentials");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    // ===== Requests =====

    /// Send a call relative to the API base URL.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, ClientError> {
        let mut pending = PendingRequest::new(method, path);
        pending.body = body;
        if let Some(headers) = headers {
            pending = pending.headers(headers);
        }
        self.execute(&pending).await
    }

    /// Send a call, recovering once from an expired access token.
    ///
    /// Returns the response for any 2xx status. Other statuses besides 401
    /// come back as [`ClientError::Upstream`] without a retry.
    pub async fn execute(&self, pending: &PendingRequest) -> Result<Response, ClientError> {
        let mut attempt = Attempt::Initial;
        let mut token = self.access_token();

        loop {
            let response = self.send(pending, attempt, token.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Self::check_response(response).await;
            }
            // The stored pair was not used, so there is nothing to refresh
            if pending.headers.contains_key(AUTHORIZATION) {
                debug!(path = %pending.path, "Caller-supplied credential rejected");
                return Self::check_response(response).await;
            }

            match attempt {
                Attempt::Initial => {
                    debug!(path = %pending.path, "Access token rejected, refreshing");
                    attempt = Attempt::Resend;
                    match self.refresh().await {
                        Ok(access) => token = Some(access),
                        Err(e) => {
                            warn!(error = %e, "Token refresh failed");
                            self.expire_session();
                            return Err(ClientError::SessionExpired);
                        }
                    }
                }
                Attempt::Resend => {
                    warn!(path = %pending.path, "Resent request rejected after refresh");
                    self.expire_session();
                    return Err(ClientError::SessionExpired);
                }
            }
        }
    }

    async fn send(
        &self,
        pending: &PendingRequest,
        attempt: Attempt,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let url = pending.url(&self.api_base_url);
        debug!(
            method = %pending.method,
            path = %pending.path,
            attempt = attempt.as_str(),
            authenticated = token.is_some(),
            "Sending request"
        );

        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                ClientError::InvalidRequest("Access token is not a valid header value".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        // Caller headers replace ours
        headers.extend(pending.headers.clone());

        let mut builder = self
            .client
            .request(pending.method.clone(), &url)
            .headers(headers);
        if let Some(ref body) = pending.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Stores and returns the new access token. Fails without a network call
    /// when no refresh token is stored. Does not clear the session on failure;
    /// [`execute`](Self::execute) does that.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let refresh_token = self
            .store
            .get()?
            .and_then(|p| p.refresh().map(str::to_owned))
            .ok_or(ClientError::SessionExpired)?;

        let url = join_url(&self.auth_base_url, endpoints::TOKEN_REFRESH);
        let response = self
            .client
            .post(&url)
            .json(&RefreshRequest {
                refresh: &refresh_token,
            })
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let refreshed: RefreshResponse = response.json().await.map_err(|e| {
            ClientError::InvalidResponse(format!("Failed to parse refresh response: {}", e))
        })?;
        if refreshed.access.is_empty() {
            return Err(ClientError::InvalidResponse(
                "Refresh response has an empty access token".to_string(),
            ));
        }

        self.store_refreshed(&refresh_token, &refreshed);
        info!("Access token refreshed");
        Ok(refreshed.access)
    }

    /// Write the new access token, unless the session changed while the
    /// refresh was in flight (logout, expiry, or a newer login).
    fn store_refreshed(&self, sent_refresh: &str, refreshed: &RefreshResponse) {
        let current = match self.store.get() {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "Failed to re-read session after refresh");
                return;
            }
        };
        let Some(current) = current.filter(|p| p.refresh() == Some(sent_refresh)) else {
            debug!("Session changed during refresh, keeping new token for this call only");
            return;
        };

        let pair = CredentialPair::new(
            refreshed.access.clone(),
            refreshed.refresh.clone().unwrap_or(current.refresh_token),
        );
        // The resend can still use the token even if persisting it failed
        if let Err(e) = self.store.set(&pair) {
            warn!(error = %e, "Failed to store refreshed access token");
        }
    }

    fn expire_session(&self) {
        match self.store.clear() {
            Ok(()) => info!("Session cleared"),
            Err(e) => warn!(error = %e, "Failed to clear session"),
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, &body))
        }
    }

    // ===== Login / registration =====

    /// Log in and store the issued credential pair
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<CredentialPair, ClientError> {
        let url = join_url(&self.auth_base_url, endpoints::login(role));
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let response = Self::check_auth_response(response).await?;

        let login: LoginResponse = response.json().await.map_err(|e| {
            ClientError::InvalidResponse(format!("Failed to parse login response: {}", e))
        })?;
        let pair = CredentialPair::from(login);
        if pair.access().is_none() {
            return Err(ClientError::InvalidResponse(
                "Login response has an empty access token".to_string(),
            ));
        }

        self.store.set(&pair)?;
        info!(role = ?role, "Logged in");
        Ok(pair)
    }

    /// Create an account. Does not log in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
        display_name: &str,
        role: Role,
    ) -> Result<(), ClientError> {
        if password != confirm_password {
            return Err(ClientError::PasswordMismatch);
        }

        let url = join_url(&self.auth_base_url, endpoints::register(role));
        let response = self
            .client
            .post(&url)
            .json(&RegisterRequest::new(email, password, display_name))
            .send()
            .await?;
        Self::check_auth_response(response).await?;

        info!(role = ?role, "Registered account");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }

    /// Like `check_response`, but surfaces the server's `detail` message
    async fn check_auth_response(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorDetail>(&body)
            .map(|d| d.detail)
            .unwrap_or_else(|_| GENERIC_AUTH_ERROR.to_string());
        debug!(status = %status, "Authentication rejected");
        Err(ClientError::Auth(message))
    }

    // ===== Typed helpers =====

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.execute(&PendingRequest::get(path)).await?;
        Self::parse_json(response, path).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.execute(&PendingRequest::post(path).json(body)?).await?;
        Self::parse_json(response, path).await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.execute(&PendingRequest::put(path).json(body)?).await?;
        Self::parse_json(response, path).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.execute(&PendingRequest::delete(path)).await?;
        Ok(())
    }

    /// Parse a JSON body; an empty body parses as `null`
    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ClientError> {
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ClientError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }
}

/// Builder for [`SessionClient`]
#[derive(Default)]
pub struct SessionClientBuilder {
    api_base_url: Option<String>,
    auth_base_url: Option<String>,
    timeout: Option<Duration>,
    store: Option<Arc<dyn SessionStore>>,
}

impl SessionClientBuilder {
    /// Base URL for resource calls made through `request`
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Base URL for login, registration and refresh. Defaults to the API base URL.
    pub fn auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.auth_base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<SessionClient, ClientError> {
        let api_base_url = self
            .api_base_url
            .ok_or_else(|| ClientError::Configuration("api_base_url is required".into()))?;
        let store = self
            .store
            .ok_or_else(|| ClientError::Configuration("a session store is required".into()))?;

        let api_base_url = api_base_url.trim_end_matches('/').to_string();
        let auth_base_url = self
            .auth_base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| api_base_url.clone());

        for url in [&api_base_url, &auth_base_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ClientError::Configuration(format!(
                    "base URL must start with http:// or https://: {}",
                    url
                )));
            }
        }

        let client = Client::builder()
            .timeout(
                self.timeout
                    .unwrap_or(Duration::from_secs(REQUEST_TIMEOUT_SECS)),
            )
            .user_agent(USER_AGENT)
            .build()?;

        Ok(SessionClient {
            client,
            api_base_url,
            auth_base_url,
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemorySessionStore;

    fn memory_store() -> Arc<dyn SessionStore> {
        Arc::new(MemorySessionStore::new())
    }

    #[test]
    fn test_builder_requires_api_base_url() {
        let result = SessionClient::builder().store(memory_store()).build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_builder_requires_store() {
        let result = SessionClient::builder()
            .api_base_url("http://localhost:8000/api/v1/velocare")
            .build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_non_http_url() {
        let result = SessionClient::builder()
            .api_base_url("localhost:8000")
            .store(memory_store())
            .build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_builder_trims_and_defaults_auth_url() {
        let client = SessionClient::builder()
            .api_base_url("http://localhost:8000/api/")
            .store(memory_store())
            .build()
            .unwrap();
        assert_eq!(client.api_base_url(), "http://localhost:8000/api");
        assert_eq!(client.auth_base_url(), "http://localhost:8000/api");
    }

    #[test]
    fn test_is_authenticated_follows_store() {
        let store = Arc::new(MemorySessionStore::new());
        let client = SessionClient::builder()
            .api_base_url("http://localhost:8000")
            .store(store.clone())
            .build()
            .unwrap();
        assert!(!client.is_authenticated());

        store.set(&CredentialPair::new("A1", "R1")).unwrap();
        assert!(client.is_authenticated());
        assert_eq!(client.access_token().as_deref(), Some("A1"));

        client.logout().unwrap();
        assert!(!client.is_authenticated());
    }
}
