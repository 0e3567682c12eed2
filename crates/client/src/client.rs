//! REST client for the taskdesk backend.
//!
//! Every call goes through [`ApiClient::execute`], which applies the
//! [`AuthInterceptor`] on the way out and on the way back.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use taskdesk_auth::{ApiError, AuthApi, Credentials, SessionStore, TokenResponse, UserProfile, UsersApi};
use taskdesk_core::{DomainError, RoleId, UserId};

use crate::config::ClientConfig;
use crate::interceptor::AuthInterceptor;

pub const SIGN_IN_PATH: &str = "/auth/sign-in";
pub const ROLES_PATH: &str = "/users/roles";

/// Role as listed by `GET /users/roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    config: ClientConfig,
    interceptor: AuthInterceptor,
}

/// Cheaply cloneable handle to the backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> Self {
        Self::with_http_client(reqwest::Client::new(), config, session)
    }

    pub fn with_http_client(http: reqwest::Client, config: ClientConfig, session: Arc<SessionStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                config,
                interceptor: AuthInterceptor::new(session),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.inner.interceptor.session()
    }

    /// Start a request to an API path; finish it with [`ApiClient::execute`].
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner.http.request(method, self.inner.config.endpoint(path))
    }

    /// Send a request through the interceptor.
    ///
    /// Non-2xx answers become [`ApiError::Status`]; a 401 additionally ends the
    /// session before the error is returned.
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder
            .build()
            .map_err(|e| ApiError::Invalid(DomainError::validation(e.to_string())))?;
        let request = self.inner.interceptor.augment(request);

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(%method, %url, "api request");

        let error = match self.inner.http.execute(request).await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => error_from_response(response).await,
            Err(err) => ApiError::Transport(err.to_string()),
        };

        tracing::debug!(%method, %url, status = error.status(), "api request failed");
        self.inner.interceptor.observe(&url, &error);
        Err(error)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(self.request(Method::POST, path).json(body)).await?;
        decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// `POST /auth/sign-in`.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<TokenResponse, ApiError> {
        self.post_json(SIGN_IN_PATH, credentials).await
    }

    /// `GET /users/{id}`.
    pub async fn user_profile(&self, user_id: UserId) -> Result<UserProfile, ApiError> {
        self.get_json(&format!("/users/{user_id}")).await
    }

    /// `GET /users/roles`.
    pub async fn list_roles(&self) -> Result<Vec<RoleRecord>, ApiError> {
        self.get_json(ROLES_PATH).await
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AuthApi for ApiClient {
    async fn authorize(&self, credentials: &Credentials) -> Result<TokenResponse, ApiError> {
        self.sign_in(credentials).await
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl UsersApi for ApiClient {
    async fn get_profile(&self, user_id: UserId) -> Result<UserProfile, ApiError> {
        self.user_profile(user_id).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::Status {
        status,
        detail: error_detail(&body),
    }
}

/// Extract `detail` from a JSON error body (`{"detail": ...}`).
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}
