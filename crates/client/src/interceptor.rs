//! Outbound request augmenter.
//!
//! Attaches the session's bearer credential to API calls and tears the session
//! down when the backend answers 401. Sign-in style endpoints are left alone
//! so a stale credential can never mask the real sign-in error.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Url};

use taskdesk_auth::{ApiError, SessionStore};

/// Paths that are called without credentials and never trigger teardown.
pub const UNAUTHENTICATED_ENDPOINTS: [&str; 3] = ["/auth/sign-in", "/auth/sign-up", "/auth/telegram"];

pub fn is_auth_endpoint(url: &Url) -> bool {
    let path = url.path();
    UNAUTHENTICATED_ENDPOINTS.iter().any(|p| path.contains(p))
}

#[derive(Debug, Clone)]
pub struct AuthInterceptor {
    session: Arc<SessionStore>,
}

impl AuthInterceptor {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Set `Authorization` on `request` when a session exists.
    ///
    /// The request is taken by value and handed back; callers never see a
    /// half-modified request.
    pub fn augment(&self, mut request: Request) -> Request {
        if is_auth_endpoint(request.url()) {
            return request;
        }

        let Some(header) = self.session.authorization_header() else {
            return request;
        };

        match HeaderValue::from_str(&header) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!(url = %request.url(), "stored credential is not a valid header value; sending request without it");
            }
        }

        request
    }

    /// React to a failed call to `url`. The error itself is left for the caller.
    pub fn observe(&self, url: &Url, error: &ApiError) {
        if error.is_unauthorized() && !is_auth_endpoint(url) {
            tracing::warn!(url = %url, "request unauthorized; ending session");
            self.session.logout();
        }
    }
}
