use serde::{Deserialize, Serialize};

use taskdesk_core::{DomainError, DomainResult, UserId};

/// Sign-in form payload (`POST /auth/sign-in`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Both fields are required; whitespace-only counts as missing.
    pub fn validate(&self) -> DomainResult<()> {
        if self.login.trim().is_empty() {
            return Err(DomainError::validation("Login is required"));
        }
        if self.password.trim().is_empty() {
            return Err(DomainError::validation("Password is required"));
        }
        Ok(())
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful sign-in response.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Scheme prefix for the `Authorization` header, e.g. `Bearer`.
    pub token_type: String,

    /// Some backends include the account id; when present it drives the
    /// profile (role) load right after sign-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl core::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("user_id", &self.user_id)
            .finish()
    }
}
