//! Contracts for the network collaborators the session layer depends on.
//!
//! The concrete HTTP implementations live in `taskdesk-client`; tests plug in
//! in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use taskdesk_core::{DomainError, UserId};

use crate::{Credentials, RoleEntry, TokenResponse};

/// Failure of a backend call.
///
/// Variants mirror what a caller can react to: the server answered with an
/// error status, the server could not be reached, or the answer was unreadable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Request rejected locally before any network traffic.
    #[error("invalid request: {0}")]
    Invalid(#[from] DomainError),

    /// The server answered with a non-success status.
    #[error("server responded with status {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    /// No response at all (connection refused, DNS, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// A response arrived but its body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl ApiError {
    /// HTTP-style status; `0` when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Status { status, .. } => *status,
            _ => 0,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == 401
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Message suitable for showing next to the sign-in form.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Invalid(err) => err.message().to_string(),
            ApiError::Transport(_) => "Unable to reach the server. Check your connection.".to_string(),
            ApiError::Status { status: 401 | 403, .. } => "Invalid login or password".to_string(),
            ApiError::Status { status, detail } if (400..500).contains(status) => detail
                .clone()
                .unwrap_or_else(|| "The request was rejected".to_string()),
            ApiError::Status { .. } | ApiError::Decode(_) => {
                "The server encountered an error. Please try again later.".to_string()
            }
        }
    }
}

/// Profile returned by `GET /users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<UserId>,

    /// Absent when the backend omits role information.
    #[serde(default)]
    pub roles: Option<Vec<RoleEntry>>,
}

/// Bounds shared by the collaborator traits.
///
/// Native clients share collaborators across threads. Browser futures (and
/// the JS handles behind them) are not `Send`, so `wasm32` drops the bound.
#[cfg(not(target_arch = "wasm32"))]
pub trait CollaboratorBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> CollaboratorBounds for T {}

#[cfg(target_arch = "wasm32")]
pub trait CollaboratorBounds {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> CollaboratorBounds for T {}

/// Authentication collaborator (sign-in).
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AuthApi: CollaboratorBounds {
    async fn authorize(&self, credentials: &Credentials) -> Result<TokenResponse, ApiError>;
}

/// Users collaborator (profile lookup).
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait UsersApi: CollaboratorBounds {
    async fn get_profile(&self, user_id: UserId) -> Result<UserProfile, ApiError>;
}
