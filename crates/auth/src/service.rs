//! Sign-in and profile loading on top of the session store.

use std::sync::Arc;

use taskdesk_core::UserId;

use crate::api::{ApiError, AuthApi, UserProfile, UsersApi};
use crate::{Credentials, SessionStore, TokenResponse, normalize_roles};

/// Drives the network half of the session lifecycle.
///
/// The collaborators are awaited before any session lock is taken, so a slow
/// backend never blocks readers of the session.
#[derive(Clone)]
pub struct AuthService {
    session: Arc<SessionStore>,
    auth_api: Arc<dyn AuthApi>,
    users_api: Arc<dyn UsersApi>,
}

impl AuthService {
    pub fn new(session: Arc<SessionStore>, auth_api: Arc<dyn AuthApi>, users_api: Arc<dyn UsersApi>) -> Self {
        Self {
            session,
            auth_api,
            users_api,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Sign in with `credentials`.
    ///
    /// On success the tokens are stored and roles reset; if the response names
    /// the user, their profile is loaded too (a failed load only leaves the
    /// session without roles). On failure the session is cleared and the
    /// collaborator's error is returned as-is.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, ApiError> {
        let result = match credentials.validate() {
            Ok(()) => self.auth_api.authorize(credentials).await,
            Err(err) => Err(ApiError::from(err)),
        };

        let token = match result {
            Ok(token) => token,
            Err(err) => {
                self.session.clear();
                tracing::info!(login = %credentials.login, status = err.status(), "sign-in failed");
                return Err(err);
            }
        };

        let generation = self.session.begin(&token);
        tracing::info!(login = %credentials.login, "signed in");

        if let Some(user_id) = token.user_id {
            self.session.store_user_id_if_current(generation, user_id);
            self.load_profile(generation, user_id).await;
        }

        Ok(token)
    }

    /// Fetch the profile of `user_id` and adopt its roles.
    ///
    /// Failures are logged and yield `None`; they never reach the caller. If
    /// the session signs out or in again while the request is in flight, the
    /// roles are not applied.
    pub async fn load_user_profile(&self, user_id: UserId) -> Option<UserProfile> {
        let generation = self.session.generation();
        self.load_profile(generation, user_id).await
    }

    async fn load_profile(&self, generation: u64, user_id: UserId) -> Option<UserProfile> {
        match self.users_api.get_profile(user_id).await {
            Ok(profile) => {
                if let Some(entries) = &profile.roles {
                    let roles = normalize_roles(entries);
                    tracing::debug!(%user_id, roles = roles.len(), "profile roles loaded");
                    self.session.replace_roles_if_current(generation, roles);
                }
                Some(profile)
            }
            Err(err) => {
                tracing::error!(%user_id, error = %err, "failed to load user profile");
                None
            }
        }
    }

    pub fn logout(&self) {
        self.session.logout();
    }
}

impl core::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthService")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
