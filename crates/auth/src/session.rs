//! Process-wide session state with write-through durable storage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use taskdesk_core::{RoleId, UserId};

use crate::navigation::{Navigation, Navigator};
use crate::storage::{
    ACCESS_TOKEN_KEY, SESSION_KEYS, SessionStorage, TOKEN_TYPE_KEY, USER_ID_KEY, USER_ROLES_KEY,
};
use crate::{RoleSet, TokenResponse};

/// Default path of the sign-in view.
pub const DEFAULT_AUTH_PATH: &str = "/auth";

/// Snapshot of the authentication state.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub user_id: Option<UserId>,
    pub roles: RoleSet,
}

impl Session {
    /// Authenticated iff both the token and its scheme are present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.token_type.is_some()
    }

    /// `"{token_type} {access_token}"`, only when both are present.
    pub fn authorization_header(&self) -> Option<String> {
        match (&self.token_type, &self.access_token) {
            (Some(token_type), Some(token)) => Some(format!("{token_type} {token}")),
            _ => None,
        }
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("user_id", &self.user_id)
            .field("roles", &self.roles)
            .finish()
    }
}

/// Single source of truth for who is signed in and with which roles.
///
/// All four session fields sit behind one lock; every mutation updates memory
/// and durable storage under that lock, so readers never observe the two out
/// of step.
///
/// A generation counter advances on every sign-in and sign-out (under the
/// write lock). Commits that were prepared across an `.await` carry the
/// generation they started in and are dropped if it has moved on.
pub struct SessionStore {
    state: RwLock<Session>,
    generation: AtomicU64,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    auth_path: String,
}

impl SessionStore {
    /// Seed the session from durable storage.
    ///
    /// Unreadable or malformed entries are treated as absent; a corrupt store
    /// degrades to an anonymous session instead of failing startup.
    pub fn restore(storage: Arc<dyn SessionStorage>, navigator: Arc<dyn Navigator>) -> Self {
        let read = |key: &str| match storage.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read session storage");
                None
            }
        };

        let session = Session {
            access_token: read(ACCESS_TOKEN_KEY),
            token_type: read(TOKEN_TYPE_KEY),
            user_id: read(USER_ID_KEY).and_then(|raw| raw.parse().ok()),
            roles: read(USER_ROLES_KEY)
                .map(|raw| RoleSet::from_json_lossy(&raw))
                .unwrap_or_default(),
        };

        tracing::debug!(
            authenticated = session.is_authenticated(),
            roles = session.roles.len(),
            "session restored"
        );

        Self {
            state: RwLock::new(session),
            generation: AtomicU64::new(0),
            storage,
            navigator,
            auth_path: DEFAULT_AUTH_PATH.to_string(),
        }
    }

    /// Override the view `logout` redirects to.
    pub fn with_auth_path(mut self, auth_path: impl Into<String>) -> Self {
        self.auth_path = auth_path.into();
        self
    }

    pub fn auth_path(&self) -> &str {
        &self.auth_path
    }

    /// Current session generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn token_type(&self) -> Option<String> {
        self.read().token_type.clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.read().user_id
    }

    pub fn roles(&self) -> RoleSet {
        self.read().roles.clone()
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.read().authorization_header()
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.read().roles.contains(role)
    }

    pub fn has_any_role(&self, roles: &[RoleId]) -> bool {
        self.read().roles.contains_any(roles)
    }

    pub fn has_all_roles(&self, roles: &[RoleId]) -> bool {
        self.read().roles.contains_all(roles)
    }

    /// Persist the numeric user id. Roles are left untouched.
    pub fn store_user_id(&self, user_id: UserId) {
        let mut state = self.write();
        state.user_id = Some(user_id);
        self.persist(USER_ID_KEY, Some(&user_id.to_string()));
    }

    /// Clear the session and send the user back to the sign-in view.
    pub fn logout(&self) {
        self.clear();
        tracing::info!("signed out");
        self.navigator.navigate(Navigation::to(self.auth_path.clone()));
    }

    /// Record freshly issued tokens. Roles start empty until a profile load.
    ///
    /// Returns the generation of the new session.
    pub(crate) fn begin(&self, token: &TokenResponse) -> u64 {
        let mut state = self.write();
        state.access_token = Some(token.access_token.clone());
        state.token_type = Some(token.token_type.clone());
        state.roles = RoleSet::new();
        self.persist(ACCESS_TOKEN_KEY, Some(&token.access_token));
        self.persist(TOKEN_TYPE_KEY, Some(&token.token_type));
        self.persist(USER_ROLES_KEY, Some(&state.roles.to_json()));
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Store `user_id` unless the session changed since `generation`.
    pub(crate) fn store_user_id_if_current(&self, generation: u64, user_id: UserId) -> bool {
        let mut state = self.write();
        if self.generation() != generation {
            tracing::debug!(%user_id, generation, "session changed; user id not stored");
            return false;
        }
        state.user_id = Some(user_id);
        self.persist(USER_ID_KEY, Some(&user_id.to_string()));
        true
    }

    /// Replace the role set unless the session changed since `generation`.
    pub(crate) fn replace_roles_if_current(&self, generation: u64, roles: RoleSet) -> bool {
        let mut state = self.write();
        if self.generation() != generation {
            tracing::debug!(generation, "session changed; profile roles discarded");
            return false;
        }
        self.persist(USER_ROLES_KEY, Some(&roles.to_json()));
        state.roles = roles;
        true
    }

    #[cfg(test)]
    pub(crate) fn replace_roles(&self, roles: RoleSet) {
        self.replace_roles_if_current(self.generation(), roles);
    }

    /// Drop every session field from memory and storage (no navigation).
    pub(crate) fn clear(&self) {
        let mut state = self.write();
        *state = Session::default();
        for key in SESSION_KEYS {
            self.persist(key, None);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Storage failures are logged; the in-memory session stays authoritative.
    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(err) = result {
            tracing::warn!(key, error = %err, "failed to write session storage");
        }
    }

    // Writers always leave the state whole, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.read())
            .field("auth_path", &self.auth_path)
            .finish_non_exhaustive()
    }
}
