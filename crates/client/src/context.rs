//! Application wiring: one session, one API client, one guard.

use std::sync::Arc;

use taskdesk_auth::{
    AuthService, Navigator, NoopStorage, RouteGuard, RouteRequirements, SessionStorage, SessionStore,
};

use crate::client::ApiClient;
use crate::config::ClientConfig;

/// Everything a view layer needs to authenticate and authorize.
#[derive(Clone)]
pub struct AppContext {
    pub session: Arc<SessionStore>,
    pub api: ApiClient,
    pub auth: AuthService,
    pub guard: RouteGuard,
    navigator: Arc<dyn Navigator>,
}

impl AppContext {
    /// Pick durable storage for the current execution context and restore the
    /// session from it.
    pub fn bootstrap(config: ClientConfig, navigator: Arc<dyn Navigator>) -> Self {
        let storage = select_storage(&config);
        Self::with_storage(config, storage, navigator)
    }

    pub fn with_storage(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session = Arc::new(SessionStore::restore(storage, navigator.clone()));
        let api = ApiClient::new(config, session.clone());
        let auth = AuthService::new(session.clone(), Arc::new(api.clone()), Arc::new(api.clone()));

        tracing::info!(
            api_url = api.config().api_url(),
            authenticated = session.is_authenticated(),
            "client context ready"
        );

        Self {
            session,
            api,
            auth,
            guard: RouteGuard::default(),
            navigator,
        }
    }

    /// Run the route guard for `url`, redirecting on denial.
    pub fn can_activate(&self, url: &str, requirements: Option<&RouteRequirements>) -> bool {
        self.guard
            .can_activate(&self.session, self.navigator.as_ref(), url, requirements)
    }
}

impl core::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppContext")
            .field("session", &self.session)
            .field("api", &self.api)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

#[cfg(target_arch = "wasm32")]
fn select_storage(_config: &ClientConfig) -> Arc<dyn SessionStorage> {
    match taskdesk_auth::LocalStorage::detect() {
        Some(storage) => Arc::new(storage),
        None => {
            tracing::warn!("localStorage unavailable; session will not survive a reload");
            Arc::new(NoopStorage)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn select_storage(config: &ClientConfig) -> Arc<dyn SessionStorage> {
    let Some(path) = &config.session_file else {
        return Arc::new(NoopStorage);
    };

    match taskdesk_auth::FileStorage::open(path) {
        Ok(storage) => Arc::new(storage),
        Err(err) => {
            tracing::warn!(error = ?err, "session file unusable; keeping the session in memory only");
            Arc::new(NoopStorage)
        }
    }
}
