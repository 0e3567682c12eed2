//! Route guard: decides whether a protected view may be entered.
//!
//! - No IO
//! - No panics
//! - Only side effect is the redirect applied by [`RouteGuard::can_activate`]

use serde::{Deserialize, Serialize};

use taskdesk_core::RoleId;

use crate::navigation::{Navigation, Navigator};
use crate::session::DEFAULT_AUTH_PATH;
use crate::SessionStore;

/// Default landing path for signed-in users lacking privileges.
pub const DEFAULT_HOME_PATH: &str = "/";

/// Query parameter carrying the originally requested location.
pub const RETURN_URL_PARAM: &str = "returnUrl";

/// Per-route role requirements (route metadata).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequirements {
    #[serde(default)]
    pub required_roles: Vec<RoleId>,

    /// `true`: every role is needed. `false`: any one of them suffices.
    #[serde(default)]
    pub require_all_roles: bool,
}

impl RouteRequirements {
    /// Any one of `roles` grants entry.
    pub fn any(roles: impl IntoIterator<Item = RoleId>) -> Self {
        Self {
            required_roles: roles.into_iter().collect(),
            require_all_roles: false,
        }
    }

    /// All of `roles` are needed for entry.
    pub fn all(roles: impl IntoIterator<Item = RoleId>) -> Self {
        Self {
            required_roles: roles.into_iter().collect(),
            require_all_roles: true,
        }
    }

    fn is_satisfied_by(&self, session: &SessionStore) -> bool {
        if self.required_roles.is_empty() {
            return true;
        }
        if self.require_all_roles {
            session.has_all_roles(&self.required_roles)
        } else {
            session.has_any_role(&self.required_roles)
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,

    /// Not signed in; come back to `return_url` after sign-in.
    RedirectToAuth { return_url: String },

    /// Signed in but under-privileged.
    RedirectHome,
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Guard for protected views.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    auth_path: String,
    home_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            auth_path: DEFAULT_AUTH_PATH.to_string(),
            home_path: DEFAULT_HOME_PATH.to_string(),
        }
    }
}

impl RouteGuard {
    pub fn new(auth_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            auth_path: auth_path.into(),
            home_path: home_path.into(),
        }
    }

    /// Decide whether `requested_url` may be entered, without side effects.
    pub fn check(
        &self,
        session: &SessionStore,
        requested_url: &str,
        requirements: Option<&RouteRequirements>,
    ) -> GuardDecision {
        if !session.is_authenticated() {
            return GuardDecision::RedirectToAuth {
                return_url: requested_url.to_string(),
            };
        }

        match requirements {
            Some(req) if !req.is_satisfied_by(session) => GuardDecision::RedirectHome,
            _ => GuardDecision::Allow,
        }
    }

    /// Check and, on denial, redirect through `navigator`.
    pub fn can_activate(
        &self,
        session: &SessionStore,
        navigator: &dyn Navigator,
        requested_url: &str,
        requirements: Option<&RouteRequirements>,
    ) -> bool {
        let decision = self.check(session, requested_url, requirements);
        if let Some(target) = self.redirect_for(&decision) {
            tracing::debug!(requested_url, redirect = %target.path, "route guard denied entry");
            navigator.navigate(target);
        }
        decision.is_allowed()
    }

    /// Navigation implied by a denial; `None` for [`GuardDecision::Allow`].
    pub fn redirect_for(&self, decision: &GuardDecision) -> Option<Navigation> {
        match decision {
            GuardDecision::Allow => None,
            GuardDecision::RedirectToAuth { return_url } => {
                Some(Navigation::to(self.auth_path.clone()).with_query(RETURN_URL_PARAM, return_url.clone()))
            }
            GuardDecision::RedirectHome => Some(Navigation::to(self.home_path.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::navigation::RecordingNavigator;
    use crate::storage::MemoryStorage;
    use crate::{RoleSet, TokenResponse};

    fn ids(raw: &[i64]) -> Vec<RoleId> {
        raw.iter().copied().map(RoleId::new).collect()
    }

    fn anonymous() -> SessionStore {
        SessionStore::restore(Arc::new(MemoryStorage::new()), Arc::new(RecordingNavigator::new()))
    }

    fn signed_in(roles: RoleSet) -> SessionStore {
        let session = anonymous();
        session.begin(&TokenResponse {
            access_token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            user_id: None,
        });
        session.replace_roles(roles);
        session
    }

    #[test]
    fn anonymous_user_is_sent_to_auth_with_return_url() {
        let guard = RouteGuard::default();
        let navigator = RecordingNavigator::new();

        let allowed = guard.can_activate(&anonymous(), &navigator, "/tasks/12?tab=comments", None);

        assert!(!allowed);
        let nav = navigator.last().unwrap();
        assert_eq!(nav.path, "/auth");
        assert_eq!(nav.query_param(RETURN_URL_PARAM), Some("/tasks/12?tab=comments"));
    }

    #[test]
    fn authenticated_user_without_requirements_is_allowed() {
        let guard = RouteGuard::default();
        let navigator = RecordingNavigator::new();

        assert!(guard.can_activate(&signed_in(RoleSet::new()), &navigator, "/dashboard", None));
        assert!(navigator.history().is_empty());
    }

    #[test]
    fn empty_required_roles_means_no_restriction() {
        let guard = RouteGuard::default();
        let req = RouteRequirements::all(Vec::new());

        assert_eq!(guard.check(&signed_in(RoleSet::new()), "/x", Some(&req)), GuardDecision::Allow);
    }

    #[test]
    fn missing_role_redirects_home_without_return_url() {
        let guard = RouteGuard::default();
        let navigator = RecordingNavigator::new();
        let req = RouteRequirements::any(ids(&[4, 5]));

        let allowed = guard.can_activate(&signed_in(RoleSet::from([1, 2, 3])), &navigator, "/admin", Some(&req));

        assert!(!allowed);
        assert_eq!(navigator.last(), Some(Navigation::to("/")));
    }

    #[test]
    fn any_versus_all_requirements() {
        let guard = RouteGuard::default();
        let session = signed_in(RoleSet::from([1, 2, 3]));

        let any = RouteRequirements::any(ids(&[4, 2]));
        let all_ok = RouteRequirements::all(ids(&[1, 2]));
        let all_missing = RouteRequirements::all(ids(&[1, 4]));

        assert!(guard.check(&session, "/r", Some(&any)).is_allowed());
        assert!(guard.check(&session, "/r", Some(&all_ok)).is_allowed());
        assert_eq!(guard.check(&session, "/r", Some(&all_missing)), GuardDecision::RedirectHome);
    }

    #[test]
    fn custom_paths_are_honoured() {
        let guard = RouteGuard::new("/login", "/home");
        let navigator = RecordingNavigator::new();

        guard.can_activate(&anonymous(), &navigator, "/a", None);
        let req = RouteRequirements::any(ids(&[1]));
        guard.can_activate(&signed_in(RoleSet::new()), &navigator, "/b", Some(&req));

        let history = navigator.history();
        assert_eq!(history[0].path, "/login");
        assert_eq!(history[1].path, "/home");
    }

    #[test]
    fn requirements_deserialize_from_route_metadata() {
        let req: RouteRequirements =
            serde_json::from_str(r#"{"requiredRoles":[1,2],"requireAllRoles":true}"#).unwrap();
        assert_eq!(req, RouteRequirements::all(ids(&[1, 2])));

        let req: RouteRequirements = serde_json::from_str("{}").unwrap();
        assert_eq!(req, RouteRequirements::default());
    }
}
