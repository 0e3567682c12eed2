//! Router collaborator.

use std::sync::Mutex;

/// Navigation target: a path plus optional query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Navigation {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Router hook used for redirects (logout, guard denials).
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: Navigation);
}

/// Navigator that only records requested navigations.
///
/// Test double: keeps every navigation for inspection and never trims its
/// history, so it is not meant for long-running processes.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Navigation> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.history.lock().ok().and_then(|h| h.last().cloned())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: Navigation) {
        tracing::debug!(path = %target.path, "navigate");

        // If the lock is poisoned the navigation is simply not recorded.
        if let Ok(mut history) = self.history.lock() {
            history.push(target);
        }
    }
}
