//! `taskdesk-auth` — client-side session and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP: the network collaborators
//! are traits ([`AuthApi`], [`UsersApi`]) and durable storage is a capability
//! ([`SessionStorage`]) chosen by the embedding application.

pub mod api;
pub mod credentials;
pub mod guard;
pub mod navigation;
pub mod roles;
pub mod service;
pub mod session;
pub mod storage;

pub use api::{ApiError, AuthApi, UserProfile, UsersApi};
pub use credentials::{Credentials, TokenResponse};
pub use guard::{GuardDecision, RouteGuard, RouteRequirements};
pub use navigation::{Navigation, Navigator, RecordingNavigator};
pub use roles::{RoleEntry, RoleSet, normalize_roles};
pub use service::AuthService;
pub use session::{Session, SessionStore};
pub use storage::{FileStorage, MemoryStorage, NoopStorage, SessionStorage, StorageError};

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
