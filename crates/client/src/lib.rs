//! `taskdesk-client`
//!
//! **Responsibility:** talking to the taskdesk REST backend on behalf of a
//! signed-in user.
//!
//! This crate provides:
//! - A typed API client (`reqwest`) whose calls all pass the auth interceptor
//! - The interceptor itself (bearer header, 401 teardown)
//! - Environment configuration
//! - [`AppContext`], which wires session, client, auth service and route guard

pub mod client;
pub mod config;
pub mod context;
pub mod interceptor;

pub use client::{ApiClient, RoleRecord};
pub use config::{ClientConfig, ConfigError};
pub use context::AppContext;
pub use interceptor::{AuthInterceptor, UNAUTHENTICATED_ENDPOINTS, is_auth_endpoint};
