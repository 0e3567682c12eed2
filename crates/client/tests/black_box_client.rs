use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use taskdesk_auth::{ApiError, Credentials, MemoryStorage, RecordingNavigator, RouteRequirements, SessionStorage};
use taskdesk_client::{AppContext, ClientConfig};
use taskdesk_core::{RoleId, UserId};
use taskdesk_observability::LogFormat;

const TOKEN: &str = "tok-1";

/// Authorization headers seen by the fake backend, keyed by path.
#[derive(Clone, Default)]
struct Seen {
    headers: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl Seen {
    fn record(&self, path: &str, headers: &HeaderMap) {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.headers.lock().unwrap().push((path.to_string(), auth));
    }

    fn for_path(&self, path: &str) -> Vec<Option<String>> {
        self.headers
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, a)| a.clone())
            .collect()
    }
}

fn unauthorized(detail: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn sign_in(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    seen.record("/auth/sign-in", &headers);
    if body["login"] == "alice" && body["password"] == "secret" {
        Json(json!({ "access_token": TOKEN, "token_type": "Bearer", "user_id": 7 })).into_response()
    } else if body["login"] == "nobody" {
        // Valid sign-in for an account whose profile lookup is broken.
        Json(json!({ "access_token": TOKEN, "token_type": "Bearer", "user_id": 99 })).into_response()
    } else {
        unauthorized("Incorrect login or password")
    }
}

async fn profile(State(seen): State<Seen>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    seen.record("/users/:id", &headers);
    if !is_authorized(&headers) {
        return unauthorized("Not authenticated");
    }
    match id {
        7 => Json(json!({ "id": 7, "roles": [1, { "id": 2, "name": "manager" }] })).into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": "profile store down" }))).into_response(),
    }
}

async fn roles(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    seen.record("/users/roles", &headers);
    if !is_authorized(&headers) {
        return unauthorized("Not authenticated");
    }
    Json(json!([{ "id": 1, "name": "admin" }, { "id": 2, "name": "manager" }])).into_response()
}

async fn expired(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    seen.record("/tasks", &headers);
    unauthorized("Token expired")
}

struct TestServer {
    base_url: String,
    seen: Seen,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        taskdesk_observability::init_with(LogFormat::Pretty, "taskdesk=debug");

        let seen = Seen::default();
        let app = Router::new()
            .route("/auth/sign-in", post(sign_in))
            .route("/users/roles", get(roles))
            .route("/users/:id", get(profile))
            .route("/tasks", get(expired))
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, seen, handle }
    }

    fn context(&self) -> (AppContext, Arc<MemoryStorage>, Arc<RecordingNavigator>) {
        let storage = Arc::new(MemoryStorage::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let config = ClientConfig::new(&self.base_url).unwrap();
        let ctx = AppContext::with_storage(config, storage.clone(), navigator.clone());
        (ctx, storage, navigator)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn login_loads_roles_and_persists_session() {
    let srv = TestServer::spawn().await;
    let (ctx, storage, _) = srv.context();

    let token = ctx.auth.login(&Credentials::new("alice", "secret")).await.unwrap();

    assert_eq!(token.user_id, Some(UserId::new(7)));
    assert!(ctx.session.is_authenticated());
    assert_eq!(ctx.session.authorization_header().as_deref(), Some("Bearer tok-1"));
    assert!(ctx.session.has_all_roles(&[RoleId::new(1), RoleId::new(2)]));

    assert_eq!(storage.get("access_token").unwrap().as_deref(), Some(TOKEN));
    assert_eq!(storage.get("token_type").unwrap().as_deref(), Some("Bearer"));
    assert_eq!(storage.get("user_roles").unwrap().as_deref(), Some("[1,2]"));
    assert_eq!(storage.get("user_id").unwrap().as_deref(), Some("7"));

    // The profile call carried the new credential.
    assert_eq!(srv.seen.for_path("/users/:id"), vec![Some("Bearer tok-1".to_string())]);
}

#[tokio::test]
async fn sign_in_never_carries_a_credential() {
    let srv = TestServer::spawn().await;
    let (ctx, _, _) = srv.context();

    ctx.auth.login(&Credentials::new("alice", "secret")).await.unwrap();
    // Signing in again while a session exists.
    ctx.auth.login(&Credentials::new("alice", "secret")).await.unwrap();

    assert_eq!(srv.seen.for_path("/auth/sign-in"), vec![None, None]);
}

#[tokio::test]
async fn rejected_login_surfaces_detail_and_leaves_session_clean() {
    let srv = TestServer::spawn().await;
    let (ctx, storage, navigator) = srv.context();

    let err = ctx.auth.login(&Credentials::new("alice", "wrong")).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Status {
            status: 401,
            detail: Some("Incorrect login or password".to_string())
        }
    );
    assert_eq!(err.user_message(), "Invalid login or password");
    assert!(!ctx.session.is_authenticated());
    assert!(storage.entries().is_empty());
    assert!(navigator.history().is_empty());
}

#[tokio::test]
async fn profile_failure_during_login_keeps_user_signed_in_without_roles() {
    let srv = TestServer::spawn().await;
    let (ctx, _, _) = srv.context();

    ctx.auth.login(&Credentials::new("nobody", "secret")).await.unwrap();

    assert!(ctx.session.is_authenticated());
    assert!(ctx.session.roles().is_empty());
    assert_eq!(ctx.session.user_id(), Some(UserId::new(99)));
}

#[tokio::test]
async fn unauthorized_response_tears_down_session_and_returns_error() {
    let srv = TestServer::spawn().await;
    let (ctx, storage, navigator) = srv.context();
    ctx.auth.login(&Credentials::new("alice", "secret")).await.unwrap();

    let err = ctx.api.get_json::<Value>("/tasks").await.unwrap_err();

    assert_eq!(err.status(), 401);
    assert_eq!(
        err,
        ApiError::Status {
            status: 401,
            detail: Some("Token expired".to_string())
        }
    );
    assert!(!ctx.session.is_authenticated());
    assert!(ctx.session.roles().is_empty());
    assert!(storage.entries().is_empty());
    assert_eq!(navigator.last().unwrap().path, "/auth");
    assert_eq!(srv.seen.for_path("/tasks"), vec![Some("Bearer tok-1".to_string())]);
}

#[tokio::test]
async fn authenticated_calls_use_the_session_credential() {
    let srv = TestServer::spawn().await;
    let (ctx, _, _) = srv.context();
    ctx.auth.login(&Credentials::new("alice", "secret")).await.unwrap();

    let roles = ctx.api.list_roles().await.unwrap();

    assert_eq!(roles.len(), 2);
    assert_eq!(roles[1].id, RoleId::new(2));
    assert_eq!(roles[1].name.as_deref(), Some("manager"));
}

#[tokio::test]
async fn anonymous_calls_go_out_without_credential() {
    let srv = TestServer::spawn().await;
    let (ctx, _, navigator) = srv.context();

    let err = ctx.api.list_roles().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(srv.seen.for_path("/users/roles"), vec![None]);
    // Teardown still runs (and redirects) even with nothing to clear.
    assert_eq!(navigator.last().unwrap().path, "/auth");
}

#[tokio::test]
async fn guard_follows_session_lifecycle() {
    let srv = TestServer::spawn().await;
    let (ctx, _, navigator) = srv.context();
    let managers = RouteRequirements::any([RoleId::new(2)]);
    let admins_and_auditors = RouteRequirements::all([RoleId::new(1), RoleId::new(5)]);

    assert!(!ctx.can_activate("/reports", Some(&managers)));
    assert_eq!(navigator.last().unwrap().query_param("returnUrl"), Some("/reports"));

    ctx.auth.login(&Credentials::new("alice", "secret")).await.unwrap();
    assert!(ctx.can_activate("/reports", Some(&managers)));
    assert!(!ctx.can_activate("/audit", Some(&admins_and_auditors)));
    assert_eq!(navigator.last().unwrap().path, "/");

    ctx.auth.logout();
    assert!(!ctx.can_activate("/reports", None));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let storage = Arc::new(MemoryStorage::new());
    let config = ClientConfig::new(&format!("http://{}", addr)).unwrap();
    let ctx = AppContext::with_storage(config, storage, Arc::new(RecordingNavigator::new()));

    let err = ctx.auth.login(&Credentials::new("alice", "secret")).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.status(), 0);
    assert_eq!(err.user_message(), "Unable to reach the server. Check your connection.");
    assert!(!ctx.session.is_authenticated());
}
