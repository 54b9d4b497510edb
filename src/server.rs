//!
//! sessiongate HTTP server
//! -----------------------
//! Axum routes over the auth gateway.
//!
//! Responsibilities:
//! - Cookie transport for sessions held in a `SessionStore`.
//! - Login/logout/me/switch-user JSON endpoints.
//! - Login and dashboard pages, the latter behind the `Authenticated` guard.
//! - Static assets under `/public`.
//! - Background sweeping of expired sessions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{AuthGateway, IdentityProvider, MemorySessionStore, SessionStore, StaticIdentityProvider};

pub mod extract;
pub mod pages;

use extract::{Authenticated, CurrentSession, LenientBody, clear_session_cookie, session_cookie};
use pages::Page;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: AuthGateway,
    pub sessions: Arc<dyn SessionStore>,
    pub public_dir: Arc<PathBuf>,
    pub secure_cookie: bool,
}

impl AppState {
    pub fn new(gateway: AuthGateway, sessions: Arc<dyn SessionStore>) -> Self {
        Self { gateway, sessions, public_dir: Arc::new(PathBuf::from("public")), secure_cookie: false }
    }

    pub fn with_public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = Arc::new(dir.into());
        self
    }

    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page))
        .route("/dashboard", get(dashboard_page))
        .route("/api/login", post(api_login))
        .route("/api/logout", post(api_logout))
        .route("/api/me", get(api_me))
        .route("/api/switch-user", post(api_switch_user))
        .route("/public/{*path}", get(public_asset))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

fn log_startup(config: &ServerConfig) {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "startup",
        "sessiongate starting: RUST_LOG='{}', bind={}, public_dir='{}', users_file={:?}, session_ttl_secs={}, sweep_interval_secs={}, secure_cookie={}",
        rust_log,
        config.bind_addr(),
        config.public_dir.display(),
        config.users_file,
        config.session_ttl.as_secs(),
        config.sweep_interval.as_secs(),
        config.secure_cookie
    );
}

/// Build state from configuration, bind, and serve until ctrl-c.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    log_startup(&config);

    let identities: Arc<dyn IdentityProvider> = match &config.users_file {
        Some(path) => Arc::new(StaticIdentityProvider::from_json_file(path)?),
        None => {
            info!(target: "startup", "no users file configured, using built-in demo identities");
            Arc::new(StaticIdentityProvider::demo())
        }
    };
    let store = MemorySessionStore::new(config.session_ttl);
    info!(target: "session", ttl_secs = store.ttl().as_secs(), "in-memory session store ready");
    let sessions: Arc<dyn SessionStore> = Arc::new(store);
    spawn_session_sweeper(sessions.clone(), config.sweep_interval);

    let state = AppState::new(AuthGateway::new(identities), sessions)
        .with_public_dir(config.public_dir.clone())
        .with_secure_cookie(config.secure_cookie);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;
    info!(target: "startup", "Login:   http://{}/login", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    info!(target: "startup", "sessiongate stopped");
    Ok(())
}

/// Serve on an already bound listener. Used by tests and embedders.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "startup", "failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!(target: "startup", "shutdown requested");
}

/// Periodically drop expired sessions. A zero interval disables the task.
pub fn spawn_session_sweeper(sessions: Arc<dyn SessionStore>, interval: Duration) -> Option<tokio::task::JoinHandle<()>> {
    if interval.is_zero() {
        info!(target: "session", "session sweeper disabled");
        return None;
    }
    Some(tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = sessions.sweep_expired();
            if removed > 0 { debug!(target: "session", removed = removed, "session_sweep"); }
        }
    }))
}

#[derive(Debug, Default, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    username: Option<String>,
    #[serde(default, alias = "password")]
    credential: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SwitchPayload {
    #[serde(default)]
    username: Option<String>,
}

async fn home(current: CurrentSession) -> Redirect {
    if current.session.is_authenticated() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

async fn login_page(State(state): State<AppState>) -> AppResult<Html<String>> {
    pages::render_page(&state.public_dir, Page::Login).await
}

async fn dashboard_page(State(state): State<AppState>, _auth: Authenticated) -> AppResult<Html<String>> {
    pages::render_page(&state.public_dir, Page::Dashboard).await
}

async fn public_asset(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Response> {
    pages::serve_asset(&state.public_dir, &path).await
}

async fn api_login(
    State(state): State<AppState>,
    current: CurrentSession,
    LenientBody(payload): LenientBody<LoginPayload>,
) -> AppResult<impl IntoResponse> {
    // Missing fields match no identity and fail as an ordinary invalid login
    let username = payload.username.unwrap_or_default();
    let credential = payload.credential.unwrap_or_default();

    let mut session = current.session;
    let principal = state.gateway.login(&mut session, &username, &credential)?;

    // Fresh id on every successful login; the old one, if any, is dropped.
    let sid = state.sessions.create(session)?;
    if let Some(old) = &current.id {
        state.sessions.destroy(old);
    }
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, session_cookie(&sid, state.secure_cookie)?);
    Ok((headers, Json(json!({"ok": true, "user": principal}))))
}

async fn api_logout(State(state): State<AppState>, current: CurrentSession) -> impl IntoResponse {
    if let Some(sid) = &current.id {
        let mut session = current.session;
        state.gateway.logout(&mut session);
        state.sessions.destroy(sid);
    }
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, clear_session_cookie(state.secure_cookie));
    (headers, Json(json!({"ok": true})))
}

async fn api_me(State(state): State<AppState>, current: CurrentSession) -> Json<serde_json::Value> {
    Json(json!({"user": state.gateway.current_principal(&current.session)}))
}

async fn api_switch_user(
    State(state): State<AppState>,
    auth: Authenticated,
    LenientBody(payload): LenientBody<SwitchPayload>,
) -> AppResult<Json<serde_json::Value>> {
    let target = payload.username.unwrap_or_default();
    let mut session = auth.session;
    let principal = state.gateway.switch_identity(&mut session, &auth.principal, &target)?;
    if !state.sessions.save(&auth.id, session) {
        // Expired between the guard and now
        return Err(AppError::unauthenticated());
    }
    Ok(Json(json!({"ok": true, "user": principal})))
}
