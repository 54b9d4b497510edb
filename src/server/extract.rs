//! Request extractors: cookie-backed session lookup, the authentication guard,
//! and body extractors that accept JSON or urlencoded forms.

use std::convert::Infallible;

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::{Form, Json};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;
use crate::identity::{Principal, Session, SessionId, require_authenticated};

use super::AppState;

pub const SESSION_COOKIE: &str = "sessiongate_sid";

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(COOKIE).iter() {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name && !v.is_empty() { return Some(v.to_string()); }
            }
        }
    }
    None
}

pub fn session_cookie(sid: &SessionId, secure: bool) -> Result<HeaderValue, AppError> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Lax; Path=/{}", SESSION_COOKIE, sid.as_str(), secure))
        .map_err(|e| AppError::internal("cookie_encode", e.to_string()))
}

pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    let value = format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; SameSite=Lax; Path=/{}",
        SESSION_COOKIE,
        if secure { "; Secure" } else { "" }
    );
    // Built only from constant text
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("sessiongate_sid=deleted; Max-Age=0; Path=/"))
}

/// The caller's session as the store sees it. `id` is `None` for anonymous
/// visitors and for cookies whose session is unknown or expired.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: Option<SessionId>,
    pub session: Session,
}

impl CurrentSession {
    pub fn from_headers(state: &AppState, headers: &HeaderMap) -> Self {
        let Some(sid) = parse_cookie(headers, SESSION_COOKIE).map(SessionId::from) else {
            return Self { id: None, session: Session::anonymous() };
        };
        match state.sessions.load(&sid) {
            Some(session) => Self { id: Some(sid), session },
            None => Self { id: None, session: Session::anonymous() },
        }
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(state, &parts.headers))
    }
}

/// Guard extractor: rejects with `401 Not logged in` before the handler runs
/// unless the session carries a principal.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub id: SessionId,
    pub session: Session,
    pub principal: Principal,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentSession::from_headers(state, &parts.headers);
        let principal = require_authenticated(&current.session)?.clone();
        let Some(id) = current.id else { return Err(AppError::unauthenticated()) };
        Ok(Self { id, session: current.session, principal })
    }
}

/// Deserializes the body as `application/x-www-form-urlencoded` when the request
/// says so, and as JSON otherwise.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::user("bad_request", e.body_text()))?;
            Ok(JsonOrForm(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::user("bad_request", e.body_text()))?;
            Ok(JsonOrForm(value))
        }
    }
}

/// Like `JsonOrForm`, but never rejects: a missing or unreadable body yields
/// `T::default()` so the handler still decides the outcome.
#[derive(Debug, Clone, Default)]
pub struct LenientBody<T>(pub T);

impl<S, T> FromRequest<S> for LenientBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match JsonOrForm::<T>::from_request(req, state).await {
            Ok(JsonOrForm(value)) => Ok(LenientBody(value)),
            Err(e) => {
                debug!(target: "http", "unreadable request body treated as empty: {}", e);
                Ok(LenientBody(T::default()))
            }
        }
    }
}
