//! Session-backed authentication and one-shot flash messages.
//!
//! The session holds only the signed-in user's id; the user row is
//! re-read on every request so staff changes and deletions apply at once.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Path},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use domains::{Actor, DomainError, User};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{ApiError, Format};
use crate::state::AppState;
use crate::templates::encode_query_value;

const USER_ID_KEY: &str = "user_id";
const FLASH_KEY: &str = "flash";

pub const LOGIN_PATH: &str = "/accounts/login/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Queues a message for the next rendered page.
pub async fn flash(session: &Session, level: FlashLevel, message: impl Into<String>) -> Result<(), ApiError> {
    let mut queued: Vec<Flash> = session.get(FLASH_KEY).await?.unwrap_or_default();
    queued.push(Flash { level, message: message.into() });
    session.insert(FLASH_KEY, queued).await?;
    Ok(())
}

/// Drains queued messages. A session failure only costs the messages.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(FLASH_KEY).await {
        Ok(flashes) => flashes.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read flash messages");
            Vec::new()
        }
    }
}

/// Binds the session to `user`, rotating the id against fixation.
pub async fn sign_in(session: &Session, user: &User) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user.id).await?;
    Ok(())
}

pub async fn sign_out(session: &Session) -> Result<(), ApiError> {
    session.flush().await?;
    Ok(())
}

pub fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// `/accounts/login/?next=<path>` for the current request.
pub fn login_redirect(next: &str) -> Redirect {
    Redirect::to(&format!("{}?next={}", LOGIN_PATH, encode_query_value(next)))
}

/// Accepts only same-site absolute paths as a post-login target.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    next.map(str::trim)
        .filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
        .map(str::to_string)
}

async fn session_of(parts: &mut Parts, state: &AppState) -> Result<Session, ApiError> {
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| ApiError::internal(msg))
}

async fn current_user(session: &Session, state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(user_id) = session.get::<Uuid>(USER_ID_KEY).await? else {
        return Ok(None);
    };
    match state.services.accounts.find_user(user_id).await {
        Ok(Some(user)) => Ok(Some(user)),
        Ok(None) => {
            tracing::debug!(%user_id, "session refers to a missing user");
            Ok(None)
        }
        Err(e) => Err(ApiError::page(e)),
    }
}

/// Any visitor, signed in or not.
pub struct Viewer {
    pub user: Option<User>,
    pub session: Session,
}

impl Viewer {
    pub fn actor(&self) -> Option<Actor> {
        self.user.as_ref().map(User::actor)
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session_of(parts, state).await?;
        let user = current_user(&session, state).await?;
        Ok(Self { user, session })
    }
}

/// A signed-in user. Pages redirect anonymous visitors to the login form;
/// AJAX callers get a 401 JSON failure instead.
pub struct SignedIn {
    pub user: User,
    pub actor: Actor,
    pub session: Session,
}

impl FromRequestParts<AppState> for SignedIn {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session_of(parts, state).await.map_err(IntoResponse::into_response)?;
        match current_user(&session, state).await.map_err(IntoResponse::into_response)? {
            Some(user) => Ok(Self { actor: user.actor(), user, session }),
            None if is_ajax(&parts.headers) => Err(unauthorized_json()),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());
                Err(login_redirect(&next).into_response())
            }
        }
    }
}

/// A signed-in caller of a JSON-only endpoint.
pub struct ApiUser {
    pub actor: Actor,
}

impl FromRequestParts<AppState> for ApiUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session_of(parts, state)
            .await
            .map_err(|e| e.with_format(Format::Json).into_response())?;
        match current_user(&session, state).await {
            Ok(Some(user)) => Ok(Self { actor: user.actor() }),
            Ok(None) => Err(unauthorized_json()),
            Err(e) => Err(e.with_format(Format::Json).into_response()),
        }
    }
}

fn unauthorized_json() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": "authentication required" })),
    )
        .into_response()
}

/// Client address: first `X-Forwarded-For` hop, else the peer address.
pub struct ClientIp(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };
        Ok(Self(forwarded.or_else(peer)))
    }
}

/// A `{id}` path segment. A value that is not a UUID names no record, so it
/// is a 404: an error page, or the JSON failure body for AJAX callers.
pub struct PathId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for PathId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let format = if is_ajax(&parts.headers) { Format::Json } else { Format::Html };
        path_uuid(parts, state).await.map(Self).map_err(|e| e.with_format(format))
    }
}

/// `PathId` for JSON-only endpoints; the 404 is always the JSON failure body.
pub struct JsonPathId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for JsonPathId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        path_uuid(parts, state).await.map(Self).map_err(|e| e.with_format(Format::Json))
    }
}

async fn path_uuid<S: Send + Sync>(parts: &mut Parts, state: &S) -> Result<Uuid, ApiError> {
    let Path(raw) = Path::<String>::from_request_parts(parts, state).await.map_err(|e| {
        tracing::error!(error = %e, path = %parts.uri.path(), "route has no single id segment");
        ApiError::internal("internal server error")
    })?;
    Uuid::parse_str(&raw).map_err(|_| {
        tracing::debug!(id = %raw, "malformed id in path");
        ApiError::page(DomainError::not_found("Page", raw))
    })
}

/// The `Referer` path when it points back into this site.
pub fn referer_path(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::REFERER)?.to_str().ok()?;
    let path = match raw.find("://") {
        Some(scheme_end) => {
            let rest = &raw[scheme_end + 3..];
            &rest[rest.find('/')?..]
        }
        None => raw,
    };
    safe_next(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn next_must_stay_on_site() {
        assert_eq!(safe_next(Some("/post/1/")), Some("/post/1/".to_string()));
        assert_eq!(safe_next(Some("//evil.example/")), None);
        assert_eq!(safe_next(Some("https://evil.example/")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn ajax_is_detected_from_the_header() {
        let mut headers = HeaderMap::new();
        assert!(!is_ajax(&headers));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(is_ajax(&headers));
    }

    #[test]
    fn referer_is_reduced_to_a_path() {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static("http://localhost:8000/forum/abc/?page=2"));
        assert_eq!(referer_path(&headers), Some("/forum/abc/?page=2".to_string()));

        headers.insert(header::REFERER, HeaderValue::from_static("http://localhost:8000"));
        assert_eq!(referer_path(&headers), None);
    }
}
