//! Route handlers, grouped by area. Shared helpers for page chrome,
//! rendering and the redirect-with-flash flow live here.

pub mod auth;
pub mod boards;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod replies;
pub mod system;
pub mod themes;

use askama::Template;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use domains::{DomainError, User};
use serde_json::Value;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::session::{flash, is_ajax, take_flashes, FlashLevel};
use crate::state::AppState;
use crate::templates::{css_declarations, Chrome, FlashView};

/// Layout data for one page. Drains the session's flash messages.
pub(crate) async fn chrome(state: &AppState, user: Option<&User>, session: &Session, title: impl Into<String>) -> Chrome {
    let variables = state.services.themes.render_variables().await;
    let unread_count = match user {
        Some(user) => state.services.notifications.unread_badge(user.id).await,
        None => 0,
    };
    let flashes = take_flashes(session)
        .await
        .into_iter()
        .map(|f| FlashView { class: f.level.css_class().to_string(), message: f.message })
        .collect();

    Chrome {
        page_title: title.into(),
        theme_css: css_declarations(&variables),
        is_authenticated: user.is_some(),
        username: user.map(|u| u.username.clone()).unwrap_or_default(),
        is_staff: user.is_some_and(|u| u.is_staff),
        unread_count,
        flashes,
    }
}

pub(crate) fn render<T: Template>(page: &T) -> ApiResult<Response> {
    Ok(Html(page.render()?).into_response())
}

pub(crate) fn render_status<T: Template>(status: StatusCode, page: &T) -> ApiResult<Response> {
    Ok((status, Html(page.render()?)).into_response())
}

pub(crate) fn json_ok(body: Value) -> Response {
    Json(body).into_response()
}

pub(crate) async fn flash_redirect(
    session: &Session,
    level: FlashLevel,
    message: impl Into<String>,
    to: &str,
) -> ApiResult<Response> {
    flash(session, level, message).await?;
    Ok(Redirect::to(to).into_response())
}

/// Failure of a page action. AJAX callers get the JSON envelope; page
/// callers are sent back to `back_to` with an error flash, except for
/// not-found and internal errors, which render the error page.
pub(crate) async fn action_failed(
    session: &Session,
    headers: &HeaderMap,
    err: DomainError,
    back_to: &str,
) -> ApiResult<Response> {
    if is_ajax(headers) {
        return Ok(ApiError::json(err).into_response());
    }
    match err {
        DomainError::NotFound(..) | DomainError::Internal(_) => Err(ApiError::page(err)),
        other => flash_redirect(session, FlashLevel::Error, other.user_message(), back_to).await,
    }
}

/// Lenient id parsing for optional form fields; garbage reads as absent.
pub(crate) fn optional_uuid(raw: Option<&str>) -> Option<Uuid> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// HTML checkboxes submit "on" when ticked and nothing otherwise.
pub(crate) fn checkbox(raw: Option<&str>) -> bool {
    matches!(raw, Some("on" | "true" | "1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_values() {
        assert!(checkbox(Some("on")));
        assert!(checkbox(Some("true")));
        assert!(!checkbox(None));
        assert!(!checkbox(Some("off")));
    }

    #[test]
    fn malformed_ids_are_absent() {
        let id = Uuid::now_v7();
        assert_eq!(optional_uuid(Some(&id.to_string())), Some(id));
        assert_eq!(optional_uuid(Some("")), None);
        assert_eq!(optional_uuid(Some("42")), None);
        assert_eq!(optional_uuid(None), None);
    }
}
