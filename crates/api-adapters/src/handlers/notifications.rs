use axum::{extract::State, response::Response};
use serde_json::json;

use super::{chrome, json_ok, render};
use crate::error::{ApiError, ApiResult};
use crate::session::{ApiUser, JsonPathId, SignedIn};
use crate::state::AppState;
use crate::templates::{NotificationRow, NotificationsTemplate};

/// Lists notifications and marks them all read. Rows keep the flags they
/// had before the visit so new ones can be highlighted.
pub async fn list(State(state): State<AppState>, signed_in: SignedIn) -> ApiResult<Response> {
    let notifications = state
        .services
        .notifications
        .view_notifications(signed_in.user.id)
        .await?;
    // Built after marking so the badge already reads zero.
    let page = NotificationsTemplate {
        chrome: chrome(&state, Some(&signed_in.user), &signed_in.session, "Notifications").await,
        notifications: notifications.iter().map(NotificationRow::from).collect(),
    };
    render(&page)
}

pub async fn read_all(State(state): State<AppState>, api_user: ApiUser) -> ApiResult<Response> {
    let marked = state
        .services
        .notifications
        .mark_all_read(api_user.actor.user_id)
        .await
        .map_err(ApiError::json)?;
    let message = if marked > 0 { "All notifications marked as read" } else { "No unread notifications" };
    Ok(json_ok(json!({ "success": true, "marked": marked, "message": message })))
}

pub async fn read_one(
    State(state): State<AppState>,
    api_user: ApiUser,
    JsonPathId(id): JsonPathId,
) -> ApiResult<Response> {
    state
        .services
        .notifications
        .mark_read(api_user.actor.user_id, id)
        .await
        .map_err(ApiError::json)?;
    Ok(json_ok(json!({ "success": true })))
}
