use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
    Form,
};
use domains::DomainError;
use serde::Deserialize;
use serde_json::json;

use super::boards::BOARD_INDEX;
use super::posts::detail_page;
use super::{action_failed, flash_redirect, json_ok, optional_uuid, render_status};
use crate::error::ApiResult;
use crate::metrics::ForumEvent;
use crate::session::{is_ajax, referer_path, FlashLevel, PathId, SignedIn};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReplyForm {
    #[serde(default)]
    pub content: String,
    pub parent_reply_id: Option<String>,
}

#[tracing::instrument(skip_all, fields(%post_id, author = %signed_in.user.username))]
pub async fn create(
    State(state): State<AppState>,
    signed_in: SignedIn,
    headers: HeaderMap,
    PathId(post_id): PathId,
    Form(form): Form<ReplyForm>,
) -> ApiResult<Response> {
    let post_url = format!("/post/{}/", post_id);
    let parent = optional_uuid(form.parent_reply_id.as_deref());

    match state
        .services
        .replies
        .add_reply(&signed_in.actor, post_id, &form.content, parent)
        .await
    {
        Ok(reply) => {
            state.metrics.record(ForumEvent::ReplyCreated);
            if is_ajax(&headers) {
                return Ok(json_ok(json!({
                    "success": true,
                    "reply_id": reply.id,
                    "message": "Reply posted",
                })));
            }
            let anchor = format!("{}#reply-{}", post_url, reply.id);
            flash_redirect(&signed_in.session, FlashLevel::Success, "Reply posted", &anchor).await
        }
        Err(err @ DomainError::Validation(_)) if !is_ajax(&headers) => {
            // The rejected draft goes back into the form, without counting a view.
            let detail = state.services.posts.post_detail(post_id).await?;
            let page = detail_page(
                &state,
                Some(&signed_in.user),
                &signed_in.session,
                detail,
                err.user_message(),
                form.content,
            )
            .await;
            render_status(StatusCode::UNPROCESSABLE_ENTITY, &page)
        }
        Err(err) => action_failed(&signed_in.session, &headers, err, &post_url).await,
    }
}

#[tracing::instrument(skip_all, fields(reply_id = %id, by = %signed_in.user.username))]
pub async fn delete(
    State(state): State<AppState>,
    signed_in: SignedIn,
    headers: HeaderMap,
    PathId(id): PathId,
) -> ApiResult<Response> {
    match state.services.replies.delete_reply(&signed_in.actor, id).await {
        Ok(reply) => {
            state.metrics.record(ForumEvent::ReplyDeleted);
            let post_url = format!("/post/{}/", reply.post_id);
            if is_ajax(&headers) {
                return Ok(json_ok(json!({ "success": true, "message": "Reply deleted" })));
            }
            flash_redirect(&signed_in.session, FlashLevel::Success, "Reply deleted", &post_url).await
        }
        Err(err) => {
            let back = referer_path(&headers).unwrap_or_else(|| BOARD_INDEX.to_string());
            action_failed(&signed_in.session, &headers, err, &back).await
        }
    }
}
