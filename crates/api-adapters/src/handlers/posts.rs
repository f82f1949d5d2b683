use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
    Form,
};
use domains::{DomainError, PostStatus, User};
use serde::Deserialize;
use serde_json::json;
use services::PostDetail;
use tower_sessions::Session;

use super::boards::BOARD_INDEX;
use super::{action_failed, chrome, flash_redirect, json_ok, render, render_status};
use crate::error::{ApiError, ApiResult};
use crate::metrics::ForumEvent;
use crate::session::{is_ajax, ApiUser, FlashLevel, JsonPathId, PathId, SignedIn, Viewer};
use crate::state::AppState;
use crate::templates::{stamp, PostDetailTemplate, PostFormTemplate, ReplyView};

#[derive(Debug, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub status: Option<String>,
}

/// Detail page for an already-loaded post. Shared with the reply flow,
/// which re-renders it when a reply is rejected.
pub(crate) async fn detail_page(
    state: &AppState,
    user: Option<&User>,
    session: &Session,
    detail: PostDetail,
    reply_error: String,
    reply_draft: String,
) -> PostDetailTemplate {
    let actor = user.map(User::actor);
    let can_manage = actor.as_ref().is_some_and(|a| a.can_manage(detail.post.author_id));
    let replies = detail
        .replies
        .iter()
        .map(|r| {
            let can_delete = actor.as_ref().is_some_and(|a| a.can_manage(r.author_id));
            ReplyView::build(r, &detail.replies, can_delete)
        })
        .collect();
    let post = detail.post;

    PostDetailTemplate {
        chrome: chrome(state, user, session, post.title.clone()).await,
        id: post.id.to_string(),
        board_url: format!("/forum/{}/", post.forum_id),
        author_url: format!("/user/profile/{}/", post.author_username),
        created_at: stamp(&post.created_at),
        updated_at: stamp(&post.updated_at),
        edited: post.updated_at > post.created_at,
        view_count: post.view_count,
        reply_count: post.reply_count,
        is_top: post.is_top,
        is_essence: post.is_essence,
        can_manage,
        replies,
        reply_error,
        reply_draft,
        title: post.title,
        content: post.content,
        author: post.author_username,
    }
}

pub async fn show(State(state): State<AppState>, viewer: Viewer, PathId(id): PathId) -> ApiResult<Response> {
    let detail = state.services.posts.view_post(id).await?;
    let page = detail_page(&state, viewer.user.as_ref(), &viewer.session, detail, String::new(), String::new()).await;
    render(&page)
}

pub async fn new_form(
    State(state): State<AppState>,
    signed_in: SignedIn,
    headers: HeaderMap,
    PathId(forum_id): PathId,
) -> ApiResult<Response> {
    let forum = match state.services.boards.board_for(forum_id, Some(&signed_in.actor)).await {
        Ok(forum) => forum,
        Err(err) => return action_failed(&signed_in.session, &headers, err, BOARD_INDEX).await,
    };
    let page = PostFormTemplate {
        chrome: chrome(&state, Some(&signed_in.user), &signed_in.session, "New post").await,
        heading: format!("New post in {}", forum.name),
        action: format!("/forum/{}/create/", forum.id),
        cancel_url: format!("/forum/{}/", forum.id),
        title: String::new(),
        content: String::new(),
        error: String::new(),
    };
    render(&page)
}

#[tracing::instrument(skip_all, fields(%forum_id, author = %signed_in.user.username))]
pub async fn create(
    State(state): State<AppState>,
    signed_in: SignedIn,
    headers: HeaderMap,
    PathId(forum_id): PathId,
    Form(form): Form<PostForm>,
) -> ApiResult<Response> {
    let board_url = format!("/forum/{}/", forum_id);
    match state
        .services
        .posts
        .create_post(&signed_in.actor, forum_id, &form.title, &form.content)
        .await
    {
        Ok(post) => {
            state.metrics.record(ForumEvent::PostCreated);
            flash_redirect(&signed_in.session, FlashLevel::Success, "Post published", &post.path()).await
        }
        Err(err @ DomainError::Validation(_)) if !is_ajax(&headers) => {
            let page = PostFormTemplate {
                chrome: chrome(&state, Some(&signed_in.user), &signed_in.session, "New post").await,
                heading: "New post".to_string(),
                action: format!("/forum/{}/create/", forum_id),
                cancel_url: board_url,
                title: form.title,
                content: form.content,
                error: err.user_message(),
            };
            render_status(StatusCode::UNPROCESSABLE_ENTITY, &page)
        }
        Err(err) => action_failed(&signed_in.session, &headers, err, &board_url).await,
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    signed_in: SignedIn,
    headers: HeaderMap,
    PathId(id): PathId,
) -> ApiResult<Response> {
    let post = match state.services.posts.post_for_edit(&signed_in.actor, id).await {
        Ok(post) => post,
        Err(err) => return action_failed(&signed_in.session, &headers, err, &format!("/post/{}/", id)).await,
    };
    let page = PostFormTemplate {
        chrome: chrome(&state, Some(&signed_in.user), &signed_in.session, "Edit post").await,
        heading: "Edit post".to_string(),
        action: format!("/post/{}/edit/", post.id),
        cancel_url: post.path(),
        title: post.title,
        content: post.content,
        error: String::new(),
    };
    render(&page)
}

#[tracing::instrument(skip_all, fields(post_id = %id, editor = %signed_in.user.username))]
pub async fn edit(
    State(state): State<AppState>,
    signed_in: SignedIn,
    headers: HeaderMap,
    PathId(id): PathId,
    Form(form): Form<PostForm>,
) -> ApiResult<Response> {
    let post_url = format!("/post/{}/", id);
    let status = match form
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<PostStatus>)
        .transpose()
    {
        Ok(status) => status,
        Err(err) => return action_failed(&signed_in.session, &headers, err, &post_url).await,
    };
    match state
        .services
        .posts
        .edit_post(&signed_in.actor, id, &form.title, &form.content, status)
        .await
    {
        Ok(post) => {
            state.metrics.record(ForumEvent::PostEdited);
            flash_redirect(&signed_in.session, FlashLevel::Success, "Post updated", &post.path()).await
        }
        Err(err @ DomainError::Validation(_)) if !is_ajax(&headers) => {
            let page = PostFormTemplate {
                chrome: chrome(&state, Some(&signed_in.user), &signed_in.session, "Edit post").await,
                heading: "Edit post".to_string(),
                action: format!("/post/{}/edit/", id),
                cancel_url: post_url,
                title: form.title,
                content: form.content,
                error: err.user_message(),
            };
            render_status(StatusCode::UNPROCESSABLE_ENTITY, &page)
        }
        Err(err) => action_failed(&signed_in.session, &headers, err, &post_url).await,
    }
}

#[tracing::instrument(skip_all, fields(post_id = %id, by = %signed_in.user.username))]
pub async fn delete(
    State(state): State<AppState>,
    signed_in: SignedIn,
    headers: HeaderMap,
    PathId(id): PathId,
) -> ApiResult<Response> {
    match state.services.posts.delete_post(&signed_in.actor, id).await {
        Ok(post) => {
            state.metrics.record(ForumEvent::PostDeleted);
            let board_url = format!("/forum/{}/", post.forum_id);
            if is_ajax(&headers) {
                return Ok(json_ok(json!({ "success": true, "message": "Post deleted", "redirect": board_url })));
            }
            flash_redirect(&signed_in.session, FlashLevel::Success, "Post deleted", &board_url).await
        }
        Err(err) => action_failed(&signed_in.session, &headers, err, &format!("/post/{}/", id)).await,
    }
}

#[tracing::instrument(skip_all, fields(post_id = %id, by = %api_user.actor.username))]
pub async fn toggle_essence(
    State(state): State<AppState>,
    api_user: ApiUser,
    JsonPathId(id): JsonPathId,
) -> ApiResult<Response> {
    let is_essence = state
        .services
        .posts
        .toggle_essence(&api_user.actor, id)
        .await
        .map_err(ApiError::json)?;
    state.metrics.record(ForumEvent::EssenceToggled);
    let message = if is_essence { "Post marked as featured" } else { "Post is no longer featured" };
    Ok(json_ok(json!({ "success": true, "is_essence": is_essence, "message": message })))
}

#[tracing::instrument(skip_all, fields(post_id = %id, by = %api_user.actor.username))]
pub async fn toggle_top(
    State(state): State<AppState>,
    api_user: ApiUser,
    JsonPathId(id): JsonPathId,
) -> ApiResult<Response> {
    let is_top = state
        .services
        .posts
        .toggle_top(&api_user.actor, id)
        .await
        .map_err(ApiError::json)?;
    state.metrics.record(ForumEvent::TopToggled);
    let message = if is_top { "Post pinned" } else { "Post unpinned" };
    Ok(json_ok(json!({ "success": true, "is_top": is_top, "message": message })))
}

