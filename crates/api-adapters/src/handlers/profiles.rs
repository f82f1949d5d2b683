use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Form,
};
use domains::{AccountUpdate, DomainError, ProfileUpdate};
use serde::Deserialize;

use super::{action_failed, chrome, flash_redirect, render, render_status};
use crate::error::ApiResult;
use crate::session::{is_ajax, FlashLevel, SignedIn};
use crate::state::AppState;
use crate::templates::{stamp, EditProfileTemplate, PostRow, ProfileTemplate};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: String,
    pub bio: String,
    pub signature: String,
}

async fn show(state: AppState, signed_in: SignedIn, username: Option<String>) -> ApiResult<Response> {
    let view = state
        .services
        .accounts
        .profile_page(&signed_in.actor, username.as_deref())
        .await?;
    let page = ProfileTemplate {
        chrome: chrome(&state, Some(&signed_in.user), &signed_in.session, view.user.username.clone()).await,
        display_name: view.user.display_name(),
        avatar: view.profile.avatar.clone().unwrap_or_default(),
        bio: view.profile.bio.clone(),
        signature: view.profile.signature.clone(),
        joined_at: stamp(&view.user.created_at),
        post_count: view.posts_count,
        reply_count: view.replies_count,
        reputation: view.profile.reputation,
        recent_posts: view.recent_posts.iter().map(PostRow::from).collect(),
        is_own_profile: view.is_own_profile,
        username: view.user.username,
    };
    render(&page)
}

pub async fn own(State(state): State<AppState>, signed_in: SignedIn) -> ApiResult<Response> {
    show(state, signed_in, None).await
}

pub async fn by_username(
    State(state): State<AppState>,
    signed_in: SignedIn,
    Path(username): Path<String>,
) -> ApiResult<Response> {
    show(state, signed_in, Some(username)).await
}

pub async fn edit_form(State(state): State<AppState>, signed_in: SignedIn) -> ApiResult<Response> {
    let profile = state.services.accounts.ensure_profile(signed_in.user.id).await?;
    let user = &signed_in.user;
    let page = EditProfileTemplate {
        chrome: chrome(&state, Some(user), &signed_in.session, "Edit profile").await,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone().unwrap_or_default(),
        avatar: profile.avatar.unwrap_or_default(),
        bio: profile.bio,
        signature: profile.signature,
        error: String::new(),
    };
    render(&page)
}

#[tracing::instrument(skip_all, fields(user = %signed_in.user.username))]
pub async fn edit(
    State(state): State<AppState>,
    signed_in: SignedIn,
    headers: HeaderMap,
    Form(form): Form<ProfileForm>,
) -> ApiResult<Response> {
    let account = AccountUpdate {
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        email: Some(form.email.clone()),
    };
    let profile = ProfileUpdate {
        avatar: Some(form.avatar.clone()),
        bio: form.bio.clone(),
        signature: form.signature.clone(),
    };
    match state.services.accounts.update_profile(&signed_in.actor, account, profile).await {
        Ok((user, _)) => {
            let target = format!("/user/profile/{}/", user.username);
            flash_redirect(&signed_in.session, FlashLevel::Success, "Profile updated", &target).await
        }
        Err(err @ DomainError::Validation(_)) if !is_ajax(&headers) => {
            let page = EditProfileTemplate {
                chrome: chrome(&state, Some(&signed_in.user), &signed_in.session, "Edit profile").await,
                first_name: form.first_name,
                last_name: form.last_name,
                email: form.email,
                avatar: form.avatar,
                bio: form.bio,
                signature: form.signature,
                error: err.user_message(),
            };
            render_status(StatusCode::UNPROCESSABLE_ENTITY, &page)
        }
        Err(err) => action_failed(&signed_in.session, &headers, err, "/user/profile/edit/").await,
    }
}
