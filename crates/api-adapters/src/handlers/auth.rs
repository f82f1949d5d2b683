use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use domains::DomainError;
use serde::Deserialize;
use services::SignupRequest;

use super::boards::BOARD_INDEX;
use super::{checkbox, chrome, flash_redirect, render, render_status};
use crate::error::{status_for, ApiResult};
use crate::metrics::ForumEvent;
use crate::session::{safe_next, sign_in, sign_out, ClientIp, FlashLevel, Viewer};
use crate::state::AppState;
use crate::templates::{LoginTemplate, SignupTemplate};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub login: String,
    pub password: String,
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
    pub agree_terms: Option<String>,
}

pub async fn login_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> ApiResult<Response> {
    let next = safe_next(query.next.as_deref());
    if viewer.user.is_some() {
        return Ok(Redirect::to(next.as_deref().unwrap_or(BOARD_INDEX)).into_response());
    }
    let page = LoginTemplate {
        chrome: chrome(&state, None, &viewer.session, "Log in").await,
        login: String::new(),
        next: next.unwrap_or_default(),
        error: String::new(),
    };
    render(&page)
}

#[tracing::instrument(skip_all, fields(login = %form.login))]
pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    ClientIp(ip): ClientIp,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    let next = safe_next(Some(&form.next));
    match state.services.accounts.login(form.login.trim(), &form.password, ip.as_deref()).await {
        Ok(user) => {
            sign_in(&viewer.session, &user).await?;
            state.metrics.record(ForumEvent::UserLoggedIn);
            let message = format!("Welcome back, {}!", user.username);
            flash_redirect(&viewer.session, FlashLevel::Success, message, next.as_deref().unwrap_or(BOARD_INDEX)).await
        }
        Err(err @ (DomainError::Unauthorized(_) | DomainError::Validation(_))) => {
            state.metrics.record(ForumEvent::LoginFailed);
            let page = LoginTemplate {
                chrome: chrome(&state, None, &viewer.session, "Log in").await,
                login: form.login,
                next: next.unwrap_or_default(),
                error: err.user_message(),
            };
            render_status(StatusCode::UNAUTHORIZED, &page)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn signup_form(State(state): State<AppState>, viewer: Viewer) -> ApiResult<Response> {
    if viewer.user.is_some() {
        return flash_redirect(&viewer.session, FlashLevel::Info, "You are already signed in", BOARD_INDEX).await;
    }
    let page = SignupTemplate {
        chrome: chrome(&state, None, &viewer.session, "Sign up").await,
        username: String::new(),
        email: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        error: String::new(),
    };
    render(&page)
}

#[tracing::instrument(skip_all, fields(username = %form.username))]
pub async fn signup(State(state): State<AppState>, viewer: Viewer, Form(form): Form<SignupForm>) -> ApiResult<Response> {
    if viewer.user.is_some() {
        return flash_redirect(&viewer.session, FlashLevel::Info, "You are already signed in", BOARD_INDEX).await;
    }
    let request = SignupRequest {
        username: form.username.clone(),
        email: form.email.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        password1: form.password1,
        password2: form.password2,
        agree_terms: checkbox(form.agree_terms.as_deref()),
    };
    match state.services.accounts.signup(request).await {
        Ok(user) => {
            sign_in(&viewer.session, &user).await?;
            state.metrics.record(ForumEvent::UserSignedUp);
            let message = format!("Welcome aboard, {}!", user.username);
            flash_redirect(&viewer.session, FlashLevel::Success, message, BOARD_INDEX).await
        }
        Err(err @ (DomainError::Validation(_) | DomainError::Conflict(_))) => {
            let page = SignupTemplate {
                chrome: chrome(&state, None, &viewer.session, "Sign up").await,
                username: form.username,
                email: form.email,
                first_name: form.first_name,
                last_name: form.last_name,
                error: err.user_message(),
            };
            render_status(status_for(&err), &page)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(viewer: Viewer) -> ApiResult<Response> {
    if let Some(user) = &viewer.user {
        tracing::info!(user_id = %user.id, "user logged out");
    }
    sign_out(&viewer.session).await?;
    Ok(Redirect::to("/").into_response())
}
