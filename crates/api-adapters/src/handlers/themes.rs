use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use domains::{DomainError, DomainResult};
use serde::Deserialize;
use serde_json::json;
use services::ThemeUpsert;

use super::{action_failed, checkbox, chrome, flash_redirect, json_ok, render, render_status};
use crate::error::{status_for, ApiError, ApiResult};
use crate::metrics::ForumEvent;
use crate::session::{is_ajax, FlashLevel, PathId, Viewer};
use crate::state::AppState;
use crate::templates::{IndexTemplate, ThemeListTemplate, ThemeRow};

const THEME_LIST: &str = "/themes/";

#[derive(Debug, Deserialize)]
pub struct ThemeForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub identifier: String,
    pub is_active: Option<String>,
    /// `name=value` per line; absent keeps the current variables
    pub variables: Option<String>,
}

/// Parses the edit form's variable textarea. Blank lines are skipped and a
/// leading `--` on names is accepted.
pub fn parse_variable_lines(text: &str) -> DomainResult<Vec<(String, String)>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (name, value) = line.split_once('=').ok_or_else(|| {
                DomainError::Validation(format!("'{}' is not a name=value pair", line))
            })?;
            let name = name.trim().trim_start_matches("--").trim();
            Ok((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

pub async fn home(State(state): State<AppState>, viewer: Viewer) -> ApiResult<Response> {
    let active = state.services.themes.active_theme().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "active theme lookup failed");
        None
    });
    let variables = state.services.themes.render_variables().await;
    let page = IndexTemplate {
        chrome: chrome(&state, viewer.user.as_ref(), &viewer.session, "Home").await,
        active_theme: active.map(|t| t.name).unwrap_or_default(),
        variables: variables.into_iter().collect(),
    };
    render(&page)
}

async fn theme_rows(state: &AppState) -> ApiResult<Vec<ThemeRow>> {
    let mut rows = Vec::new();
    for theme in state.services.themes.list_themes().await? {
        let detail = state.services.themes.theme_detail(theme.id).await?;
        rows.push(ThemeRow::from(&detail));
    }
    Ok(rows)
}

pub async fn list(State(state): State<AppState>, viewer: Viewer) -> ApiResult<Response> {
    let page = ThemeListTemplate {
        chrome: chrome(&state, viewer.user.as_ref(), &viewer.session, "Themes").await,
        themes: theme_rows(&state).await?,
        form_error: String::new(),
        form_name: String::new(),
        form_identifier: String::new(),
    };
    render(&page)
}

#[tracing::instrument(skip_all, fields(identifier = %form.identifier))]
pub async fn create(State(state): State<AppState>, viewer: Viewer, Form(form): Form<ThemeForm>) -> ApiResult<Response> {
    let input = ThemeUpsert {
        name: form.name.clone(),
        identifier: form.identifier.clone(),
        variables: None,
        activate: Some(checkbox(form.is_active.as_deref())),
    };
    match state.services.themes.create_theme(input).await {
        Ok(theme) => {
            state.metrics.record(ForumEvent::ThemeCreated);
            if theme.is_active {
                state.metrics.record(ForumEvent::ThemeSwitched);
            }
            let message = format!("Theme '{}' created", theme.name);
            flash_redirect(&viewer.session, FlashLevel::Success, message, THEME_LIST).await
        }
        Err(err @ (DomainError::Validation(_) | DomainError::Conflict(_))) => {
            let status = status_for(&err);
            let page = ThemeListTemplate {
                chrome: chrome(&state, viewer.user.as_ref(), &viewer.session, "Themes").await,
                themes: theme_rows(&state).await?,
                form_error: err.user_message(),
                form_name: form.name,
                form_identifier: form.identifier,
            };
            render_status(status, &page)
        }
        Err(err) => Err(err.into()),
    }
}

#[tracing::instrument(skip_all, fields(theme_id = %id))]
pub async fn edit(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    PathId(id): PathId,
    Form(form): Form<ThemeForm>,
) -> ApiResult<Response> {
    let variables = match form.variables.as_deref().map(parse_variable_lines).transpose() {
        Ok(variables) => variables,
        Err(err) => return action_failed(&viewer.session, &headers, err, THEME_LIST).await,
    };
    let input = ThemeUpsert {
        name: form.name,
        identifier: form.identifier,
        variables,
        activate: Some(checkbox(form.is_active.as_deref())),
    };
    match state.services.themes.update_theme(id, input).await {
        Ok(theme) => {
            state.metrics.record(ForumEvent::ThemeUpdated);
            let message = format!("Theme '{}' updated", theme.name);
            flash_redirect(&viewer.session, FlashLevel::Success, message, THEME_LIST).await
        }
        Err(err) => action_failed(&viewer.session, &headers, err, THEME_LIST).await,
    }
}

#[tracing::instrument(skip_all, fields(theme_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    PathId(id): PathId,
) -> ApiResult<Response> {
    match state.services.themes.delete_theme(id).await {
        Ok(theme) => {
            state.metrics.record(ForumEvent::ThemeDeleted);
            let message = format!("Theme '{}' deleted", theme.name);
            flash_redirect(&viewer.session, FlashLevel::Success, message, THEME_LIST).await
        }
        Err(err) => action_failed(&viewer.session, &headers, err, THEME_LIST).await,
    }
}

#[tracing::instrument(skip_all, fields(theme_id = %id))]
pub async fn switch(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    PathId(id): PathId,
) -> ApiResult<Response> {
    match state.services.themes.switch_theme(id).await {
        Ok(theme) => {
            state.metrics.record(ForumEvent::ThemeSwitched);
            let message = format!("Switched to the {} theme", theme.name);
            if is_ajax(&headers) {
                return Ok(json_ok(json!({ "success": true, "message": message })));
            }
            flash_redirect(&viewer.session, FlashLevel::Success, message, THEME_LIST).await
        }
        Err(err) => action_failed(&viewer.session, &headers, err, THEME_LIST).await,
    }
}

/// Active theme's variables as a flat JSON object.
pub async fn variables(State(state): State<AppState>) -> ApiResult<Response> {
    match state.services.themes.active_variables().await {
        Ok(variables) => Ok(Json(variables).into_response()),
        Err(DomainError::NotFound(..)) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no active theme" })),
        )
            .into_response()),
        Err(err) => Err(ApiError::json(err)),
    }
}
