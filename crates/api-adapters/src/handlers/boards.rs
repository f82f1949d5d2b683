use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
};
use domains::PostSort;
use serde::Deserialize;

use super::{action_failed, chrome, render};
use crate::error::ApiResult;
use crate::session::{PathId, Viewer};
use crate::state::AppState;
use crate::templates::{ForumDetailTemplate, ForumIndexTemplate, ForumRow};

pub const BOARD_INDEX: &str = "/forum/";

#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    /// Kept as text so `?page=abc` falls back to the first page.
    pub page: Option<String>,
}

impl BoardQuery {
    pub fn page_number(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1)
    }
}

pub async fn index(State(state): State<AppState>, viewer: Viewer) -> ApiResult<Response> {
    let actor = viewer.actor();
    let forums = state.services.boards.list_boards(actor.as_ref()).await?;
    let page = ForumIndexTemplate {
        chrome: chrome(&state, viewer.user.as_ref(), &viewer.session, "Forum").await,
        forums: forums.iter().map(ForumRow::from).collect(),
    };
    render(&page)
}

pub async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    PathId(id): PathId,
    Query(query): Query<BoardQuery>,
) -> ApiResult<Response> {
    let actor = viewer.actor();
    let sort = PostSort::from_param(query.sort.as_deref().unwrap_or_default());
    let search = query.search.as_deref().unwrap_or_default().trim().to_string();

    let listing = state
        .services
        .boards
        .list_posts(id, actor.as_ref(), Some(&search), sort, query.page_number())
        .await;
    let (forum, posts) = match listing {
        Ok(found) => found,
        Err(err) => return action_failed(&viewer.session, &headers, err, BOARD_INDEX).await,
    };

    let chrome = chrome(&state, viewer.user.as_ref(), &viewer.session, forum.name.clone()).await;
    let page = ForumDetailTemplate::new(chrome, &forum, &search, sort.as_param(), &posts);
    render(&page)
}
