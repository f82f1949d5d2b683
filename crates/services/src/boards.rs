//! Board index and board detail listing.

use std::sync::Arc;

use domains::{
    clamp_page, Actor, DomainError, DomainResult, Forum, ForumRepository, ForumSummary, NewForum,
    Page, Post, PostQuery, PostRepository, PostSort, POSTS_PER_PAGE,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct BoardService {
    forums: Arc<dyn ForumRepository>,
    posts: Arc<dyn PostRepository>,
}

impl BoardService {
    pub fn new(forums: Arc<dyn ForumRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { forums, posts }
    }

    /// Active boards; moderator-only boards only for staff.
    pub async fn list_boards(&self, viewer: Option<&Actor>) -> DomainResult<Vec<ForumSummary>> {
        let include_moderator_only = viewer.is_some_and(|v| v.is_staff);
        self.forums.list_forums(include_moderator_only).await
    }

    /// Resolves a board the viewer may open.
    pub async fn board_for(&self, id: Uuid, viewer: Option<&Actor>) -> DomainResult<Forum> {
        let forum = self
            .forums
            .find_forum(id)
            .await?
            .filter(|f| f.is_active)
            .ok_or_else(|| DomainError::not_found("Board", id))?;
        if !forum.visible_to(viewer) {
            return Err(DomainError::Forbidden(
                "you do not have permission to access this board".into(),
            ));
        }
        Ok(forum)
    }

    /// One page of a board's published posts.
    pub async fn list_posts(
        &self,
        id: Uuid,
        viewer: Option<&Actor>,
        search: Option<&str>,
        sort: PostSort,
        page: u32,
    ) -> DomainResult<(Forum, Page<Post>)> {
        let forum = self.board_for(id, viewer).await?;
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let query = PostQuery {
            forum_id: forum.id,
            search,
            sort,
            page: page.max(1),
            per_page: POSTS_PER_PAGE,
        };
        let mut result = self.posts.list_posts(query.clone()).await?;

        // The adapter serves the requested page; re-query when it was past the end.
        let clamped = clamp_page(query.page, result.total, POSTS_PER_PAGE);
        if clamped != result.page {
            result = self.posts.list_posts(PostQuery { page: clamped, ..query }).await?;
        }
        Ok((forum, result))
    }

    pub async fn create_board(&self, forum: NewForum) -> DomainResult<Forum> {
        let name = forum.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation("board name is required".into()));
        }
        let created = self.forums.create_forum(NewForum { name, ..forum }).await?;
        tracing::info!(forum_id = %created.id, name = %created.name, "board created");
        Ok(created)
    }

    /// Creates the board unless one with the same name exists.
    pub async fn ensure_board(&self, forum: NewForum) -> DomainResult<Forum> {
        match self.forums.find_forum_by_name(forum.name.trim()).await? {
            Some(existing) => Ok(existing),
            None => self.create_board(forum).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{MockForumRepository, MockPostRepository};

    fn forum(moderator_only: bool, is_active: bool) -> Forum {
        let now = Utc::now();
        Forum {
            id: Uuid::now_v7(),
            name: "General".into(),
            description: String::new(),
            icon: String::new(),
            sort_order: 1,
            is_active,
            moderator_only,
            created_at: now,
            updated_at: now,
        }
    }

    fn member(is_staff: bool) -> Actor {
        Actor { user_id: Uuid::now_v7(), username: "u".into(), is_staff }
    }

    #[tokio::test]
    async fn staff_listing_includes_moderator_boards() {
        let mut forums = MockForumRepository::new();
        forums.expect_list_forums()
            .withf(|include| *include)
            .times(1)
            .returning(|_| Ok(vec![]));
        forums.expect_list_forums()
            .withf(|include| !*include)
            .times(2)
            .returning(|_| Ok(vec![]));

        let service = BoardService::new(Arc::new(forums), Arc::new(MockPostRepository::new()));
        service.list_boards(Some(&member(true))).await.unwrap();
        service.list_boards(Some(&member(false))).await.unwrap();
        service.list_boards(None).await.unwrap();
    }

    #[tokio::test]
    async fn moderator_only_board_is_forbidden_for_members() {
        let board = forum(true, true);
        let id = board.id;
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(move |_| Ok(Some(board.clone())));

        let service = BoardService::new(Arc::new(forums), Arc::new(MockPostRepository::new()));
        let err = service.board_for(id, Some(&member(false))).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert!(service.board_for(id, Some(&member(true))).await.is_ok());
    }

    #[tokio::test]
    async fn inactive_board_is_not_found() {
        let board = forum(false, false);
        let id = board.id;
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(move |_| Ok(Some(board.clone())));

        let service = BoardService::new(Arc::new(forums), Arc::new(MockPostRepository::new()));
        assert!(matches!(service.board_for(id, None).await, Err(DomainError::NotFound(..))));
    }

    #[tokio::test]
    async fn page_past_the_end_is_clamped() {
        let board = forum(false, true);
        let id = board.id;
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(move |_| Ok(Some(board.clone())));

        let mut posts = MockPostRepository::new();
        posts.expect_list_posts()
            .withf(|q| q.page == 9)
            .returning(|q| Ok(Page { items: vec![], page: q.page, per_page: q.per_page, total: 25 }));
        posts.expect_list_posts()
            .withf(|q| q.page == 2 && q.search.as_deref() == Some("rust"))
            .times(1)
            .returning(|q| Ok(Page { items: vec![], page: q.page, per_page: q.per_page, total: 25 }));

        let service = BoardService::new(Arc::new(forums), Arc::new(posts));
        let (_, page) = service
            .list_posts(id, None, Some("  rust "), PostSort::Latest, 9)
            .await
            .unwrap();
        assert_eq!(page.page, 2);
    }
}
