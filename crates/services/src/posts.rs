//! Post lifecycle: create, view, edit, soft-delete, and staff moderation.

use std::sync::Arc;

use domains::{
    validate_post_fields, Actor, DomainError, DomainResult, NewPost, Post, PostEdit,
    PostRepository, PostStatus, Reply, ReplyRepository,
};
use uuid::Uuid;

use crate::boards::BoardService;
use crate::counters::CounterService;

/// A post as shown on its detail page, with its live replies.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: Post,
    pub replies: Vec<Reply>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    replies: Arc<dyn ReplyRepository>,
    boards: BoardService,
    counters: CounterService,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        replies: Arc<dyn ReplyRepository>,
        boards: BoardService,
        counters: CounterService,
    ) -> Self {
        Self { posts, replies, boards, counters }
    }

    pub async fn create_post(&self, actor: &Actor, forum_id: Uuid, title: &str, content: &str) -> DomainResult<Post> {
        let forum = self.boards.board_for(forum_id, Some(actor)).await?;
        let title = title.trim();
        let content = content.trim();
        validate_post_fields(title, content)?;

        let post = self
            .posts
            .create_post(NewPost {
                forum_id: forum.id,
                author_id: actor.user_id,
                title: title.to_string(),
                content: content.to_string(),
                status: PostStatus::Published,
            })
            .await?;
        self.counters.post_created(actor.user_id).await?;
        tracing::info!(post_id = %post.id, forum_id = %forum.id, author = %actor.username, "post created");
        Ok(post)
    }

    /// Detail page access: counts a view and loads live replies. Only
    /// published, non-deleted posts are viewable here.
    pub async fn view_post(&self, id: Uuid) -> DomainResult<PostDetail> {
        let mut detail = self.post_detail(id).await?;
        match self.posts.increment_views(id).await {
            Ok(()) => detail.post.view_count += 1,
            Err(e) => tracing::warn!(post_id = %id, error = %e, "view count not incremented"),
        }
        Ok(detail)
    }

    /// Same visibility rules as `view_post` without counting a view.
    pub async fn post_detail(&self, id: Uuid) -> DomainResult<PostDetail> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .filter(Post::is_publicly_visible)
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        let replies = self.replies.list_replies(id).await?;
        Ok(PostDetail { post, replies })
    }

    /// Direct lookup by id. Soft-deleted posts are only returned to staff.
    pub async fn lookup_post(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<Post> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        let is_staff = actor.is_some_and(|a| a.is_staff);
        if post.is_deleted && !is_staff {
            return Err(DomainError::not_found("Post", id));
        }
        Ok(post)
    }

    /// Loads a post for its edit form, enforcing the author-or-staff rule.
    pub async fn post_for_edit(&self, actor: &Actor, id: Uuid) -> DomainResult<Post> {
        let post = self.lookup_post(Some(actor), id).await?;
        if !actor.can_manage(post.author_id) {
            return Err(DomainError::Forbidden("you do not have permission to edit this post".into()));
        }
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        actor: &Actor,
        id: Uuid,
        title: &str,
        content: &str,
        status: Option<PostStatus>,
    ) -> DomainResult<Post> {
        let post = self.post_for_edit(actor, id).await?;
        let title = title.trim();
        let content = content.trim();
        validate_post_fields(title, content)?;

        let edit = PostEdit {
            title: title.to_string(),
            content: content.to_string(),
            status: status.unwrap_or(post.status),
        };
        let updated = self
            .posts
            .update_post(id, edit)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        tracing::info!(post_id = %id, editor = %actor.username, "post edited");
        Ok(updated)
    }

    /// Soft delete. A second delete is a no-op and leaves counters alone.
    pub async fn delete_post(&self, actor: &Actor, id: Uuid) -> DomainResult<Post> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        if !actor.can_manage(post.author_id) {
            return Err(DomainError::Forbidden("you do not have permission to delete this post".into()));
        }
        if self.posts.soft_delete_post(id).await? {
            self.counters.post_deleted(post.author_id).await?;
            tracing::info!(post_id = %id, by = %actor.username, "post deleted");
        }
        Ok(post)
    }

    /// Staff toggle; returns the new featured flag.
    pub async fn toggle_essence(&self, actor: &Actor, id: Uuid) -> DomainResult<bool> {
        require_staff(actor)?;
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        let is_essence = self
            .posts
            .toggle_essence(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        // Featured posts feed the author's reputation.
        self.counters.refresh_reputation(post.author_id).await?;
        tracing::info!(post_id = %id, is_essence, by = %actor.username, "essence toggled");
        Ok(is_essence)
    }

    /// Staff toggle; returns the new pinned flag.
    pub async fn toggle_top(&self, actor: &Actor, id: Uuid) -> DomainResult<bool> {
        require_staff(actor)?;
        let is_top = self
            .posts
            .toggle_top(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        tracing::info!(post_id = %id, is_top, by = %actor.username, "top toggled");
        Ok(is_top)
    }
}

fn require_staff(actor: &Actor) -> DomainResult<()> {
    if !actor.is_staff {
        return Err(DomainError::Forbidden("insufficient permissions".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{
        MockForumRepository, MockPostRepository, MockProfileRepository, MockReplyRepository,
    };
    use mockall::predicate::eq;

    fn post(author_id: Uuid, is_deleted: bool) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::now_v7(),
            forum_id: Uuid::now_v7(),
            author_id,
            author_username: "alice".into(),
            title: "t".into(),
            content: "c".into(),
            status: PostStatus::Published,
            is_top: false,
            is_essence: false,
            is_deleted,
            view_count: 0,
            reply_count: 0,
            last_reply_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn actor(is_staff: bool) -> Actor {
        Actor { user_id: Uuid::now_v7(), username: "bob".into(), is_staff }
    }

    fn service(posts: MockPostRepository, profiles: MockProfileRepository) -> PostService {
        let posts = Arc::new(posts);
        PostService::new(
            posts.clone(),
            Arc::new(MockReplyRepository::new()),
            BoardService::new(Arc::new(MockForumRepository::new()), posts),
            CounterService::new(Arc::new(profiles)),
        )
    }

    #[tokio::test]
    async fn strangers_cannot_delete() {
        let target = post(Uuid::now_v7(), false);
        let mut posts = MockPostRepository::new();
        posts.expect_find_post().returning(move |_| Ok(Some(target.clone())));
        posts.expect_soft_delete_post().never();

        let err = service(posts, MockProfileRepository::new())
            .delete_post(&actor(false), Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn repeated_delete_does_not_decrement_twice() {
        let author = actor(false);
        let target = post(author.user_id, true);
        let mut posts = MockPostRepository::new();
        posts.expect_find_post().returning(move |_| Ok(Some(target.clone())));
        posts.expect_soft_delete_post().returning(|_| Ok(false));
        let mut profiles = MockProfileRepository::new();
        profiles.expect_recompute_counters().never();

        service(posts, profiles)
            .delete_post(&author, Uuid::now_v7())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn members_cannot_toggle_flags() {
        let mut posts = MockPostRepository::new();
        posts.expect_toggle_essence().never();
        posts.expect_toggle_top().never();
        let svc = service(posts, MockProfileRepository::new());

        assert!(matches!(svc.toggle_essence(&actor(false), Uuid::now_v7()).await, Err(DomainError::Forbidden(_))));
        assert!(matches!(svc.toggle_top(&actor(false), Uuid::now_v7()).await, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn featuring_refreshes_the_author_reputation() {
        let author_id = Uuid::now_v7();
        let target = post(author_id, false);
        let mut posts = MockPostRepository::new();
        posts.expect_find_post().returning(move |_| Ok(Some(target.clone())));
        posts.expect_toggle_essence().returning(|_| Ok(Some(true)));
        let mut profiles = MockProfileRepository::new();
        profiles.expect_recompute_counters()
            .with(eq(author_id), eq(domains::CounterDelta::NONE))
            .times(1)
            .returning(|user_id, _| {
                let now = Utc::now();
                Ok(domains::UserProfile {
                    user_id,
                    avatar: None,
                    bio: String::new(),
                    signature: String::new(),
                    post_count: 1,
                    reply_count: 0,
                    reputation: 12,
                    last_login_ip: None,
                    created_at: now,
                    updated_at: now,
                })
            });

        let featured = service(posts, profiles)
            .toggle_essence(&actor(true), Uuid::now_v7())
            .await
            .unwrap();
        assert!(featured);
    }

    #[tokio::test]
    async fn deleted_posts_are_visible_to_staff_only() {
        let target = post(Uuid::now_v7(), true);
        let mut posts = MockPostRepository::new();
        posts.expect_find_post().returning(move |_| Ok(Some(target.clone())));
        let svc = service(posts, MockProfileRepository::new());

        assert!(svc.lookup_post(Some(&actor(true)), Uuid::now_v7()).await.is_ok());
        assert!(matches!(
            svc.lookup_post(Some(&actor(false)), Uuid::now_v7()).await,
            Err(DomainError::NotFound(..))
        ));
        assert!(svc.lookup_post(None, Uuid::now_v7()).await.is_err());
    }

    #[tokio::test]
    async fn viewing_a_deleted_post_is_not_found() {
        let target = post(Uuid::now_v7(), true);
        let mut posts = MockPostRepository::new();
        posts.expect_find_post().returning(move |_| Ok(Some(target.clone())));
        posts.expect_increment_views().never();

        let err = service(posts, MockProfileRepository::new())
            .view_post(Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(..)));
    }
}
