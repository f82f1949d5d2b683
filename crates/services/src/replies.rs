//! Replies and the notifications they trigger.

use std::sync::Arc;

use domains::{
    validate_reply_content, Actor, DomainError, DomainResult, NewNotification, NewReply,
    NotificationKind, NotificationRepository, Post, PostRepository, Reply, ReplyRepository,
};
use uuid::Uuid;

use crate::counters::CounterService;

#[derive(Clone)]
pub struct ReplyService {
    replies: Arc<dyn ReplyRepository>,
    posts: Arc<dyn PostRepository>,
    notifications: Arc<dyn NotificationRepository>,
    counters: CounterService,
}

impl ReplyService {
    pub fn new(
        replies: Arc<dyn ReplyRepository>,
        posts: Arc<dyn PostRepository>,
        notifications: Arc<dyn NotificationRepository>,
        counters: CounterService,
    ) -> Self {
        Self { replies, posts, notifications, counters }
    }

    /// Adds a reply. A parent that is missing, deleted, or belongs to a
    /// different post is dropped and the reply becomes top-level.
    pub async fn add_reply(
        &self,
        actor: &Actor,
        post_id: Uuid,
        content: &str,
        parent_reply_id: Option<Uuid>,
    ) -> DomainResult<Reply> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| DomainError::not_found("Post", post_id))?;
        let content = content.trim();
        validate_reply_content(content)?;

        let parent_reply_id = match parent_reply_id {
            Some(parent_id) => self.valid_parent(post_id, parent_id).await?,
            None => None,
        };

        let reply = self
            .replies
            .create_reply(NewReply {
                post_id,
                author_id: actor.user_id,
                content: content.to_string(),
                parent_reply_id,
            })
            .await?;

        self.posts.refresh_reply_stats(post_id).await?;
        self.counters.reply_created(actor.user_id).await?;
        if post.author_id != actor.user_id {
            self.notify_author(actor, &post).await?;
        }
        tracing::info!(reply_id = %reply.id, %post_id, author = %actor.username, "reply added");
        Ok(reply)
    }

    /// Soft delete gated to the reply's author or staff.
    pub async fn delete_reply(&self, actor: &Actor, id: Uuid) -> DomainResult<Reply> {
        let reply = self
            .replies
            .find_reply(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reply", id))?;
        if !actor.can_manage(reply.author_id) {
            return Err(DomainError::Forbidden("you do not have permission to delete this reply".into()));
        }
        if self.replies.soft_delete_reply(id).await? {
            self.posts.refresh_reply_stats(reply.post_id).await?;
            self.counters.reply_deleted(reply.author_id).await?;
            tracing::info!(reply_id = %id, by = %actor.username, "reply deleted");
        }
        Ok(reply)
    }

    async fn valid_parent(&self, post_id: Uuid, parent_id: Uuid) -> DomainResult<Option<Uuid>> {
        let parent = self.replies.find_reply(parent_id).await?;
        Ok(parent
            .filter(|p| p.post_id == post_id && !p.is_deleted)
            .map(|p| p.id))
    }

    async fn notify_author(&self, actor: &Actor, post: &Post) -> DomainResult<()> {
        self.notifications
            .create_notification(NewNotification {
                recipient_id: post.author_id,
                sender_id: Some(actor.user_id),
                kind: NotificationKind::Reply,
                title: format!("{} replied to your post", actor.username),
                content: post.title.clone(),
                url: post.path(),
            })
            .await?;
        Ok(())
    }
}
