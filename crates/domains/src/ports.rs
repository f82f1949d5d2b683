//! # Ports
//!
//! Any storage or auth adapter must implement these traits to be wired
//! into the services. Every mutation that has to be atomic (theme
//! activation, counter recomputation, reply statistics) is a single port
//! call so the adapter can run it inside one transaction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::DomainResult;
use crate::models::*;

/// Persistence contract for themes and their CSS variables.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThemeRepository: Send + Sync {
    async fn list_themes(&self) -> DomainResult<Vec<Theme>>;
    async fn find_theme(&self, id: Uuid) -> DomainResult<Option<Theme>>;
    async fn find_theme_by_identifier(&self, identifier: &str) -> DomainResult<Option<Theme>>;
    async fn find_active_theme(&self) -> DomainResult<Option<Theme>>;
    async fn theme_variables(&self, theme_id: Uuid) -> DomainResult<Vec<ThemeVariable>>;

    /// Inserts the theme inactive, together with its variables.
    async fn create_theme(&self, theme: NewTheme) -> DomainResult<Theme>;
    async fn update_theme(&self, id: Uuid, changes: ThemeChanges) -> DomainResult<Option<Theme>>;

    /// Deletes the theme only while it is inactive. Returns whether a row went away.
    async fn delete_inactive_theme(&self, id: Uuid) -> DomainResult<bool>;

    /// Deactivates every theme and activates `id` in one transaction.
    /// Returns `false` (and changes nothing) when `id` does not exist.
    async fn activate_theme(&self, id: Uuid) -> DomainResult<bool>;
    async fn deactivate_theme(&self, id: Uuid) -> DomainResult<bool>;
}

/// Persistence contract for boards.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ForumRepository: Send + Sync {
    /// Active boards ordered by (sort_order, name) with live statistics.
    async fn list_forums(&self, include_moderator_only: bool) -> DomainResult<Vec<ForumSummary>>;
    async fn find_forum(&self, id: Uuid) -> DomainResult<Option<Forum>>;
    async fn find_forum_by_name(&self, name: &str) -> DomainResult<Option<Forum>>;
    async fn create_forum(&self, forum: NewForum) -> DomainResult<Forum>;
}

/// Persistence contract for posts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: NewPost) -> DomainResult<Post>;
    /// Looks a post up regardless of status or soft-delete flag.
    async fn find_post(&self, id: Uuid) -> DomainResult<Option<Post>>;
    /// Published, non-deleted posts of one board.
    async fn list_posts(&self, query: PostQuery) -> DomainResult<Page<Post>>;
    async fn update_post(&self, id: Uuid, edit: PostEdit) -> DomainResult<Option<Post>>;
    /// Returns `true` only when the post went from live to deleted.
    async fn soft_delete_post(&self, id: Uuid) -> DomainResult<bool>;
    /// Best-effort `view_count + 1`.
    async fn increment_views(&self, id: Uuid) -> DomainResult<()>;
    /// Flips the flag atomically and returns the new value.
    async fn toggle_essence(&self, id: Uuid) -> DomainResult<Option<bool>>;
    async fn toggle_top(&self, id: Uuid) -> DomainResult<Option<bool>>;
    /// Recomputes reply_count and last_reply_at from live replies.
    async fn refresh_reply_stats(&self, post_id: Uuid) -> DomainResult<()>;
    async fn recent_posts_by_author(&self, author_id: Uuid, limit: u32) -> DomainResult<Vec<Post>>;
    async fn count_posts_by_author(&self, author_id: Uuid) -> DomainResult<i64>;
}

/// Persistence contract for replies.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReplyRepository: Send + Sync {
    async fn create_reply(&self, reply: NewReply) -> DomainResult<Reply>;
    async fn find_reply(&self, id: Uuid) -> DomainResult<Option<Reply>>;
    /// Live replies of a post, oldest first.
    async fn list_replies(&self, post_id: Uuid) -> DomainResult<Vec<Reply>>;
    /// Returns `true` only when the reply went from live to deleted.
    async fn soft_delete_reply(&self, id: Uuid) -> DomainResult<bool>;
    async fn count_replies_by_author(&self, author_id: Uuid) -> DomainResult<i64>;
}

/// Persistence contract for accounts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> DomainResult<User>;
    async fn find_user(&self, id: Uuid) -> DomainResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    /// Matches either the username or the email address.
    async fn find_user_by_login(&self, login: &str) -> DomainResult<Option<User>>;
    async fn username_taken(&self, username: &str) -> DomainResult<bool>;
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> DomainResult<bool>;
    async fn update_account(&self, id: Uuid, update: AccountUpdate) -> DomainResult<Option<User>>;
    async fn touch_last_login(&self, id: Uuid) -> DomainResult<()>;
}

/// Persistence contract for profiles and their counters.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Creates the profile when missing and returns it.
    async fn ensure_profile(&self, user_id: Uuid) -> DomainResult<UserProfile>;
    async fn find_profile(&self, user_id: Uuid) -> DomainResult<Option<UserProfile>>;
    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> DomainResult<UserProfile>;
    async fn record_login_ip(&self, user_id: Uuid, ip: &str) -> DomainResult<()>;

    /// In one transaction: ensure the profile, apply `delta` with a
    /// floor of zero, count live featured posts, store the reputation.
    async fn recompute_counters(&self, user_id: Uuid, delta: CounterDelta) -> DomainResult<UserProfile>;
}

/// Persistence contract for notifications.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(&self, notification: NewNotification) -> DomainResult<Notification>;
    /// Newest first.
    async fn list_notifications(&self, recipient_id: Uuid) -> DomainResult<Vec<Notification>>;
    async fn mark_all_read(&self, recipient_id: Uuid) -> DomainResult<u64>;
    /// Marks the given notifications read. Ids owned by someone else are skipped.
    async fn mark_many_read(&self, recipient_id: Uuid, ids: Vec<Uuid>) -> DomainResult<u64>;
    /// Returns `false` when the notification does not belong to the recipient.
    async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> DomainResult<bool>;
    async fn unread_count(&self, recipient_id: Uuid) -> DomainResult<i64>;
}

/// Password hashing contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> DomainResult<String>;
    /// Verifies a password against a stored PHC hash.
    async fn verify_password(&self, password: &str, hash: &str) -> bool;
}
