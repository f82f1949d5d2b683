//! # Domain Models
//!
//! These structs represent the core entities of forum-board.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::rules;

// ── Identity ────────────────────────────────────────────────────────────────

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub username: String,
    pub is_staff: bool,
}

impl Actor {
    /// Authors may touch their own content; staff may touch anything.
    pub fn can_manage(&self, owner_id: Uuid) -> bool {
        self.is_staff || self.user_id == owner_id
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// PHC-formatted password hash, never rendered
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            username: self.username.clone(),
            is_staff: self.is_staff,
        }
    }

    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
}

/// Account fields a user may change about themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

// ── Profiles ────────────────────────────────────────────────────────────────

/// One-to-one extension of `User` carrying denormalized activity counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub avatar: Option<String>,
    pub bio: String,
    pub signature: String,
    pub post_count: i64,
    pub reply_count: i64,
    pub reputation: i64,
    pub last_login_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub avatar: Option<String>,
    pub bio: String,
    pub signature: String,
}

/// Change applied to a user's post/reply counters before reputation is
/// recomputed. A zero delta only refreshes reputation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub posts: i64,
    pub replies: i64,
}

impl CounterDelta {
    pub const POST_CREATED: Self = Self { posts: 1, replies: 0 };
    pub const POST_DELETED: Self = Self { posts: -1, replies: 0 };
    pub const REPLY_CREATED: Self = Self { posts: 0, replies: 1 };
    pub const REPLY_DELETED: Self = Self { posts: 0, replies: -1 };
    pub const NONE: Self = Self { posts: 0, replies: 0 };
}

// ── Themes ──────────────────────────────────────────────────────────────────

/// A named set of CSS variable values. At most one is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: Uuid,
    pub name: String,
    /// Short unique handle (e.g., "dark")
    pub identifier: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeVariable {
    pub theme_id: Uuid,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTheme {
    pub name: String,
    pub identifier: String,
    pub variables: Vec<(String, String)>,
}

/// Replacement values for an existing theme. `variables: None` leaves the
/// stored variable set untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeChanges {
    pub name: String,
    pub identifier: String,
    pub variables: Option<Vec<(String, String)>>,
}

// ── Boards ──────────────────────────────────────────────────────────────────

/// A topic board (called a forum in the UI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: String,
    /// Sort rank, lower first
    pub sort_order: i32,
    pub is_active: bool,
    /// Only staff may see or post in the board
    pub moderator_only: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Forum {
    pub fn visible_to(&self, actor: Option<&Actor>) -> bool {
        self.is_active && (!self.moderator_only || actor.is_some_and(|a| a.is_staff))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewForum {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub sort_order: i32,
    pub moderator_only: bool,
}

/// Board entry on the index page with its live statistics.
#[derive(Debug, Clone)]
pub struct ForumSummary {
    pub forum: Forum,
    pub post_count: i64,
    pub last_post: Option<Post>,
}

// ── Posts ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Published,
    Draft,
    Hidden,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Draft => "draft",
            Self::Hidden => "hidden",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(Self::Published),
            "draft" => Ok(Self::Draft),
            "hidden" => Ok(Self::Hidden),
            other => Err(DomainError::Validation(format!("unknown post status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub forum_id: Uuid,
    pub author_id: Uuid,
    /// Joined from the users table for display
    pub author_username: String,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    /// Pinned to the top of the board
    pub is_top: bool,
    /// Featured ("essence") by staff
    pub is_essence: bool,
    pub is_deleted: bool,
    pub view_count: i64,
    pub reply_count: i64,
    pub last_reply_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_publicly_visible(&self) -> bool {
        !self.is_deleted && self.status == PostStatus::Published
    }

    pub fn excerpt(&self) -> String {
        rules::excerpt(&self.content, rules::POST_EXCERPT_CHARS)
    }

    pub fn path(&self) -> String {
        format!("/post/{}/", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub forum_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEdit {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
}

/// Board listing sort modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    /// Pinned first, then most recent reply, then newest
    #[default]
    Latest,
    /// Only featured posts, in default order
    Essence,
    /// Most replies, then most views, then newest
    Hot,
}

impl PostSort {
    /// Unknown values fall back to the default ordering.
    pub fn from_param(raw: &str) -> Self {
        match raw {
            "essence" => Self::Essence,
            "hot" => Self::Hot,
            _ => Self::Latest,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Essence => "essence",
            Self::Hot => "hot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub forum_id: Uuid,
    /// Case-insensitive substring over title and content
    pub search: Option<String>,
    pub sort: PostSort,
    /// 1-based
    pub page: u32,
    pub per_page: u32,
}

/// One page of an ordered result set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, already clamped into range
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn num_pages(&self) -> u32 {
        rules::page_count(self.total, self.per_page)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages()
    }
}

// ── Replies ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub content: String,
    /// One level of threading
    pub parent_reply_id: Option<Uuid>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReply {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub parent_reply_id: Option<Uuid>,
}

// ── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reply,
    Mention,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Mention => "mention",
            Self::System => "system",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reply" => Ok(Self::Reply),
            "mention" => Ok(Self::Mention),
            "system" => Ok(Self::System),
            other => Err(DomainError::Internal(format!("unknown notification kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    /// Where clicking the notification leads
    pub url: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub url: String,
}
