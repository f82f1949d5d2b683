//! Askama page templates and the flat view models they render.
//!
//! View models hold display-ready strings so templates stay logic-free.

use std::collections::BTreeMap;

use askama::Template;
use chrono::{DateTime, Utc};
use domains::{
    excerpt, ForumSummary, Notification, Page, Post, Reply, ThemeVariable, REPLY_EXCERPT_CHARS,
};
use services::ThemeDetail;

pub fn stamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// `--name: value;` declarations for the page's `:root` block. The output
/// is emitted unescaped, so characters that could leave the declaration or
/// the style element are dropped.
pub fn css_declarations(variables: &BTreeMap<String, String>) -> String {
    let clean = |raw: &str| -> String {
        raw.chars()
            .filter(|c| !matches!(c, '<' | '>' | '{' | '}' | ';'))
            .collect()
    };
    variables
        .iter()
        .map(|(name, value)| format!("--{}: {};", clean(name), clean(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One `name=value` pair per line, the format the theme edit form accepts.
pub fn variables_text(variables: &[ThemeVariable]) -> String {
    variables
        .iter()
        .map(|v| format!("{}={}", v.name, v.value))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Layout ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FlashView {
    pub class: String,
    pub message: String,
}

/// Everything `base.html` needs: theme, navigation and flash messages.
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    pub page_title: String,
    pub theme_css: String,
    pub is_authenticated: bool,
    pub username: String,
    pub is_staff: bool,
    pub unread_count: i64,
    pub flashes: Vec<FlashView>,
}

// ── Themes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ThemeRow {
    pub id: String,
    pub name: String,
    pub identifier: String,
    pub is_active: bool,
    pub variables: Vec<(String, String)>,
    pub variables_text: String,
}

impl From<&ThemeDetail> for ThemeRow {
    fn from(detail: &ThemeDetail) -> Self {
        Self {
            id: detail.theme.id.to_string(),
            name: detail.theme.name.clone(),
            identifier: detail.theme.identifier.clone(),
            is_active: detail.theme.is_active,
            variables: detail
                .variables
                .iter()
                .map(|v| (v.name.clone(), v.value.clone()))
                .collect(),
            variables_text: variables_text(&detail.variables),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub chrome: Chrome,
    pub active_theme: String,
    pub variables: Vec<(String, String)>,
}

#[derive(Template)]
#[template(path = "theme_list.html")]
pub struct ThemeListTemplate {
    pub chrome: Chrome,
    pub themes: Vec<ThemeRow>,
    pub form_error: String,
    pub form_name: String,
    pub form_identifier: String,
}

// ── Boards ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ForumRow {
    pub url: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub moderator_only: bool,
    pub post_count: i64,
    pub has_last_post: bool,
    pub last_post_title: String,
    pub last_post_url: String,
    pub last_post_author: String,
    pub last_post_at: String,
}

impl From<&ForumSummary> for ForumRow {
    fn from(summary: &ForumSummary) -> Self {
        let last = summary.last_post.as_ref();
        Self {
            url: format!("/forum/{}/", summary.forum.id),
            name: summary.forum.name.clone(),
            description: summary.forum.description.clone(),
            icon: summary.forum.icon.clone(),
            moderator_only: summary.forum.moderator_only,
            post_count: summary.post_count,
            has_last_post: last.is_some(),
            last_post_title: last.map(|p| p.title.clone()).unwrap_or_default(),
            last_post_url: last.map(Post::path).unwrap_or_default(),
            last_post_author: last.map(|p| p.author_username.clone()).unwrap_or_default(),
            last_post_at: last.map(|p| stamp(&p.created_at)).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub url: String,
    pub title: String,
    pub author: String,
    pub excerpt: String,
    pub is_top: bool,
    pub is_essence: bool,
    pub reply_count: i64,
    pub view_count: i64,
    pub created_at: String,
    pub last_reply_at: String,
}

impl From<&Post> for PostRow {
    fn from(post: &Post) -> Self {
        Self {
            url: post.path(),
            title: post.title.clone(),
            author: post.author_username.clone(),
            excerpt: post.excerpt(),
            is_top: post.is_top,
            is_essence: post.is_essence,
            reply_count: post.reply_count,
            view_count: post.view_count,
            created_at: stamp(&post.created_at),
            last_reply_at: post.last_reply_at.as_ref().map(stamp).unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "forum_index.html")]
pub struct ForumIndexTemplate {
    pub chrome: Chrome,
    pub forums: Vec<ForumRow>,
}

#[derive(Debug, Clone)]
pub struct SortLink {
    pub label: String,
    pub url: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "forum_detail.html")]
pub struct ForumDetailTemplate {
    pub chrome: Chrome,
    pub forum_name: String,
    pub forum_description: String,
    pub create_url: String,
    pub search: String,
    pub sort: String,
    pub sort_links: Vec<SortLink>,
    pub posts: Vec<PostRow>,
    pub total: i64,
    pub page: u32,
    pub num_pages: u32,
    pub prev_url: String,
    pub next_url: String,
}

impl ForumDetailTemplate {
    /// Builds a board page, preserving search and sort in every link.
    pub fn new(chrome: Chrome, forum: &domains::Forum, search: &str, sort: &str, page: &Page<Post>) -> Self {
        let base = format!("/forum/{}/", forum.id);
        let link = |sort: &str, page: u32| {
            let mut params = Vec::new();
            if !search.is_empty() {
                params.push(format!("search={}", encode_query_value(search)));
            }
            if sort != "latest" {
                params.push(format!("sort={}", sort));
            }
            if page > 1 {
                params.push(format!("page={}", page));
            }
            if params.is_empty() {
                base.clone()
            } else {
                format!("{}?{}", base, params.join("&"))
            }
        };
        let sort_links = [("Latest", "latest"), ("Essence", "essence"), ("Hot", "hot")]
            .into_iter()
            .map(|(label, key)| SortLink {
                label: label.to_string(),
                url: link(key, 1),
                selected: key == sort,
            })
            .collect();

        Self {
            chrome,
            forum_name: forum.name.clone(),
            forum_description: forum.description.clone(),
            create_url: format!("{}create/", base),
            search: search.to_string(),
            sort: sort.to_string(),
            sort_links,
            posts: page.items.iter().map(PostRow::from).collect(),
            total: page.total,
            page: page.page,
            num_pages: page.num_pages(),
            prev_url: if page.has_previous() { link(sort, page.page - 1) } else { String::new() },
            next_url: if page.has_next() { link(sort, page.page + 1) } else { String::new() },
        }
    }
}

// ── Posts ───────────────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub chrome: Chrome,
    pub heading: String,
    pub action: String,
    pub cancel_url: String,
    pub title: String,
    pub content: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct ReplyView {
    pub id: String,
    pub author: String,
    pub author_url: String,
    pub content: String,
    pub created_at: String,
    pub has_parent: bool,
    pub parent_author: String,
    pub parent_excerpt: String,
    pub can_delete: bool,
}

impl ReplyView {
    /// `all` is the post's full live reply list, used to resolve parents.
    pub fn build(reply: &Reply, all: &[Reply], can_delete: bool) -> Self {
        let parent = reply
            .parent_reply_id
            .and_then(|id| all.iter().find(|r| r.id == id));
        Self {
            id: reply.id.to_string(),
            author: reply.author_username.clone(),
            author_url: format!("/user/profile/{}/", reply.author_username),
            content: reply.content.clone(),
            created_at: stamp(&reply.created_at),
            has_parent: parent.is_some(),
            parent_author: parent.map(|p| p.author_username.clone()).unwrap_or_default(),
            parent_excerpt: parent
                .map(|p| excerpt(&p.content, REPLY_EXCERPT_CHARS))
                .unwrap_or_default(),
            can_delete,
        }
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub chrome: Chrome,
    pub id: String,
    pub board_url: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub author_url: String,
    pub created_at: String,
    pub updated_at: String,
    pub edited: bool,
    pub view_count: i64,
    pub reply_count: i64,
    pub is_top: bool,
    pub is_essence: bool,
    pub can_manage: bool,
    pub replies: Vec<ReplyView>,
    pub reply_error: String,
    pub reply_draft: String,
}

// ── Profiles ────────────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "user_profile.html")]
pub struct ProfileTemplate {
    pub chrome: Chrome,
    pub username: String,
    pub display_name: String,
    pub avatar: String,
    pub bio: String,
    pub signature: String,
    pub joined_at: String,
    pub post_count: i64,
    pub reply_count: i64,
    pub reputation: i64,
    pub recent_posts: Vec<PostRow>,
    pub is_own_profile: bool,
}

#[derive(Template)]
#[template(path = "edit_profile.html")]
pub struct EditProfileTemplate {
    pub chrome: Chrome,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: String,
    pub bio: String,
    pub signature: String,
    pub error: String,
}

// ── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub is_new: bool,
    pub created_at: String,
}

impl From<&Notification> for NotificationRow {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.to_string(),
            kind: n.kind.as_str().to_string(),
            title: n.title.clone(),
            content: n.content.clone(),
            url: n.url.clone(),
            is_new: !n.is_read,
            created_at: stamp(&n.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "notifications.html")]
pub struct NotificationsTemplate {
    pub chrome: Chrome,
    pub notifications: Vec<NotificationRow>,
}

// ── Accounts ────────────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub login: String,
    pub next: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub chrome: Chrome,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub error: String,
}

/// Standalone error page; it renders without session or theme lookups.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: String,
}

/// Percent-encodes a query-string value.
pub fn encode_query_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}
