//! # services
//!
//! Business rules of forum-board. Each service owns the ports it needs and
//! enforces invariants on every mutation; handlers never talk to a
//! repository directly.

pub mod accounts;
pub mod boards;
pub mod counters;
pub mod notifications;
pub mod posts;
pub mod replies;
pub mod themes;

use std::sync::Arc;

use domains::{
    ForumRepository, NotificationRepository, PasswordHasher, PostRepository, ProfileRepository,
    ReplyRepository, ThemeRepository, UserRepository,
};

pub use accounts::{AccountService, ProfilePage, SignupRequest};
pub use boards::BoardService;
pub use counters::CounterService;
pub use notifications::NotificationService;
pub use posts::{PostDetail, PostService};
pub use replies::ReplyService;
pub use themes::{ThemeDetail, ThemeService, ThemeUpsert};

/// Every port the services need, usually all backed by the same store.
#[derive(Clone)]
pub struct Repositories {
    pub themes: Arc<dyn ThemeRepository>,
    pub forums: Arc<dyn ForumRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub replies: Arc<dyn ReplyRepository>,
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    /// Wires every port to one adapter implementing all of them.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ThemeRepository
            + ForumRepository
            + PostRepository
            + ReplyRepository
            + UserRepository
            + ProfileRepository
            + NotificationRepository
            + 'static,
    {
        Self {
            themes: store.clone(),
            forums: store.clone(),
            posts: store.clone(),
            replies: store.clone(),
            users: store.clone(),
            profiles: store.clone(),
            notifications: store,
        }
    }
}

/// The full service graph handed to the HTTP layer.
#[derive(Clone)]
pub struct ForumServices {
    pub themes: ThemeService,
    pub boards: BoardService,
    pub posts: PostService,
    pub replies: ReplyService,
    pub counters: CounterService,
    pub notifications: NotificationService,
    pub accounts: AccountService,
}

impl ForumServices {
    pub fn new(repos: Repositories, hasher: Arc<dyn PasswordHasher>) -> Self {
        let counters = CounterService::new(repos.profiles.clone());
        let boards = BoardService::new(repos.forums.clone(), repos.posts.clone());
        Self {
            themes: ThemeService::new(repos.themes.clone()),
            posts: PostService::new(
                repos.posts.clone(),
                repos.replies.clone(),
                boards.clone(),
                counters.clone(),
            ),
            replies: ReplyService::new(
                repos.replies.clone(),
                repos.posts.clone(),
                repos.notifications.clone(),
                counters.clone(),
            ),
            notifications: NotificationService::new(repos.notifications.clone()),
            accounts: AccountService::new(
                repos.users.clone(),
                repos.profiles.clone(),
                repos.posts.clone(),
                repos.replies.clone(),
                hasher,
            ),
            boards,
            counters,
        }
    }
}
