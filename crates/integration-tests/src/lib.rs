//! Shared fixtures: real services over a fresh SQLite database, in memory
//! by default or in a temporary file when connections must run in parallel.

use std::sync::Arc;

use auth_adapters::Argon2PasswordHasher;
use domains::{Actor, Forum, NewForum, Post, User};
use services::{ForumServices, Repositories, SignupRequest};
use storage_adapters::SqliteStore;
use tempfile::TempDir;

pub const PASSWORD: &str = "correct-horse";

pub struct Harness {
    pub services: ForumServices,
    // Removed on drop, taking the database file with it.
    _dir: Option<TempDir>,
}

impl Harness {
    pub async fn new() -> Self {
        let store = SqliteStore::in_memory().await.expect("in-memory database");
        Self::with_store(store, None)
    }

    /// A WAL database file behind a pool of `max_connections`.
    pub async fn on_disk(max_connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}", dir.path().join("forum.db").display());
        let store = SqliteStore::connect(&url, max_connections).await.expect("file database");
        store.migrate().await.expect("migrations");
        Self::with_store(store, Some(dir))
    }

    fn with_store(store: SqliteStore, dir: Option<TempDir>) -> Self {
        let services = ForumServices::new(
            Repositories::from_store(Arc::new(store)),
            Arc::new(Argon2PasswordHasher::new()),
        );
        Self { services, _dir: dir }
    }

    pub async fn member(&self, username: &str) -> User {
        self.services
            .accounts
            .signup(SignupRequest {
                username: username.to_string(),
                password1: PASSWORD.to_string(),
                password2: PASSWORD.to_string(),
                agree_terms: true,
                ..Default::default()
            })
            .await
            .expect("signup")
    }

    pub async fn staff(&self, username: &str) -> User {
        self.services
            .accounts
            .create_account(username, PASSWORD, true)
            .await
            .expect("staff account")
    }

    pub async fn board(&self, name: &str, moderator_only: bool) -> Forum {
        self.services
            .boards
            .create_board(NewForum {
                name: name.to_string(),
                description: format!("{} board", name),
                icon: String::new(),
                sort_order: 0,
                moderator_only,
            })
            .await
            .expect("board")
    }

    pub async fn post(&self, author: &Actor, forum: &Forum, title: &str, content: &str) -> Post {
        self.services
            .posts
            .create_post(author, forum.id, title, content)
            .await
            .expect("post")
    }
}
