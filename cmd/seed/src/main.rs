//! Seeds a fresh database: built-in themes, a starter set of boards and
//! optionally a staff account. Every step is idempotent.

use std::sync::Arc;

use anyhow::Context;
use auth_adapters::Argon2PasswordHasher;
use configs::Settings;
use domains::NewForum;
use secrecy::ExposeSecret;
use services::{ForumServices, Repositories};
use storage_adapters::SqliteStore;
use tracing_subscriber::EnvFilter;

/// (name, description, icon, moderator_only)
const STARTER_BOARDS: &[(&str, &str, &str, bool)] = &[
    ("Announcements", "News from the forum team", "📢", false),
    ("General Discussion", "Anything that does not fit elsewhere", "💬", false),
    ("Help & Support", "Questions about using the forum", "❓", false),
    ("Moderators", "Staff coordination", "🛡", true),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter)))
        .init();

    let store = SqliteStore::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("connecting to {}", settings.database.url))?;
    store.migrate().await.context("running migrations")?;
    let services = ForumServices::new(
        Repositories::from_store(Arc::new(store)),
        Arc::new(Argon2PasswordHasher::new()),
    );

    let installed = services.themes.install_builtin_themes().await?;
    tracing::info!(installed, "themes ready");

    for (sort_order, (name, description, icon, moderator_only)) in STARTER_BOARDS.iter().enumerate() {
        let forum = services
            .boards
            .ensure_board(NewForum {
                name: name.to_string(),
                description: description.to_string(),
                icon: icon.to_string(),
                sort_order: i32::try_from(sort_order).unwrap_or(i32::MAX),
                moderator_only: *moderator_only,
            })
            .await
            .with_context(|| format!("creating board {}", name))?;
        tracing::info!(forum_id = %forum.id, name = %forum.name, "board ready");
    }

    match &settings.seed.admin_password {
        Some(password) => {
            let admin = services
                .accounts
                .create_account(&settings.seed.admin_username, password.expose_secret(), true)
                .await
                .context("creating the staff account")?;
            tracing::info!(user_id = %admin.id, username = %admin.username, "staff account ready");
        }
        None => tracing::warn!("FORUM__SEED__ADMIN_PASSWORD not set; skipping the staff account"),
    }
    Ok(())
}
