//! forum-board server: loads settings, migrates the database, installs the
//! built-in themes and serves the HTTP application until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use api_adapters::{app, AppState, HttpOptions};
use auth_adapters::Argon2PasswordHasher;
use configs::{LoggingSettings, Settings};
use services::{ForumServices, Repositories};
use storage_adapters::SqliteStore;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.logging);

    let store = SqliteStore::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("connecting to {}", settings.database.url))?;
    store.migrate().await.context("running migrations")?;

    let services = ForumServices::new(
        Repositories::from_store(Arc::new(store)),
        Arc::new(Argon2PasswordHasher::new()),
    );
    if settings.themes.install_builtin {
        services
            .themes
            .install_builtin_themes()
            .await
            .context("installing built-in themes")?;
    }

    let opts = HttpOptions {
        cookie_name: settings.session.cookie_name.clone(),
        secure_cookies: settings.session.secure,
        inactivity_minutes: settings.session.inactivity_minutes,
        static_dir: settings.server.static_dir.clone(),
    };
    if !opts.secure_cookies {
        tracing::warn!("secure cookies disabled; set FORUM__SESSION__SECURE=true behind HTTPS");
    }
    let router = app(AppState::new(services), &opts);

    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, "forum-board listening");

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
