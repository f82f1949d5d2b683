//! Route table and the middleware stack around it.

use axum::{
    extract::Request,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::handlers::{auth, boards, notifications, posts, profiles, replies, system, themes};
use crate::state::AppState;

/// HTTP-level settings that do not belong to any service.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub cookie_name: String,
    pub secure_cookies: bool,
    pub inactivity_minutes: i64,
    pub static_dir: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            cookie_name: "forum_session".to_string(),
            secure_cookies: false,
            inactivity_minutes: 60 * 24 * 14,
            static_dir: "static".to_string(),
        }
    }
}

/// Routes only. Handlers that read the session need the layers from `app`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(themes::home))
        // Themes
        .route("/themes/", get(themes::list))
        .route("/themes/create/", post(themes::create))
        .route("/themes/edit/{id}/", post(themes::edit))
        .route("/themes/delete/{id}/", post(themes::delete))
        .route("/themes/switch/{id}/", post(themes::switch))
        .route("/api/theme-variables/", get(themes::variables).post(themes::variables))
        // Boards and posts
        .route("/forum/", get(boards::index))
        .route("/forum/{id}/", get(boards::detail))
        .route("/forum/{id}/create/", get(posts::new_form).post(posts::create))
        .route("/post/{id}/", get(posts::show))
        .route("/post/{id}/edit/", get(posts::edit_form).post(posts::edit))
        .route("/post/{id}/delete/", post(posts::delete))
        .route("/post/{id}/essence/", post(posts::toggle_essence))
        .route("/post/{id}/top/", post(posts::toggle_top))
        // Replies
        .route("/post/{id}/reply/", post(replies::create))
        .route("/reply/{id}/delete/", post(replies::delete))
        // Profiles
        .route("/user/profile/", get(profiles::own))
        .route("/user/profile/edit/", get(profiles::edit_form).post(profiles::edit))
        .route("/user/profile/{username}/", get(profiles::by_username))
        // Notifications
        .route("/notifications/", get(notifications::list).post(notifications::read_all))
        .route("/notifications/read-all/", post(notifications::read_all))
        .route("/notifications/{id}/read/", post(notifications::read_one))
        // Accounts
        .route("/accounts/login/", get(auth::login_form).post(auth::login))
        .route("/accounts/signup/", get(auth::signup_form).post(auth::signup))
        .route("/accounts/logout/", post(auth::logout))
        // Operations
        .route("/healthz", get(system::healthz))
        .route("/metrics", get(system::metrics))
        .with_state(state)
}

/// The full application: routes, static files, sessions, tracing and
/// request ids.
pub fn app(state: AppState, opts: &HttpOptions) -> Router {
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_name(opts.cookie_name.clone())
        .with_secure(opts.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(opts.inactivity_minutes)));

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    router(state)
        .nest_service("/static", ServeDir::new(&opts.static_dir))
        .layer(sessions)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
