//! # api-adapters
//!
//! The HTTP surface of forum-board: axum routes, session handling, askama
//! page rendering and the Prometheus endpoint. Handlers only translate
//! between HTTP and the `services` crate.

pub mod metrics;
pub mod templates;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod router;
#[cfg(feature = "web-axum")]
pub mod session;
#[cfg(feature = "web-axum")]
pub mod state;

pub use metrics::{ForumEvent, Metrics};

#[cfg(feature = "web-axum")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "web-axum")]
pub use router::{app, router, HttpOptions};
#[cfg(feature = "web-axum")]
pub use state::AppState;
