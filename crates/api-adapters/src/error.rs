//! HTTP error type. Every handler returns `ApiResult`, so domain failures
//! become either an HTML error page or a `{"success": false, ...}` body.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use domains::DomainError;
use serde_json::json;
use thiserror::Error;

use crate::templates::ErrorTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Json,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub format: Format,
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound(..) => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn page(err: DomainError) -> Self {
        Self::from_domain(err, Format::Html)
    }

    pub fn json(err: DomainError) -> Self {
        Self::from_domain(err, Format::Json)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            format: Format::Html,
        }
    }

    pub fn with_format(self, format: Format) -> Self {
        Self { format, ..self }
    }

    fn from_domain(err: DomainError, format: Format) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            // Keep the detail in the logs only.
            tracing::error!(error = %err, "request failed");
        }
        Self { status, message: err.user_message(), format }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::page(err)
    }
}

impl From<askama::Error> for ApiError {
    fn from(err: askama::Error) -> Self {
        tracing::error!(error = %err, "template rendering failed");
        Self::internal("internal server error")
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        tracing::error!(error = %err, "session store failure");
        Self::internal("internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.format {
            Format::Json => (
                self.status,
                Json(json!({ "success": false, "message": self.message })),
            )
                .into_response(),
            Format::Html => {
                let page = ErrorTemplate { status: self.status.as_u16(), message: self.message.clone() };
                match page.render() {
                    Ok(body) => (self.status, Html(body)).into_response(),
                    Err(e) => {
                        tracing::error!(error = %e, "error page rendering failed");
                        (self.status, self.message).into_response()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn domain_errors_map_to_status_codes() {
        assert_eq!(status_for(&DomainError::not_found("Post", 1)), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&DomainError::Validation("x".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&DomainError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&DomainError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&DomainError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn json_errors_use_the_failure_envelope() {
        let response = ApiError::json(DomainError::Forbidden("insufficient permissions".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "insufficient permissions");
    }

    #[tokio::test]
    async fn internal_details_stay_out_of_the_page() {
        let response = ApiError::page(DomainError::Internal("disk I/O error".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("internal server error"));
        assert!(!html.contains("disk I/O"));
    }
}
