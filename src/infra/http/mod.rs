mod admin;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use public::{PublicState, build_public_router};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::Error as SqlxError;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::repos::RepoError;

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    let Err(err) = result else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
    ErrorReport::from_error("infra::http::health", StatusCode::SERVICE_UNAVAILABLE, &err)
        .attach(&mut response);
    response
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    let (status, public_message, detail) = match err {
        RepoError::Duplicate { constraint } => {
            (StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => (
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found".to_string(),
        ),
        RepoError::InvalidInput { message } => {
            (StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => (
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Timeout => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Database timeout",
            "statement canceled by timeout".to_string(),
        ),
        RepoError::Persistence(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    };
    HttpError::new(source, status, public_message, detail)
}
