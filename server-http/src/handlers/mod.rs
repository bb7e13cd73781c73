pub mod comments;
pub mod health;
pub mod posts;

pub use comments::{create_comment, delete_comment, get_comment, list_comments, update_comment};
pub use health::{health_check, hello};
pub use posts::{create_post, delete_post, get_post, list_posts, update_post};

use crate::models::ErrorResponse;
use crate::validation::ValidationError;
use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use tracing::error;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Not-found becomes 404, store or cache failures become 500
pub(crate) fn error_response(err: shared::Error) -> ApiError {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        error!("Request failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(ErrorResponse::new(err.to_string())))
}

pub(crate) fn validation_response(err: ValidationError) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(err.to_string())))
}

/// Unreadable or mistyped JSON bodies get the same 400 envelope as blank fields
pub(crate) fn rejection_response(rejection: JsonRejection) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(rejection.body_text())),
    )
}
