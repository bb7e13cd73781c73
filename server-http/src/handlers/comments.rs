use super::{error_response, rejection_response, validation_response, ApiError};
use crate::models::{ContentRequest, CreatedResponse};
use crate::state::AppState;
use crate::validation::validate_content;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use bulletin::Comment;
use tracing::info;

/// GET /posts/{id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    state
        .post_service
        .list_comments(&post_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /posts/{id}/comments/{comment_id}
pub async fn get_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Json<Comment>, ApiError> {
    info!("GET_COMMENT: post={}, comment={}", post_id, comment_id);

    state
        .post_service
        .get_comment(&post_id, &comment_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /posts/{id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    body: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(req) = body.map_err(rejection_response)?;
    validate_content(&req).map_err(validation_response)?;
    info!("CREATE_COMMENT: post={}, user_id={}", post_id, req.user_id);

    let id = state
        .post_service
        .create_comment(&post_id, &req.content, &req.user_id)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// PUT /posts/{id}/comments/{comment_id}
pub async fn update_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
    body: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<Comment>, ApiError> {
    let Json(req) = body.map_err(rejection_response)?;
    validate_content(&req).map_err(validation_response)?;
    info!(
        "UPDATE_COMMENT: post={}, comment={}, user_id={}",
        post_id, comment_id, req.user_id
    );

    state
        .post_service
        .update_comment(&post_id, &comment_id, &req.content, &req.user_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// DELETE /posts/{id}/comments/{comment_id}
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Json<Comment>, ApiError> {
    info!("DELETE_COMMENT: post={}, comment={}", post_id, comment_id);

    state
        .post_service
        .delete_comment(&post_id, &comment_id)
        .await
        .map(Json)
        .map_err(error_response)
}
