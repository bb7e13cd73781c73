use super::{error_response, rejection_response, validation_response, ApiError};
use crate::models::{ContentRequest, CreatedResponse};
use crate::state::AppState;
use crate::validation::validate_content;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use bulletin::Post;
use tracing::info;

/// GET /posts
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    state
        .post_service
        .list_posts()
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    info!("GET_POST: id={}", id);

    state
        .post_service
        .get_post(&id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /posts
pub async fn create_post(
    State(state): State<AppState>,
    body: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(req) = body.map_err(rejection_response)?;
    validate_content(&req).map_err(validation_response)?;
    info!("CREATE_POST: user_id={}", req.user_id);

    let id = state
        .post_service
        .create_post(&req.content, &req.user_id)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// PUT /posts/{id}
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<Post>, ApiError> {
    let Json(req) = body.map_err(rejection_response)?;
    validate_content(&req).map_err(validation_response)?;
    info!("UPDATE_POST: id={}, user_id={}", id, req.user_id);

    state
        .post_service
        .update_post(&id, &req.content, &req.user_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// DELETE /posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    info!("DELETE_POST: id={}", id);

    state
        .post_service
        .delete_post(&id)
        .await
        .map(Json)
        .map_err(error_response)
}
