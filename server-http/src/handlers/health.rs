use crate::models::HealthResponse;
use axum::Json;

/// GET /
pub async fn hello() -> &'static str {
    "Hello world!"
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "ok".into(),
    })
}
