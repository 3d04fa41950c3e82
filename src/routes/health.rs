use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::db;
use crate::error::AppError;
use crate::models::OutboxStats;
use crate::state::SharedState;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn ready(State(state): State<SharedState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "database": "connected",
                "timestamp": Utc::now(),
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "database": "disconnected",
                "error": e.to_string(),
                "timestamp": Utc::now(),
            })),
        ),
    }
}

pub async fn outbox_stats(State(state): State<SharedState>) -> Result<Json<OutboxStats>, AppError> {
    let stats = db::email_outbox::stats(&state.pool, state.config.worker.max_attempts).await?;
    Ok(Json(stats))
}
