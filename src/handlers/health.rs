// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::error::AppError;

/// Liveness probe that also checks the database is reachable.
pub async fn health(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({ "status": "ok" })))
}
