use axum::{Json, http::StatusCode, response::IntoResponse};

use crate::app::dto::StatusResponse;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(StatusResponse::ok()))
}
