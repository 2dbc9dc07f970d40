use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use warden_auth::Rejection;
use warden_core::{ErrorKind, ServiceError};

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a service error to its response. Internal detail is logged, never returned.
pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let kind = err.kind();
    if let ServiceError::Internal(detail) = &err {
        tracing::error!(error = %detail, "request failed");
    }
    json_error(status_for(kind), kind.as_str(), err.public_message())
}

pub fn rejection_to_response(rejection: Rejection) -> axum::response::Response {
    service_error_to_response(rejection.into())
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        ErrorKind::Validation.as_str(),
        rejection.body_text(),
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
