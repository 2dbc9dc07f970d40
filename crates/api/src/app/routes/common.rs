use std::str::FromStr;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use warden_core::{ServiceError, ServiceResult};

use crate::app::errors;

/// Parse a path id; anything but a positive integer is a validation error.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = ServiceError>,
{
    raw.parse().map_err(errors::service_error_to_response)
}

/// Unwrap a JSON body, turning extractor rejections into our error shape.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(errors::json_rejection_to_response)
}

/// Serialize a service result with `status` on success.
pub fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
