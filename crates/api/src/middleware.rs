use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use warden_auth::AuthorizationGate;

use crate::app::errors;
use crate::context::{CredentialContext, RequestId};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct AuthState {
    pub gate: AuthorizationGate,
}

/// Admit the request through the gate and attach the caller's identity.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // A header that is not visible ASCII is treated as absent.
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let claims = match state.gate.admit(header) {
        Ok(claims) => claims,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    let credential_id = match claims.credential_id() {
        Ok(id) => id,
        Err(e) => return errors::rejection_to_response(e.into()),
    };

    req.extensions_mut().insert(CredentialContext::new(credential_id));

    next.run(req).await
}

/// Tag the request with an id and log one line when it completes.
pub async fn request_log_middleware(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = RequestId::new();
    req.extensions_mut().insert(request_id);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let started = Instant::now();
    let mut res = next.run(req).instrument(span.clone()).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    span.in_scope(|| {
        tracing::info!(status = res.status().as_u16(), latency_ms, "request completed");
    });

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}
