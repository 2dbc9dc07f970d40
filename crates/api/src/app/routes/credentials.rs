use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use warden_core::{CredentialId, LoginIdentifier, NewCredential, ServiceError};

use crate::app::dto::{
    AuthRequest, CreateCredentialsRequest, IdResponse, RoleLinkRequest, StatusResponse, TokenResponse,
};
use crate::app::routes::common::{json_body, parse_id, respond};
use crate::app::{errors, services::AppServices};
use crate::context::CredentialContext;

pub fn public_router() -> Router {
    Router::new()
        .route("/auth", post(authenticate))
        .route("/credentials", post(save_credentials))
}

pub fn router() -> Router {
    Router::new()
        .route("/credentials/:id", get(get_credentials))
        .route("/credentials/:id/roles", post(grant_role).delete(revoke_role))
}

/// POST /auth - exchange a username or email plus password for a token
pub async fn authenticate(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Response {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(res) => return res,
    };
    let identifier = match LoginIdentifier::from_parts(req.username, req.email) {
        Ok(identifier) => identifier,
        Err(e) => return errors::service_error_to_response(e),
    };
    if req.password.is_empty() {
        return errors::service_error_to_response(ServiceError::validation("password must be provided"));
    }

    let result = services
        .run("authenticate", services.credentials.authenticate(identifier, &req.password))
        .await
        .map(|issued| TokenResponse {
            expires_at: issued.expires_at(),
            token: issued.token,
        });
    respond(StatusCode::OK, result)
}

/// POST /credentials - register a new credential
pub async fn save_credentials(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreateCredentialsRequest>, JsonRejection>,
) -> Response {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(res) => return res,
    };
    let new = match NewCredential::new(req.username, req.email, req.password) {
        Ok(new) => new,
        Err(e) => return errors::service_error_to_response(e),
    };

    let result = services
        .run("save_credentials", services.credentials.save_credentials(new))
        .await
        .map(|id| IdResponse { id: id.get() });
    respond(StatusCode::CREATED, result)
}

/// GET /credentials/:id - fetch a credential (the password hash is never serialized)
pub async fn get_credentials(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: CredentialId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let result = services
        .run("get_credentials", services.credentials.get_credentials(id))
        .await;
    respond(StatusCode::OK, result)
}

/// POST /credentials/:id/roles - assign a role to a credential
pub async fn grant_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CredentialContext>,
    Path(id): Path<String>,
    payload: Result<Json<RoleLinkRequest>, JsonRejection>,
) -> Response {
    let (id, req) = match link_input(&id, payload) {
        Ok(input) => input,
        Err(res) => return res,
    };
    tracing::info!(actor = %caller.credential_id(), credentials_id = %id, role_id = %req.role_id, "granting role");

    let result = services
        .run("grant_role", services.associations.grant_role(req.role_id, id))
        .await
        .map(|()| StatusResponse::ok());
    respond(StatusCode::OK, result)
}

/// DELETE /credentials/:id/roles - remove a role from a credential
pub async fn revoke_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CredentialContext>,
    Path(id): Path<String>,
    payload: Result<Json<RoleLinkRequest>, JsonRejection>,
) -> Response {
    let (id, req) = match link_input(&id, payload) {
        Ok(input) => input,
        Err(res) => return res,
    };
    tracing::info!(actor = %caller.credential_id(), credentials_id = %id, role_id = %req.role_id, "revoking role");

    let result = services
        .run("revoke_role", services.associations.revoke_role(req.role_id, id))
        .await
        .map(|()| StatusResponse::ok());
    respond(StatusCode::OK, result)
}

fn link_input(
    raw_id: &str,
    payload: Result<Json<RoleLinkRequest>, JsonRejection>,
) -> Result<(CredentialId, RoleLinkRequest), Response> {
    Ok((parse_id(raw_id)?, json_body(payload)?))
}
