use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use warden_core::{RoleId, RolePatch, role_name};

use crate::app::dto::{ActionLinkRequest, CreateRoleRequest, IdResponse, StatusResponse, UpdateRoleRequest};
use crate::app::routes::common::{json_body, parse_id, respond};
use crate::app::{errors, services::AppServices};
use crate::context::CredentialContext;

pub fn router() -> Router {
    Router::new()
        .route("/roles", post(save_role))
        .route("/roles/:id", get(get_role).patch(update_role).delete(delete_role))
        .route("/roles/:id/actions", post(grant_action).delete(revoke_action))
}

/// POST /roles - create a role (disabled until enabled by an update)
pub async fn save_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CredentialContext>,
    payload: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> Response {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(res) => return res,
    };
    let name = match role_name(req.name) {
        Ok(name) => name,
        Err(e) => return errors::service_error_to_response(e),
    };
    tracing::info!(actor = %caller.credential_id(), name = %name, "creating role");

    let result = services
        .run("save_role", services.roles.save_role(&name))
        .await
        .map(|id| IdResponse { id: id.get() });
    respond(StatusCode::CREATED, result)
}

/// GET /roles/:id - a role and its granted actions
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: RoleId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let result = services.run("get_role", services.roles.get_role(id)).await;
    respond(StatusCode::OK, result)
}

/// PATCH /roles/:id - update only the supplied fields
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CredentialContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Response {
    let id: RoleId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let patch = match json_body(payload).and_then(|req| {
        RolePatch::from(req)
            .validated()
            .map_err(errors::service_error_to_response)
    }) {
        Ok(patch) => patch,
        Err(res) => return res,
    };
    tracing::info!(actor = %caller.credential_id(), role_id = %id, empty = patch.is_empty(), "updating role");

    let result = services
        .run("update_role", services.roles.update_role(id, &patch))
        .await
        .map(|()| IdResponse { id: id.get() });
    respond(StatusCode::OK, result)
}

/// DELETE /roles/:id - declared but not implemented
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: RoleId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let result = services
        .run("delete_role", services.roles.delete_role(id))
        .await
        .map(|()| StatusResponse::ok());
    respond(StatusCode::OK, result)
}

/// POST /roles/:id/actions - grant an action to a role
pub async fn grant_action(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CredentialContext>,
    Path(id): Path<String>,
    payload: Result<Json<ActionLinkRequest>, JsonRejection>,
) -> Response {
    let (id, req) = match link_input(&id, payload) {
        Ok(input) => input,
        Err(res) => return res,
    };
    tracing::info!(actor = %caller.credential_id(), role_id = %id, action_id = %req.action_id, "granting action");

    let result = services
        .run("grant_action", services.associations.grant_action(id, req.action_id))
        .await
        .map(|()| StatusResponse::ok());
    respond(StatusCode::OK, result)
}

/// DELETE /roles/:id/actions - revoke an action from a role
pub async fn revoke_action(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CredentialContext>,
    Path(id): Path<String>,
    payload: Result<Json<ActionLinkRequest>, JsonRejection>,
) -> Response {
    let (id, req) = match link_input(&id, payload) {
        Ok(input) => input,
        Err(res) => return res,
    };
    tracing::info!(actor = %caller.credential_id(), role_id = %id, action_id = %req.action_id, "revoking action");

    let result = services
        .run("revoke_action", services.associations.revoke_action(id, req.action_id))
        .await
        .map(|()| StatusResponse::ok());
    respond(StatusCode::OK, result)
}

fn link_input(
    raw_id: &str,
    payload: Result<Json<ActionLinkRequest>, JsonRejection>,
) -> Result<(RoleId, ActionLinkRequest), Response> {
    Ok((parse_id(raw_id)?, json_body(payload)?))
}
