use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use warden_core::{ActionId, ActionPatch, NewAction};

use crate::app::dto::{CreateActionRequest, IdResponse, UpdateActionRequest};
use crate::app::routes::common::{json_body, parse_id, respond};
use crate::app::{errors, services::AppServices};
use crate::context::CredentialContext;

pub fn router() -> Router {
    Router::new()
        .route("/actions", post(save_action))
        .route("/actions/:id", get(get_action).patch(update_action))
}

/// POST /actions - create an action (disabled until enabled by an update)
pub async fn save_action(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CredentialContext>,
    payload: Result<Json<CreateActionRequest>, JsonRejection>,
) -> Response {
    let action = match json_body(payload).and_then(|req| {
        NewAction::new(req.action, req.entity).map_err(errors::service_error_to_response)
    }) {
        Ok(action) => action,
        Err(res) => return res,
    };
    tracing::info!(
        actor = %caller.credential_id(),
        action = action.action(),
        entity = action.entity(),
        "creating action"
    );

    let result = services
        .run("save_action", services.actions.save_action(&action))
        .await
        .map(|id| IdResponse { id: id.get() });
    respond(StatusCode::CREATED, result)
}

/// GET /actions/:id
pub async fn get_action(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: ActionId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let result = services.run("get_action", services.actions.get_action(id)).await;
    respond(StatusCode::OK, result)
}

/// PATCH /actions/:id - update only the supplied fields
pub async fn update_action(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CredentialContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateActionRequest>, JsonRejection>,
) -> Response {
    let id: ActionId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let patch = match json_body(payload).and_then(|req| {
        ActionPatch::from(req)
            .validated()
            .map_err(errors::service_error_to_response)
    }) {
        Ok(patch) => patch,
        Err(res) => return res,
    };
    tracing::info!(actor = %caller.credential_id(), action_id = %id, empty = patch.is_empty(), "updating action");

    let result = services
        .run("update_action", services.actions.update_action(id, &patch))
        .await
        .map(|()| IdResponse { id: id.get() });
    respond(StatusCode::OK, result)
}
