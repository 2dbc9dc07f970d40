use axum::Router;

pub mod actions;
pub mod common;
pub mod credentials;
pub mod roles;
pub mod system;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    credentials::public_router()
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .merge(credentials::router())
        .merge(roles::router())
        .merge(actions::router())
}
