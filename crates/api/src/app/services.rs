//! Service wiring: picks a storage backend and builds the shared services.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use warden_auth::{AuthorizationGate, HashError, PasswordHasher, TokenError, TokenIssuer};
use warden_core::{ServiceError, ServiceResult};
use warden_infra::{
    ActionStore, AppConfig, AssociationManager, CredentialRepository, CredentialStore, InMemoryStore,
    PostgresStore, RoleStore, with_deadline,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("password hasher: {0}")]
    Hasher(#[from] HashError),

    #[error("token issuer: {0}")]
    Token(#[from] TokenError),

    #[error("database connection: {0}")]
    Database(#[from] sqlx::Error),

    #[error("schema bootstrap: {0}")]
    Schema(#[from] ServiceError),
}

/// Everything a handler needs, shared behind an `Arc`.
pub struct AppServices {
    pub credentials: CredentialStore,
    pub roles: Arc<dyn RoleStore>,
    pub actions: Arc<dyn ActionStore>,
    pub associations: Arc<dyn AssociationManager>,
    pub request_timeout: Duration,
}

impl AppServices {
    /// Wire every service onto one backend implementing all store traits.
    pub fn from_store<S>(
        store: Arc<S>,
        hasher: Arc<PasswordHasher>,
        issuer: Arc<TokenIssuer>,
        request_timeout: Duration,
    ) -> Self
    where
        S: CredentialRepository + RoleStore + ActionStore + AssociationManager + 'static,
    {
        Self {
            credentials: CredentialStore::new(store.clone(), hasher, issuer),
            roles: store.clone(),
            actions: store.clone(),
            associations: store,
            request_timeout,
        }
    }

    /// Run a store operation under the per-request deadline.
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        with_deadline(self.request_timeout, operation, fut).await
    }
}

/// Build services and the request gate from process configuration.
///
/// Without `DATABASE_URL` the in-memory backend is used; its contents are
/// lost on restart.
pub async fn build_services(config: &AppConfig) -> Result<(Arc<AppServices>, AuthorizationGate), StartupError> {
    let hasher = Arc::new(PasswordHasher::new(config.hashing)?);
    let issuer = Arc::new(TokenIssuer::new(config.jwt_secret.as_bytes())?.with_ttl(config.token_ttl));
    let gate = AuthorizationGate::new(issuer.clone());

    let services = match &config.database {
        Some(db) => {
            let store = PostgresStore::connect(db).await?;
            store.ensure_schema().await?;
            AppServices::from_store(Arc::new(store), hasher, issuer, config.request_timeout)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage");
            AppServices::from_store(
                Arc::new(InMemoryStore::new()),
                hasher,
                issuer,
                config.request_timeout,
            )
        }
    };

    Ok((Arc::new(services), gate))
}
