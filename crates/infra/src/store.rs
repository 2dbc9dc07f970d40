//! Storage boundaries.
//!
//! Each trait is implemented by [`crate::InMemoryStore`] and
//! [`crate::PostgresStore`]. Every mutating call is atomic: it either commits
//! in full or leaves storage untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::{
    Action, ActionId, ActionPatch, Credential, CredentialId, LoginIdentifier, NewAction,
    RoleId, RolePatch, RoleWithActions, ServiceError, ServiceResult, SessionToken,
};

/// A credential ready to persist: identifiers plus the password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedCredential {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
}

impl core::fmt::Debug for HashedCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashedCredential")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Insert a credential. A taken username or email is a `Conflict`.
    async fn insert_credential(&self, credential: HashedCredential) -> ServiceResult<CredentialId>;

    /// Look a credential up by exactly the column the identifier names.
    async fn find_credential(&self, identifier: &LoginIdentifier) -> ServiceResult<Option<Credential>>;

    async fn get_credential(&self, id: CredentialId) -> ServiceResult<Credential>;

    /// Record `token` as the credential's current session token.
    ///
    /// Inserts the row on first login and replaces it afterwards, so at most
    /// one row exists per credential even under concurrent logins.
    async fn upsert_session_token(
        &self,
        credentials_id: CredentialId,
        token: &str,
        ttl_at: DateTime<Utc>,
    ) -> ServiceResult<SessionToken>;

    async fn session_token(&self, credentials_id: CredentialId) -> ServiceResult<Option<SessionToken>>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Create a role. New roles start disabled.
    async fn save_role(&self, name: &str) -> ServiceResult<RoleId>;

    /// Fetch a role with its granted actions, ordered by action id.
    async fn get_role(&self, id: RoleId) -> ServiceResult<RoleWithActions>;

    /// Apply the fields present in `patch`; absent fields keep their value.
    async fn update_role(&self, id: RoleId, patch: &RolePatch) -> ServiceResult<()>;

    async fn delete_role(&self, _id: RoleId) -> ServiceResult<()> {
        Err(ServiceError::not_implemented("role deletion"))
    }
}

#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Create an action. New actions start disabled.
    async fn save_action(&self, action: &NewAction) -> ServiceResult<ActionId>;

    async fn get_action(&self, id: ActionId) -> ServiceResult<Action>;

    async fn update_action(&self, id: ActionId, patch: &ActionPatch) -> ServiceResult<()>;
}

/// Role/action and role/credential links.
///
/// Granting an existing link and revoking a missing one both succeed.
/// Referencing a row that does not exist is `NotFound`.
#[async_trait]
pub trait AssociationManager: Send + Sync {
    async fn grant_action(&self, role: RoleId, action: ActionId) -> ServiceResult<()>;

    async fn revoke_action(&self, role: RoleId, action: ActionId) -> ServiceResult<()>;

    async fn grant_role(&self, role: RoleId, credential: CredentialId) -> ServiceResult<()>;

    async fn revoke_role(&self, role: RoleId, credential: CredentialId) -> ServiceResult<()>;

    /// Whether any enabled role held by `credential` grants the enabled
    /// action `action` on `entity`.
    async fn credential_holds_action(
        &self,
        credential: CredentialId,
        action: &str,
        entity: &str,
    ) -> ServiceResult<bool>;
}
