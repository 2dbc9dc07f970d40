use async_trait::async_trait;
use tracing::instrument;

use warden_core::{ActionId, CredentialId, RoleId, ServiceError, ServiceResult};

use super::{PostgresStore, is_foreign_key_violation, map_sqlx_error};
use crate::store::AssociationManager;

impl PostgresStore {
    /// Run one link/unlink statement in its own transaction.
    async fn run_link_statement(
        &self,
        operation: &'static str,
        sql: &'static str,
        role: RoleId,
        other: i64,
        missing: &'static str,
    ) -> ServiceResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(sql)
            .bind(role.get())
            .bind(other)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ServiceError::not_found(missing)
                } else {
                    map_sqlx_error(operation, e)
                }
            })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait]
impl AssociationManager for PostgresStore {
    #[instrument(skip(self), fields(role_id = %role, action_id = %action))]
    async fn grant_action(&self, role: RoleId, action: ActionId) -> ServiceResult<()> {
        self.run_link_statement(
            "grant_action",
            "INSERT INTO roles_actions (role_id, action_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            role,
            action.get(),
            "role or action",
        )
        .await
    }

    #[instrument(skip(self), fields(role_id = %role, action_id = %action))]
    async fn revoke_action(&self, role: RoleId, action: ActionId) -> ServiceResult<()> {
        self.run_link_statement(
            "revoke_action",
            "DELETE FROM roles_actions WHERE role_id = $1 AND action_id = $2",
            role,
            action.get(),
            "role or action",
        )
        .await
    }

    #[instrument(skip(self), fields(role_id = %role, credentials_id = %credential))]
    async fn grant_role(&self, role: RoleId, credential: CredentialId) -> ServiceResult<()> {
        self.run_link_statement(
            "grant_role",
            "INSERT INTO roles_credentials (role_id, credentials_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            role,
            credential.get(),
            "role or credentials",
        )
        .await
    }

    #[instrument(skip(self), fields(role_id = %role, credentials_id = %credential))]
    async fn revoke_role(&self, role: RoleId, credential: CredentialId) -> ServiceResult<()> {
        self.run_link_statement(
            "revoke_role",
            "DELETE FROM roles_credentials WHERE role_id = $1 AND credentials_id = $2",
            role,
            credential.get(),
            "role or credentials",
        )
        .await
    }

    #[instrument(skip(self), fields(credentials_id = %credential))]
    async fn credential_holds_action(
        &self,
        credential: CredentialId,
        action: &str,
        entity: &str,
    ) -> ServiceResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM roles_credentials rc
                JOIN role r ON r.id = rc.role_id AND r.enabled
                JOIN roles_actions ra ON ra.role_id = r.id
                JOIN action a ON a.id = ra.action_id AND a.enabled
                WHERE rc.credentials_id = $1 AND a.action = $2 AND a.entity = $3
            )
            "#,
        )
        .bind(credential.get())
        .bind(action)
        .bind(entity)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("credential_holds_action", e))
    }
}
