use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{Span, instrument};

use warden_core::{Action, ActionId, Role, RoleId, RolePatch, RoleWithActions, ServiceError, ServiceResult};

use super::{PostgresStore, map_sqlx_error};
use crate::store::RoleStore;

#[async_trait]
impl RoleStore for PostgresStore {
    #[instrument(skip(self), fields(role_id))]
    async fn save_role(&self, name: &str) -> ServiceResult<RoleId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let id: i64 = sqlx::query_scalar("INSERT INTO role (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("save_role", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("role_id", id);
        Ok(RoleId::new(id))
    }

    /// One row per granted action; a role with no grants yields a single row
    /// whose action columns are all NULL.
    #[instrument(skip(self), fields(role_id = %id, action_count))]
    async fn get_role(&self, id: RoleId) -> ServiceResult<RoleWithActions> {
        let rows = sqlx::query(
            r#"
            SELECT
                r.id, r.name, r.enabled, r.created_at, r.updated_at,
                a.id AS action_id,
                a.action AS action_action,
                a.entity AS action_entity,
                a.enabled AS action_enabled,
                a.created_at AS action_created_at,
                a.updated_at AS action_updated_at
            FROM role r
            LEFT JOIN roles_actions ra ON ra.role_id = r.id
            LEFT JOIN action a ON a.id = ra.action_id
            WHERE r.id = $1
            ORDER BY a.id ASC NULLS LAST
            "#,
        )
        .bind(id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_role", e))?;

        let first = rows.first().ok_or_else(|| ServiceError::not_found("role"))?;
        let role = Role {
            id: RoleId::new(first.try_get("id").map_err(|e| map_sqlx_error("get_role", e))?),
            name: first.try_get("name").map_err(|e| map_sqlx_error("get_role", e))?,
            enabled: first.try_get("enabled").map_err(|e| map_sqlx_error("get_role", e))?,
            created_at: first.try_get("created_at").map_err(|e| map_sqlx_error("get_role", e))?,
            updated_at: first.try_get("updated_at").map_err(|e| map_sqlx_error("get_role", e))?,
        };

        let mut actions = Vec::with_capacity(rows.len());
        for row in &rows {
            let action_id: Option<i64> = row
                .try_get("action_id")
                .map_err(|e| map_sqlx_error("get_role", e))?;
            let Some(action_id) = action_id else {
                continue;
            };
            actions.push(joined_action(row, action_id).map_err(|e| map_sqlx_error("get_role", e))?);
        }

        Span::current().record("action_count", actions.len());
        Ok(RoleWithActions { role, actions })
    }

    #[instrument(skip(self), fields(role_id = %id))]
    async fn update_role(&self, id: RoleId, patch: &RolePatch) -> ServiceResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE role SET
                name = COALESCE($2, name),
                enabled = COALESCE($3, enabled),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(patch.name.as_deref())
        .bind(patch.enabled)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(ServiceError::not_found("role"));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }
}

fn joined_action(row: &sqlx::postgres::PgRow, action_id: i64) -> Result<Action, sqlx::Error> {
    Ok(Action {
        id: ActionId::new(action_id),
        action: row.try_get("action_action")?,
        entity: row.try_get("action_entity")?,
        enabled: row.try_get("action_enabled")?,
        created_at: row.try_get::<DateTime<Utc>, _>("action_created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("action_updated_at")?,
    })
}
