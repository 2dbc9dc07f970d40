use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::{Span, instrument};

use warden_core::{Action, ActionId, ActionPatch, NewAction, ServiceError, ServiceResult};

use super::{PostgresStore, map_sqlx_error};
use crate::store::ActionStore;

#[async_trait]
impl ActionStore for PostgresStore {
    #[instrument(skip(self, action), fields(action = action.action(), entity = action.entity(), action_id))]
    async fn save_action(&self, action: &NewAction) -> ServiceResult<ActionId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let id: i64 = sqlx::query_scalar("INSERT INTO action (action, entity) VALUES ($1, $2) RETURNING id")
            .bind(action.action())
            .bind(action.entity())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("save_action", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("action_id", id);
        Ok(ActionId::new(id))
    }

    #[instrument(skip(self), fields(action_id = %id))]
    async fn get_action(&self, id: ActionId) -> ServiceResult<Action> {
        let row = sqlx::query(
            "SELECT id, action, entity, enabled, created_at, updated_at FROM action WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_action", e))?
        .ok_or_else(|| ServiceError::not_found("action"))?;

        action_from_row(&row).map_err(|e| map_sqlx_error("get_action", e))
    }

    #[instrument(skip(self), fields(action_id = %id))]
    async fn update_action(&self, id: ActionId, patch: &ActionPatch) -> ServiceResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE action SET
                action = COALESCE($2, action),
                entity = COALESCE($3, entity),
                enabled = COALESCE($4, enabled),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(patch.action.as_deref())
        .bind(patch.entity.as_deref())
        .bind(patch.enabled)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_action", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(ServiceError::not_found("action"));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }
}

fn action_from_row(row: &PgRow) -> Result<Action, sqlx::Error> {
    Ok(Action {
        id: ActionId::new(row.try_get("id")?),
        action: row.try_get("action")?,
        entity: row.try_get("entity")?,
        enabled: row.try_get("enabled")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
