use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::{Span, instrument};

use warden_core::{
    Credential, CredentialId, LoginIdentifier, ServiceError, ServiceResult, SessionToken, SessionTokenId,
};

use super::{PostgresStore, is_unique_violation, map_sqlx_error};
use crate::store::{CredentialRepository, HashedCredential};

#[async_trait]
impl CredentialRepository for PostgresStore {
    #[instrument(skip_all, fields(credentials_id))]
    async fn insert_credential(&self, credential: HashedCredential) -> ServiceResult<CredentialId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO credentials (username, email, password)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(credential.username.as_deref())
        .bind(credential.email.as_deref())
        .bind(&credential.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::conflict("username or email already taken")
            } else {
                map_sqlx_error("insert_credential", e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("credentials_id", id);
        Ok(CredentialId::new(id))
    }

    #[instrument(skip_all)]
    async fn find_credential(&self, identifier: &LoginIdentifier) -> ServiceResult<Option<Credential>> {
        // The column is fixed per variant; only the value is bound.
        let (sql, value) = match identifier {
            LoginIdentifier::Username(u) => (
                "SELECT id, username, email, password, created_at FROM credentials WHERE username = $1",
                u,
            ),
            LoginIdentifier::Email(e) => (
                "SELECT id, username, email, password, created_at FROM credentials WHERE email = $1",
                e,
            ),
        };

        let row = sqlx::query(sql)
            .bind(value)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_credential", e))?;

        row.as_ref()
            .map(credential_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_credential", e))
    }

    #[instrument(skip(self), fields(credentials_id = %id))]
    async fn get_credential(&self, id: CredentialId) -> ServiceResult<Credential> {
        let row = sqlx::query(
            "SELECT id, username, email, password, created_at FROM credentials WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_credential", e))?
        .ok_or_else(|| ServiceError::not_found("credentials"))?;

        credential_from_row(&row).map_err(|e| map_sqlx_error("get_credential", e))
    }

    #[instrument(skip(self, token), fields(credentials_id = %credentials_id))]
    async fn upsert_session_token(
        &self,
        credentials_id: CredentialId,
        token: &str,
        ttl_at: DateTime<Utc>,
    ) -> ServiceResult<SessionToken> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // A single statement keyed on the unique credentials_id, so concurrent
        // logins serialise on the row instead of racing a select-then-insert.
        let row = sqlx::query(
            r#"
            INSERT INTO token (credentials_id, token, ttl_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (credentials_id) DO UPDATE SET
                token = EXCLUDED.token,
                ttl_at = EXCLUDED.ttl_at,
                updated_at = NOW()
            RETURNING id, credentials_id, token, ttl_at, created_at, updated_at
            "#,
        )
        .bind(credentials_id.get())
        .bind(token)
        .bind(ttl_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match map_sqlx_error("upsert_session_token", e) {
            ServiceError::NotFound(_) => ServiceError::not_found("credentials"),
            other => other,
        })?;

        let stored = session_token_from_row(&row).map_err(|e| map_sqlx_error("upsert_session_token", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(stored)
    }

    #[instrument(skip(self), fields(credentials_id = %credentials_id))]
    async fn session_token(&self, credentials_id: CredentialId) -> ServiceResult<Option<SessionToken>> {
        let row = sqlx::query(
            r#"
            SELECT id, credentials_id, token, ttl_at, created_at, updated_at
            FROM token
            WHERE credentials_id = $1
            "#,
        )
        .bind(credentials_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("session_token", e))?;

        row.as_ref()
            .map(session_token_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("session_token", e))
    }
}

fn credential_from_row(row: &PgRow) -> Result<Credential, sqlx::Error> {
    Ok(Credential {
        id: CredentialId::new(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
        created_at: row.try_get("created_at")?,
    })
}

fn session_token_from_row(row: &PgRow) -> Result<SessionToken, sqlx::Error> {
    Ok(SessionToken {
        id: SessionTokenId::new(row.try_get("id")?),
        credentials_id: CredentialId::new(row.try_get("credentials_id")?),
        token: row.try_get("token")?,
        time_to_live_at: row.try_get("ttl_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
