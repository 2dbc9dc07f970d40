//! Credential lifecycle: registration, login, and session token bookkeeping.

use std::sync::Arc;

use tracing::{Span, instrument};

use warden_auth::{Identity, IssuedToken, PasswordHasher, TokenIssuer};
use warden_core::{
    Credential, CredentialId, LoginIdentifier, NewCredential, ServiceError, ServiceResult,
};

use crate::store::{CredentialRepository, HashedCredential};

/// Owns hashing and token issuance on top of a [`CredentialRepository`].
///
/// Argon2 work runs on the blocking pool so it never stalls the runtime.
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn CredentialRepository>,
    hasher: Arc<PasswordHasher>,
    issuer: Arc<TokenIssuer>,
}

impl CredentialStore {
    pub fn new(
        repo: Arc<dyn CredentialRepository>,
        hasher: Arc<PasswordHasher>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self { repo, hasher, issuer }
    }

    /// Hash the password and persist the credential.
    ///
    /// Nothing is written when hashing fails.
    #[instrument(
        skip_all,
        fields(username = ?new.username(), email = ?new.email(), credentials_id)
    )]
    pub async fn save_credentials(&self, new: NewCredential) -> ServiceResult<CredentialId> {
        let hasher = self.hasher.clone();
        let password = new.password().to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::internal(format!("hashing task failed: {e}")))?
            .map_err(|e| ServiceError::internal(format!("password hashing failed: {e}")))?;

        let id = self
            .repo
            .insert_credential(HashedCredential {
                username: new.username().map(str::to_string),
                email: new.email().map(str::to_string),
                password_hash,
            })
            .await?;

        Span::current().record("credentials_id", id.get());
        tracing::info!("credentials saved");
        Ok(id)
    }

    /// Verify a password and issue a fresh session token.
    ///
    /// An unknown identifier and a wrong password both return
    /// [`ServiceError::Unauthorized`], and both pay for one Argon2 verification.
    /// On success the token replaces any previous one stored for the credential.
    #[instrument(skip_all, fields(credentials_id))]
    pub async fn authenticate(
        &self,
        identifier: LoginIdentifier,
        password: &str,
    ) -> ServiceResult<IssuedToken> {
        let stored = self.repo.find_credential(&identifier).await?;

        let hasher = self.hasher.clone();
        let stored_hash = stored.as_ref().map(|c| c.password_hash.clone());
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&hash, &password),
            None => {
                hasher.verify_decoy(&password);
                false
            }
        })
        .await
        .map_err(|e| ServiceError::internal(format!("verification task failed: {e}")))?;

        let credential = match stored {
            Some(credential) if verified => credential,
            _ => {
                tracing::info!("authentication failed");
                return Err(ServiceError::Unauthorized);
            }
        };
        Span::current().record("credentials_id", credential.id.get());

        let issued = self.issuer.issue(&Identity::from(&credential))?;
        self.repo
            .upsert_session_token(credential.id, &issued.token, issued.expires_at())
            .await?;

        tracing::info!(expires_at = %issued.expires_at(), "session token issued");
        Ok(issued)
    }

    pub async fn get_credentials(&self, id: CredentialId) -> ServiceResult<Credential> {
        self.repo.get_credential(id).await
    }
}
