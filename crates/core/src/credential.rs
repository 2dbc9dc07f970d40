//! Credentials and the session token persisted for them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};
use crate::id::{CredentialId, SessionTokenId};

/// A stored identity that can authenticate.
///
/// `password_hash` always holds the PHC-encoded hash, never plaintext, and is
/// never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub id: CredentialId,
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating a credential.
///
/// # Invariants
/// - At least one of `username` / `email` is present and non-blank.
/// - The password is non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct NewCredential {
    username: Option<String>,
    email: Option<String>,
    password: String,
}

impl NewCredential {
    pub fn new(
        username: Option<String>,
        email: Option<String>,
        password: impl Into<String>,
    ) -> ServiceResult<Self> {
        let username = non_blank(username);
        let email = non_blank(email).map(|e| e.to_lowercase());
        if username.is_none() && email.is_none() {
            return Err(ServiceError::validation("username or email must be provided"));
        }

        let password = password.into();
        if password.is_empty() {
            return Err(ServiceError::validation("password must be provided"));
        }

        Ok(Self {
            username,
            email,
            password,
        })
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl core::fmt::Debug for NewCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewCredential")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which column an authentication attempt looks the credential up by.
///
/// The caller picks the key; lookups are never retried against the other
/// column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Username(String),
    Email(String),
}

impl LoginIdentifier {
    /// Username wins when it was explicitly supplied, otherwise email.
    pub fn from_parts(username: Option<String>, email: Option<String>) -> ServiceResult<Self> {
        if let Some(username) = non_blank(username) {
            return Ok(Self::Username(username));
        }
        if let Some(email) = non_blank(email) {
            return Ok(Self::Email(email.to_lowercase()));
        }
        Err(ServiceError::validation("username or email must be provided"))
    }
}

/// The persisted record of the most recently issued token for a credential.
///
/// At most one row exists per `credentials_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionToken {
    pub id: SessionTokenId,
    pub credentials_id: CredentialId,
    pub token: String,
    pub time_to_live_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn requires_username_or_email() {
        let err = NewCredential::new(None, Some("   ".into()), "pw").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn requires_password() {
        let err = NewCredential::new(Some("alice".into()), None, "").unwrap_err();
        assert_eq!(err, ServiceError::validation("password must be provided"));
    }

    #[test]
    fn normalizes_email_and_trims_username() {
        let c = NewCredential::new(Some(" alice ".into()), Some("Alice@X.com".into()), "secret123")
            .unwrap();
        assert_eq!(c.username(), Some("alice"));
        assert_eq!(c.email(), Some("alice@x.com"));
    }

    #[test]
    fn debug_output_redacts_password() {
        let c = NewCredential::new(Some("alice".into()), None, "secret123").unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret123"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn identifier_prefers_explicit_username() {
        let id = LoginIdentifier::from_parts(Some("alice".into()), Some("alice@x.com".into())).unwrap();
        assert_eq!(id, LoginIdentifier::Username("alice".into()));

        let id = LoginIdentifier::from_parts(Some("".into()), Some("alice@x.com".into())).unwrap();
        assert_eq!(id, LoginIdentifier::Email("alice@x.com".into()));
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let c = Credential {
            id: CredentialId::new(1),
            username: Some("alice".into()),
            email: None,
            password_hash: "$argon2id$v=19$...".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
