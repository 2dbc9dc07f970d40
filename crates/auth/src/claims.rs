//! Token claims and the identity they are minted for.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_core::{Credential, CredentialId};

use crate::token::TokenError;

/// The identity a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub credential_id: CredentialId,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl From<&Credential> for Identity {
    fn from(c: &Credential) -> Self {
        Self {
            credential_id: c.id,
            username: c.username.clone(),
            email: c.email.clone(),
        }
    }
}

/// Claims signed into every bearer token.
///
/// `sub` is the credential id rendered as a string (RFC 7519 requires a
/// string subject). `jti` is a UUIDv7 so two tokens minted within the same
/// second still differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub authorized: bool,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiry, seconds since the epoch.
    pub exp: i64,

    pub jti: Uuid,
}

impl Claims {
    /// Fails with [`TokenError::Signing`] when `issued_at + ttl` is not a
    /// representable instant.
    pub fn new(identity: &Identity, issued_at: DateTime<Utc>, ttl: chrono::Duration) -> Result<Self, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing(format!("expiry overflows: {ttl}")))?;
        Ok(Self {
            sub: identity.credential_id.to_string(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            authorized: true,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::now_v7(),
        })
    }

    pub fn credential_id(&self) -> Result<CredentialId, TokenError> {
        self.sub
            .parse::<i64>()
            .map(CredentialId::new)
            .map_err(|_| TokenError::Malformed)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Deterministically validate the claim time window.
///
/// Signature and `exp` are checked by the decoder; this rejects tokens whose
/// window is inverted or which were not issued as authorized.
pub fn validate_claims(claims: &Claims) -> Result<(), TokenError> {
    if claims.exp <= claims.iat {
        return Err(TokenError::InvalidTimeWindow);
    }
    if !claims.authorized {
        return Err(TokenError::NotAuthorized);
    }
    claims.credential_id()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            credential_id: CredentialId::new(7),
            username: Some("alice".into()),
            email: Some("alice@x.com".into()),
        }
    }

    #[test]
    fn new_claims_embed_identity_and_window() {
        let now = Utc::now();
        let c = Claims::new(&identity(), now, chrono::Duration::minutes(10)).unwrap();
        assert_eq!(c.sub, "7");
        assert_eq!(c.credential_id().unwrap(), CredentialId::new(7));
        assert!(c.authorized);
        assert_eq!(c.exp - c.iat, 600);
        assert!(validate_claims(&c).is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut c = Claims::new(&identity(), Utc::now(), chrono::Duration::minutes(10)).unwrap();
        c.exp = c.iat;
        assert_eq!(validate_claims(&c), Err(TokenError::InvalidTimeWindow));
    }

    #[test]
    fn unauthorized_assertion_is_rejected() {
        let mut c = Claims::new(&identity(), Utc::now(), chrono::Duration::minutes(10)).unwrap();
        c.authorized = false;
        assert_eq!(validate_claims(&c), Err(TokenError::NotAuthorized));
    }

    #[test]
    fn non_numeric_subject_is_malformed() {
        let mut c = Claims::new(&identity(), Utc::now(), chrono::Duration::minutes(10)).unwrap();
        c.sub = "alice".into();
        assert_eq!(validate_claims(&c), Err(TokenError::Malformed));
    }

    #[test]
    fn absent_identity_fields_are_omitted() {
        let id = Identity { credential_id: CredentialId::new(1), username: None, email: None };
        let c = Claims::new(&id, Utc::now(), chrono::Duration::minutes(1)).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("username").is_none());
        assert!(json.get("email").is_none());
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        let err = Claims::new(&identity(), Utc::now(), chrono::Duration::seconds(10_000_000_000_000)).unwrap_err();
        assert!(matches!(err, TokenError::Signing(_)));
    }
}
