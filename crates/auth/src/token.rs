//! Signed, time-limited bearer tokens (JWT, HS512).

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode};
use thiserror::Error;

use warden_core::ServiceError;

use crate::authorize::AuthzError;
use crate::claims::{Claims, Identity, validate_claims};

/// Tokens live ten minutes unless configured otherwise.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

/// The only algorithm this issuer signs with or accepts.
const ALGORITHM: Algorithm = Algorithm::HS512;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token was signed with an unexpected algorithm")]
    AlgorithmMismatch,

    #[error("token is not marked as authorized")]
    NotAuthorized,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => ServiceError::internal(format!("signing token: {msg}")),
            TokenError::EmptySecret => ServiceError::internal("signing secret is empty"),
            _ => ServiceError::Unauthorized,
        }
    }
}

/// A freshly signed token and the claims inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at().unwrap_or_else(Utc::now)
    }
}

/// Issues and verifies bearer tokens with a server-held symmetric secret.
///
/// The secret is injected at construction and never changes afterwards, so
/// the issuer can be shared behind an `Arc` without locking.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: DEFAULT_TOKEN_TTL,
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if minted at `issued_at`.
    pub fn issue_at(&self, identity: &Identity, issued_at: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| TokenError::Signing(format!("ttl out of range: {e}")))?;
        let claims = Claims::new(identity, issued_at, ttl)?;

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a token and return its claims.
    ///
    /// The header algorithm is checked before anything else, so a token
    /// signed with any other algorithm (including `none`) is rejected even if
    /// it would otherwise decode.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::AlgorithmMismatch);
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(map_jwt_error)?;
        validate_claims(&data.claims)?;
        Ok(data.claims)
    }

    /// Fine-grained permission check for verified claims.
    ///
    /// Intentionally unimplemented: every verified token passes. Role/action
    /// enforcement is out of scope for the gate; this is the seam where it
    /// would plug in.
    pub fn check_permissions(&self, _claims: &Claims) -> Result<(), AuthzError> {
        Ok(())
    }
}

impl core::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &ALGORITHM)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        JwtErrorKind::ExpiredSignature => TokenError::Expired,
        JwtErrorKind::InvalidSignature => TokenError::InvalidSignature,
        JwtErrorKind::InvalidAlgorithm | JwtErrorKind::InvalidAlgorithmName => TokenError::AlgorithmMismatch,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{CredentialId, ErrorKind};

    const SECRET: &str = "test-secret";

    fn identity() -> Identity {
        Identity {
            credential_id: CredentialId::new(3),
            username: Some("alice".into()),
            email: Some("alice@x.com".into()),
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET).unwrap()
    }

    #[test]
    fn issued_token_verifies_and_carries_identity() {
        let iss = issuer();
        let issued = iss.issue(&identity()).unwrap();
        let claims = iss.verify(&issued.token).unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.username.as_deref(), Some("alice"));
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[test]
    fn consecutive_tokens_differ() {
        let iss = issuer();
        let t1 = iss.issue(&identity()).unwrap();
        let t2 = iss.issue(&identity()).unwrap();
        assert_ne!(t1.token, t2.token);
    }

    #[test]
    fn expired_token_is_rejected() {
        let iss = issuer();
        let issued = iss
            .issue_at(&identity(), Utc::now() - chrono::Duration::minutes(11))
            .unwrap();
        assert_eq!(iss.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = TokenIssuer::new("other-secret").unwrap();
        let issued = other.issue(&identity()).unwrap();
        assert_eq!(issuer().verify(&issued.token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn hs256_token_with_same_secret_is_rejected() {
        let claims = Claims::new(&identity(), Utc::now(), chrono::Duration::minutes(10)).unwrap();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(issuer().verify(&token), Err(TokenError::AlgorithmMismatch));
    }

    #[test]
    fn unsigned_none_token_is_rejected() {
        // {"alg":"none","typ":"JWT"} . {"sub":"3"} . <empty signature>
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJzdWIiOiIzIn0.";
        assert!(issuer().verify(token).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        let iss = issuer();
        assert_eq!(iss.verify(""), Err(TokenError::Malformed));
        assert_eq!(iss.verify("not.a.jwt"), Err(TokenError::Malformed));
        assert_eq!(iss.verify("abc"), Err(TokenError::Malformed));
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let iss = issuer();
        let issued = iss.issue(&identity()).unwrap();
        let forged = iss.issue(&Identity { credential_id: CredentialId::new(99), ..identity() }).unwrap();
        let forged_payload = forged.token.split('.').nth(1).unwrap().to_string();
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        parts[1] = &forged_payload;
        let tampered = parts.join(".");
        assert_eq!(iss.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert_eq!(TokenIssuer::new("").unwrap_err(), TokenError::EmptySecret);
    }

    #[test]
    fn verification_failures_map_to_unauthorized() {
        for err in [TokenError::Malformed, TokenError::Expired, TokenError::AlgorithmMismatch] {
            assert_eq!(ServiceError::from(err).kind(), ErrorKind::Unauthorized);
        }
        assert_eq!(ServiceError::from(TokenError::Signing("x".into())).kind(), ErrorKind::Internal);
    }

    #[test]
    fn custom_ttl_is_applied() {
        let iss = issuer().with_ttl(Duration::from_secs(30));
        let issued = iss.issue(&identity()).unwrap();
        assert_eq!(issued.claims.exp - issued.claims.iat, 30);
    }

    #[test]
    fn huge_ttl_fails_instead_of_panicking() {
        let iss = issuer().with_ttl(Duration::from_secs(10_000_000_000_000));
        let err = iss.issue(&identity()).unwrap_err();
        assert!(matches!(err, TokenError::Signing(_)));
        assert_eq!(ServiceError::from(err).kind(), ErrorKind::Internal);
    }

    #[test]
    fn permission_check_is_a_pass_through() {
        let iss = issuer();
        let issued = iss.issue(&identity()).unwrap();
        assert!(iss.check_permissions(&issued.claims).is_ok());
    }
}
