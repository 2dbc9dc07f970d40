//! Request gate: bearer token in, verified claims (or a rejection) out.
//!
//! Per request the gate walks
//! `NoToken | TokenPresent -> Parsed -> Valid -> PermissionChecked`, and every
//! failure resolves to a [`Rejection`]. Nothing here panics on hostile input:
//! a token that fails to parse stops the walk before any claim is touched.

use std::sync::Arc;

use thiserror::Error;

use warden_core::{ErrorKind, ServiceError};

use crate::claims::Claims;
use crate::token::{TokenError, TokenIssuer};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// Terminal rejection states of the gate.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("missing token")]
    MissingToken,

    #[error("malformed token")]
    Malformed,

    #[error("expired token")]
    Expired,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("lacking permissions")]
    Forbidden,
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Rejection::Forbidden => ErrorKind::Forbidden,
            _ => ErrorKind::Unauthorized,
        }
    }
}

impl From<TokenError> for Rejection {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Rejection::Expired,
            TokenError::InvalidSignature | TokenError::AlgorithmMismatch => Rejection::InvalidSignature,
            _ => Rejection::Malformed,
        }
    }
}

impl From<Rejection> for ServiceError {
    fn from(r: Rejection) -> Self {
        match r {
            Rejection::Forbidden => ServiceError::Forbidden,
            _ => ServiceError::Unauthorized,
        }
    }
}

/// Validates bearer tokens for protected routes.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    issuer: Arc<TokenIssuer>,
}

impl AuthorizationGate {
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }

    /// Run the gate against the raw `Authorization` header value, if any.
    pub fn admit(&self, authorization: Option<&str>) -> Result<Claims, Rejection> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(Rejection::MissingToken)?;

        let claims = self.issuer.verify(token).map_err(|e| {
            tracing::debug!(reason = %e, "token rejected");
            Rejection::from(e)
        })?;

        if let Err(e) = self.issuer.check_permissions(&claims) {
            tracing::debug!(reason = %e, sub = %claims.sub, "permission check failed");
            return Err(Rejection::Forbidden);
        }

        Ok(claims)
    }
}

/// Extract the credential from an `Authorization: Bearer <token>` value.
///
/// The scheme is matched case-insensitively (RFC 7235); anything other than
/// a non-empty bearer credential yields `None`.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() { None } else { Some(token) }
}
