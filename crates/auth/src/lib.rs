//! `warden-auth`: password hashing, bearer tokens and the request gate.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod token;

pub use authorize::{AuthorizationGate, AuthzError, Rejection, bearer_token};
pub use claims::{Claims, Identity};
pub use password::{HashError, HashingParams, PasswordHasher};
pub use token::{DEFAULT_TOKEN_TTL, IssuedToken, TokenError, TokenIssuer};
