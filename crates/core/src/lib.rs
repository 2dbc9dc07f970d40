//! `warden-core`: domain foundation for the credential & access-control service.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! identifiers, stored records, typed patches and the error taxonomy shared by
//! every other crate.

pub mod credential;
pub mod error;
pub mod id;
pub mod rbac;

pub use credential::{Credential, LoginIdentifier, NewCredential, SessionToken};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use id::{ActionId, CredentialId, RoleId, SessionTokenId};
pub use rbac::{Action, ActionPatch, NewAction, Role, RolePatch, RoleWithActions, role_name};
