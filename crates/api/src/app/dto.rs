use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{ActionId, ActionPatch, RoleId, RolePatch};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Deserialize)]
pub struct AuthRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateCredentialsRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

// Passwords never reach a log line.
impl core::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl core::fmt::Debug for CreateCredentialsRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CreateCredentialsRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UpdateRoleRequest> for RolePatch {
    fn from(req: UpdateRoleRequest) -> Self {
        RolePatch {
            name: req.name,
            enabled: req.enabled,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateActionRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub entity: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateActionRequest {
    pub action: Option<String>,
    pub entity: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UpdateActionRequest> for ActionPatch {
    fn from(req: UpdateActionRequest) -> Self {
        ActionPatch {
            action: req.action,
            entity: req.entity,
            enabled: req.enabled,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleLinkRequest {
    pub role_id: RoleId,
}

#[derive(Debug, Deserialize)]
pub struct ActionLinkRequest {
    pub action_id: ActionId,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
