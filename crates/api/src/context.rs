use uuid::Uuid;

use warden_core::CredentialId;

/// Identity of the caller, derived from a verified bearer token.
///
/// Present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialContext {
    credential_id: CredentialId,
}

impl CredentialContext {
    pub fn new(credential_id: CredentialId) -> Self {
        Self { credential_id }
    }

    pub fn credential_id(&self) -> CredentialId {
        self.credential_id
    }
}

/// Per-request correlation id, echoed back in `x-request-id`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}
