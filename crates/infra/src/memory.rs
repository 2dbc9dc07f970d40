//! In-memory backend for tests/dev.
//!
//! All tables live behind one `RwLock`, so every call observes and mutates a
//! consistent snapshot. Uniqueness and referential rules mirror the Postgres
//! schema.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::{
    Action, ActionId, ActionPatch, Credential, CredentialId, LoginIdentifier, NewAction, Role,
    RoleId, RolePatch, RoleWithActions, ServiceError, ServiceResult, SessionToken, SessionTokenId,
};

use crate::store::{ActionStore, AssociationManager, CredentialRepository, HashedCredential, RoleStore};

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    credentials: BTreeMap<CredentialId, Credential>,
    tokens: BTreeMap<CredentialId, SessionToken>,
    roles: BTreeMap<RoleId, Role>,
    actions: BTreeMap<ActionId, Action>,
    roles_actions: BTreeSet<(RoleId, ActionId)>,
    roles_credentials: BTreeSet<(RoleId, CredentialId)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ServiceResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| ServiceError::internal("in-memory store lock poisoned"))
    }

    fn write(&self) -> ServiceResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| ServiceError::internal("in-memory store lock poisoned"))
    }

    /// Number of session token rows held for `credentials_id` (0 or 1).
    pub fn session_token_rows(&self, credentials_id: CredentialId) -> usize {
        self.read()
            .map(|t| t.tokens.values().filter(|s| s.credentials_id == credentials_id).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CredentialRepository for InMemoryStore {
    async fn insert_credential(&self, credential: HashedCredential) -> ServiceResult<CredentialId> {
        let mut t = self.write()?;

        let taken = t.credentials.values().any(|c| {
            (credential.username.is_some() && c.username == credential.username)
                || (credential.email.is_some() && c.email == credential.email)
        });
        if taken {
            return Err(ServiceError::conflict("username or email already taken"));
        }

        let id = CredentialId::new(t.next_id());
        t.credentials.insert(
            id,
            Credential {
                id,
                username: credential.username,
                email: credential.email,
                password_hash: credential.password_hash,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn find_credential(&self, identifier: &LoginIdentifier) -> ServiceResult<Option<Credential>> {
        let t = self.read()?;
        let found = t.credentials.values().find(|c| match identifier {
            LoginIdentifier::Username(u) => c.username.as_deref() == Some(u.as_str()),
            LoginIdentifier::Email(e) => c.email.as_deref() == Some(e.as_str()),
        });
        Ok(found.cloned())
    }

    async fn get_credential(&self, id: CredentialId) -> ServiceResult<Credential> {
        self.read()?
            .credentials
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("credentials"))
    }

    async fn upsert_session_token(
        &self,
        credentials_id: CredentialId,
        token: &str,
        ttl_at: DateTime<Utc>,
    ) -> ServiceResult<SessionToken> {
        let mut t = self.write()?;
        if !t.credentials.contains_key(&credentials_id) {
            return Err(ServiceError::not_found("credentials"));
        }

        let now = Utc::now();
        let row = match t.tokens.get(&credentials_id).cloned() {
            Some(existing) => SessionToken {
                token: token.to_string(),
                time_to_live_at: ttl_at,
                updated_at: now,
                ..existing
            },
            None => SessionToken {
                id: SessionTokenId::new(t.next_id()),
                credentials_id,
                token: token.to_string(),
                time_to_live_at: ttl_at,
                created_at: now,
                updated_at: now,
            },
        };
        t.tokens.insert(credentials_id, row.clone());
        Ok(row)
    }

    async fn session_token(&self, credentials_id: CredentialId) -> ServiceResult<Option<SessionToken>> {
        Ok(self.read()?.tokens.get(&credentials_id).cloned())
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn save_role(&self, name: &str) -> ServiceResult<RoleId> {
        let mut t = self.write()?;
        let id = RoleId::new(t.next_id());
        let now = Utc::now();
        t.roles.insert(
            id,
            Role {
                id,
                name: name.to_string(),
                enabled: false,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn get_role(&self, id: RoleId) -> ServiceResult<RoleWithActions> {
        let t = self.read()?;
        let role = t.roles.get(&id).cloned().ok_or_else(|| ServiceError::not_found("role"))?;
        let actions = t
            .roles_actions
            .range((id, ActionId::new(i64::MIN))..=(id, ActionId::new(i64::MAX)))
            .filter_map(|(_, action_id)| t.actions.get(action_id).cloned())
            .collect();
        Ok(RoleWithActions { role, actions })
    }

    async fn update_role(&self, id: RoleId, patch: &RolePatch) -> ServiceResult<()> {
        let mut t = self.write()?;
        let role = t.roles.get_mut(&id).ok_or_else(|| ServiceError::not_found("role"))?;
        patch.apply(role, Utc::now());
        Ok(())
    }
}

#[async_trait]
impl ActionStore for InMemoryStore {
    async fn save_action(&self, action: &NewAction) -> ServiceResult<ActionId> {
        let mut t = self.write()?;
        let id = ActionId::new(t.next_id());
        let now = Utc::now();
        t.actions.insert(
            id,
            Action {
                id,
                action: action.action().to_string(),
                entity: action.entity().to_string(),
                enabled: false,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn get_action(&self, id: ActionId) -> ServiceResult<Action> {
        self.read()?
            .actions
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("action"))
    }

    async fn update_action(&self, id: ActionId, patch: &ActionPatch) -> ServiceResult<()> {
        let mut t = self.write()?;
        let action = t.actions.get_mut(&id).ok_or_else(|| ServiceError::not_found("action"))?;
        patch.apply(action, Utc::now());
        Ok(())
    }
}

#[async_trait]
impl AssociationManager for InMemoryStore {
    async fn grant_action(&self, role: RoleId, action: ActionId) -> ServiceResult<()> {
        let mut t = self.write()?;
        if !t.roles.contains_key(&role) || !t.actions.contains_key(&action) {
            return Err(ServiceError::not_found("role or action"));
        }
        t.roles_actions.insert((role, action));
        Ok(())
    }

    async fn revoke_action(&self, role: RoleId, action: ActionId) -> ServiceResult<()> {
        self.write()?.roles_actions.remove(&(role, action));
        Ok(())
    }

    async fn grant_role(&self, role: RoleId, credential: CredentialId) -> ServiceResult<()> {
        let mut t = self.write()?;
        if !t.roles.contains_key(&role) || !t.credentials.contains_key(&credential) {
            return Err(ServiceError::not_found("role or credentials"));
        }
        t.roles_credentials.insert((role, credential));
        Ok(())
    }

    async fn revoke_role(&self, role: RoleId, credential: CredentialId) -> ServiceResult<()> {
        self.write()?.roles_credentials.remove(&(role, credential));
        Ok(())
    }

    async fn credential_holds_action(
        &self,
        credential: CredentialId,
        action: &str,
        entity: &str,
    ) -> ServiceResult<bool> {
        let t = self.read()?;
        for (role_id, _) in t.roles_credentials.iter().filter(|(_, c)| *c == credential) {
            if !t.roles.get(role_id).is_some_and(|r| r.enabled) {
                continue;
            }
            let granted = t
                .roles_actions
                .range((*role_id, ActionId::new(i64::MIN))..=(*role_id, ActionId::new(i64::MAX)))
                .filter_map(|(_, a)| t.actions.get(a))
                .any(|a| a.enabled && a.action == action && a.entity == entity);
            if granted {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
