//! Roles, actions and the typed patches that update them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};
use crate::id::{ActionId, RoleId};

/// A named, enablable grouping of actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A permission atom: a verb (`action`) applied to a resource class (`entity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub id: ActionId,
    pub action: String,
    pub entity: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A role together with the actions currently granted to it.
///
/// A role with no grants has an empty `actions` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleWithActions {
    #[serde(flatten)]
    pub role: Role,
    pub actions: Vec<Action>,
}

/// Validated input for creating an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    action: String,
    entity: String,
}

impl NewAction {
    pub fn new(action: impl Into<String>, entity: impl Into<String>) -> ServiceResult<Self> {
        let action = required("action", action.into())?;
        let entity = required("entity", entity.into())?;
        Ok(Self { action, entity })
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }
}

/// Validate a role name for creation.
pub fn role_name(name: impl Into<String>) -> ServiceResult<String> {
    required("name", name.into())
}

/// Partial update of a role. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePatch {
    pub name: Option<String>,
    pub enabled: Option<bool>,
}

impl RolePatch {
    /// Reject blank names; absent fields are always fine.
    pub fn validated(self) -> ServiceResult<Self> {
        Ok(Self {
            name: self.name.map(|n| required("name", n)).transpose()?,
            enabled: self.enabled,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.enabled.is_none()
    }

    /// Apply to an in-memory role, stamping `updated_at`.
    pub fn apply(&self, role: &mut Role, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            role.name = name.clone();
        }
        if let Some(enabled) = self.enabled {
            role.enabled = enabled;
        }
        role.updated_at = now;
    }
}

/// Partial update of an action. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPatch {
    pub action: Option<String>,
    pub entity: Option<String>,
    pub enabled: Option<bool>,
}

impl ActionPatch {
    pub fn validated(self) -> ServiceResult<Self> {
        Ok(Self {
            action: self.action.map(|a| required("action", a)).transpose()?,
            entity: self.entity.map(|e| required("entity", e)).transpose()?,
            enabled: self.enabled,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.action.is_none() && self.entity.is_none() && self.enabled.is_none()
    }

    pub fn apply(&self, action: &mut Action, now: DateTime<Utc>) {
        if let Some(verb) = &self.action {
            action.action = verb.clone();
        }
        if let Some(entity) = &self.entity {
            action.entity = entity.clone();
        }
        if let Some(enabled) = self.enabled {
            action.enabled = enabled;
        }
        action.updated_at = now;
    }
}

fn required(field: &str, value: String) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation(format!("{field} must be provided")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn role() -> Role {
        let t = Utc::now() - Duration::hours(1);
        Role {
            id: RoleId::new(1),
            name: "admin".into(),
            enabled: false,
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn enabled_only_patch_leaves_name_untouched() {
        let mut r = role();
        let now = Utc::now();
        RolePatch { name: None, enabled: Some(true) }.apply(&mut r, now);
        assert_eq!(r.name, "admin");
        assert!(r.enabled);
        assert_eq!(r.updated_at, now);
    }

    #[test]
    fn empty_patch_still_stamps_updated_at() {
        let mut r = role();
        let before = r.clone();
        let now = Utc::now();
        let patch = RolePatch::default();
        assert!(patch.is_empty());
        patch.apply(&mut r, now);
        assert_eq!(r.name, before.name);
        assert_eq!(r.enabled, before.enabled);
        assert_eq!(r.updated_at, now);
    }

    #[test]
    fn blank_patch_fields_are_rejected() {
        let err = ActionPatch { action: Some("  ".into()), ..Default::default() }
            .validated()
            .unwrap_err();
        assert_eq!(err, ServiceError::validation("action must be provided"));
    }

    #[test]
    fn new_action_requires_both_fields() {
        assert!(NewAction::new("read", "").is_err());
        assert!(NewAction::new("", "document").is_err());
        let a = NewAction::new(" read ", "document").unwrap();
        assert_eq!(a.action(), "read");
    }

    #[test]
    fn role_with_actions_flattens_role_fields() {
        let rwa = RoleWithActions { role: role(), actions: vec![] };
        let json = serde_json::to_value(&rwa).unwrap();
        assert_eq!(json["name"], "admin");
        assert_eq!(json["actions"], serde_json::json!([]));
    }

    proptest! {
        #[test]
        fn patch_only_touches_supplied_fields(name in proptest::option::of("[a-z]{1,12}"), enabled in proptest::option::of(any::<bool>())) {
            let mut r = role();
            let original = r.clone();
            let patch = RolePatch { name: name.clone(), enabled };
            patch.apply(&mut r, Utc::now());
            prop_assert_eq!(r.name, name.unwrap_or(original.name));
            prop_assert_eq!(r.enabled, enabled.unwrap_or(original.enabled));
            prop_assert_eq!(r.id, original.id);
            prop_assert_eq!(r.created_at, original.created_at);
        }
    }
}
