use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardkeep_core::{AppResult, NonEmptyString};

use crate::RoleId;

/// Legacy role name that carries the super-admin bypass.
pub const SUPER_ADMIN_ROLE_NAME: &str = "Super Admin";

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Authenticated user as supplied by the identity provider.
///
/// A user may reach a role through the legacy free-text `role` or the
/// normalized `role_id`; both are consulted during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: NonEmptyString,
    role: Option<String>,
    role_id: Option<RoleId>,
    super_admin: bool,
}

impl User {
    /// Creates a user.
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        role: Option<String>,
        role_id: Option<RoleId>,
        super_admin: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            username: NonEmptyString::new(username)?,
            role: role
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            role_id,
            super_admin,
        })
    }

    /// Returns the user id.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Returns the legacy role name.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Returns the normalized role id.
    #[must_use]
    pub fn role_id(&self) -> Option<RoleId> {
        self.role_id
    }

    /// Returns whether the user bypasses every permission check.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.super_admin
            || self
                .role
                .as_deref()
                .is_some_and(|role| role.eq_ignore_ascii_case(SUPER_ADMIN_ROLE_NAME))
    }

    /// Reassigns the legacy and normalized roles.
    pub fn assign_role(&mut self, role: Option<String>, role_id: Option<RoleId>) {
        self.role = role
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        self.role_id = role_id;
    }
}

#[cfg(test)]
mod tests {
    use super::{User, UserId};

    #[test]
    fn super_admin_is_derived_from_flag_or_legacy_role() {
        let flagged = User::new(UserId::new(), "root", None, None, true);
        assert!(flagged.is_ok_and(|user| user.is_super_admin()));

        let legacy = User::new(
            UserId::new(),
            "director",
            Some("super admin".to_owned()),
            None,
            false,
        );
        assert!(legacy.is_ok_and(|user| user.is_super_admin()));

        let regular = User::new(
            UserId::new(),
            "nurse",
            Some("Nurse".to_owned()),
            None,
            false,
        );
        assert!(regular.is_ok_and(|user| !user.is_super_admin()));
    }

    #[test]
    fn blank_legacy_role_is_treated_as_missing() {
        let user = User::new(UserId::new(), "clerk", Some("  ".to_owned()), None, false);
        assert!(user.is_ok_and(|user| user.role().is_none()));
    }

    #[test]
    fn username_must_not_be_blank() {
        assert!(User::new(UserId::new(), " ", None, None, false).is_err());
    }
}
