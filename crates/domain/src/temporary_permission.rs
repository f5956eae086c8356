use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardkeep_core::{AppError, AppResult, NonEmptyString};

use crate::{PermissionId, User, UserId};

/// Unique identifier for a temporary permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemporaryPermissionId(Uuid);

impl TemporaryPermissionId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
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

impl Default for TemporaryPermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TemporaryPermissionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Input payload used to construct a temporary permission grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryPermissionInput {
    /// User receiving the grant.
    pub user_id: UserId,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// User issuing the grant.
    pub granted_by: UserId,
    /// Grant creation time.
    pub granted_at: DateTime<Utc>,
    /// Time after which the grant no longer applies.
    pub expires_at: DateTime<Utc>,
    /// Justification captured at grant time.
    pub reason: String,
}

/// Time-bounded, explicitly revocable permission exception.
///
/// Expiry is evaluated lazily against the caller's clock; nothing sweeps
/// expired grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryPermission {
    id: TemporaryPermissionId,
    user_id: UserId,
    permission_id: PermissionId,
    granted_by: UserId,
    granted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    reason: NonEmptyString,
    is_active: bool,
    revoked_by: Option<UserId>,
    revoked_at: Option<DateTime<Utc>>,
}

impl TemporaryPermission {
    /// Creates a validated active grant.
    pub fn new(input: TemporaryPermissionInput) -> AppResult<Self> {
        let TemporaryPermissionInput {
            user_id,
            permission_id,
            granted_by,
            granted_at,
            expires_at,
            reason,
        } = input;

        if expires_at <= granted_at {
            return Err(AppError::Validation(
                "temporary permission must expire after it is granted".to_owned(),
            ));
        }

        let reason = NonEmptyString::new(reason.trim()).map_err(|_| {
            AppError::Validation("temporary permission reason is required".to_owned())
        })?;

        Ok(Self {
            id: TemporaryPermissionId::new(),
            user_id,
            permission_id,
            granted_by,
            granted_at,
            expires_at,
            reason,
            is_active: true,
            revoked_by: None,
            revoked_at: None,
        })
    }

    /// Rebuilds a grant from persisted state without re-validating it.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn restore(
        id: TemporaryPermissionId,
        user_id: UserId,
        permission_id: PermissionId,
        granted_by: UserId,
        granted_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        reason: NonEmptyString,
        is_active: bool,
        revoked_by: Option<UserId>,
        revoked_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            user_id,
            permission_id,
            granted_by,
            granted_at,
            expires_at,
            reason,
            is_active,
            revoked_by,
            revoked_at,
        }
    }

    /// Returns the grant id.
    #[must_use]
    pub fn id(&self) -> TemporaryPermissionId {
        self.id
    }

    /// Returns the grantee.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the granted permission.
    #[must_use]
    pub fn permission_id(&self) -> PermissionId {
        self.permission_id
    }

    /// Returns the granter.
    #[must_use]
    pub fn granted_by(&self) -> UserId {
        self.granted_by
    }

    /// Returns the grant time.
    #[must_use]
    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    /// Returns the expiry time.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the justification.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.reason.as_str()
    }

    /// Returns whether the grant has not been revoked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the revoking user, when revoked.
    #[must_use]
    pub fn revoked_by(&self) -> Option<UserId> {
        self.revoked_by
    }

    /// Returns the revocation time, when revoked.
    #[must_use]
    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    /// Returns whether the grant has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns whether the grant confers its permission at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    /// Returns whether `actor` may revoke the grant.
    #[must_use]
    pub fn can_be_revoked_by(&self, actor: &User) -> bool {
        actor.is_super_admin() || actor.id() == self.granted_by
    }

    /// Deactivates the grant on behalf of `actor`.
    pub fn revoke(&mut self, actor: &User, now: DateTime<Utc>) -> AppResult<()> {
        if !self.can_be_revoked_by(actor) {
            return Err(AppError::Forbidden(format!(
                "user '{}' may not revoke temporary permission '{}'",
                actor.id(),
                self.id
            )));
        }

        if !self.is_active {
            return Err(AppError::InvalidState(format!(
                "temporary permission '{}' is already revoked",
                self.id
            )));
        }

        if self.is_expired_at(now) {
            return Err(AppError::InvalidState(format!(
                "temporary permission '{}' has already expired",
                self.id
            )));
        }

        self.is_active = false;
        self.revoked_by = Some(actor.id());
        self.revoked_at = Some(now);
        Ok(())
    }
}
