use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by permission administration use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a temporary permission is granted.
    TemporaryPermissionGranted,
    /// Emitted when a temporary permission is revoked.
    TemporaryPermissionRevoked,
    /// Emitted when a user override is created or changed.
    UserOverrideSet,
    /// Emitted when a user override is removed.
    UserOverrideRemoved,
    /// Emitted when a role or its normalized permission mapping changes.
    RolePermissionsUpdated,
    /// Emitted when a legacy role-permission row is added or removed.
    LegacyRolePermissionUpdated,
    /// Emitted when a staff account is registered.
    UserRegistered,
    /// Emitted when a user's role assignment changes.
    UserRoleAssigned,
    /// Emitted when a change request is opened.
    ChangeRequestCreated,
    /// Emitted when a change request is approved and applied.
    ChangeRequestApproved,
    /// Emitted when a change request is rejected.
    ChangeRequestRejected,
    /// Emitted when a requester withdraws a change request.
    ChangeRequestCancelled,
    /// Emitted when overdue change requests are expired.
    ChangeRequestExpired,
    /// Emitted when permission caches are invalidated by an administrator.
    PermissionCacheFlushed,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TemporaryPermissionGranted => "permission.temporary.granted",
            Self::TemporaryPermissionRevoked => "permission.temporary.revoked",
            Self::UserOverrideSet => "permission.override.set",
            Self::UserOverrideRemoved => "permission.override.removed",
            Self::RolePermissionsUpdated => "role.permissions.updated",
            Self::LegacyRolePermissionUpdated => "role.legacy_permissions.updated",
            Self::UserRegistered => "user.registered",
            Self::UserRoleAssigned => "user.role.assigned",
            Self::ChangeRequestCreated => "permission.change_request.created",
            Self::ChangeRequestApproved => "permission.change_request.approved",
            Self::ChangeRequestRejected => "permission.change_request.rejected",
            Self::ChangeRequestCancelled => "permission.change_request.cancelled",
            Self::ChangeRequestExpired => "permission.change_request.expired",
            Self::PermissionCacheFlushed => "permission.cache.flushed",
        }
    }
}
