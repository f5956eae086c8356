use serde::{Deserialize, Serialize};

use crate::{PermissionId, UserId};

/// Per-user allow or deny entry that takes precedence over role grants.
///
/// At most one override exists per `(user_id, permission_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserPermissionOverride {
    /// User the override applies to.
    pub user_id: UserId,
    /// Overridden permission.
    pub permission_id: PermissionId,
    /// Resolved value whenever the override is present.
    pub allowed: bool,
}

impl UserPermissionOverride {
    /// Creates an allow override.
    #[must_use]
    pub fn allow(user_id: UserId, permission_id: PermissionId) -> Self {
        Self {
            user_id,
            permission_id,
            allowed: true,
        }
    }

    /// Creates a deny override.
    #[must_use]
    pub fn deny(user_id: UserId, permission_id: PermissionId) -> Self {
        Self {
            user_id,
            permission_id,
            allowed: false,
        }
    }
}
