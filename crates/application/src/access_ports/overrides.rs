use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionId, UserId, UserPermissionOverride};

/// Repository port for per-user allow/deny overrides.
#[async_trait]
pub trait UserOverrideRepository: Send + Sync {
    /// Finds the override for one user and permission name.
    async fn find_override(
        &self,
        user_id: UserId,
        permission: &str,
    ) -> AppResult<Option<UserPermissionOverride>>;

    /// Lists every override held by a user.
    async fn list_overrides(&self, user_id: UserId) -> AppResult<Vec<UserPermissionOverride>>;

    /// Creates or replaces an override.
    async fn upsert_override(&self, value: UserPermissionOverride) -> AppResult<()>;

    /// Deletes an override. Returns whether a row existed.
    async fn delete_override(&self, user_id: UserId, permission_id: PermissionId)
    -> AppResult<bool>;
}
