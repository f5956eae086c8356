use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::UserId;

/// Optional cache port for role-derived permission decisions.
///
/// Only the role mapping result is stored here. Overrides and temporary
/// grants are always read fresh.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Returns the cached decision for one user and permission name.
    async fn get_decision(&self, user_id: UserId, permission: &str) -> AppResult<Option<bool>>;

    /// Stores one decision with ttl.
    async fn set_decision(
        &self,
        user_id: UserId,
        permission: &str,
        granted: bool,
        ttl_seconds: u32,
    ) -> AppResult<()>;

    /// Drops every cached decision for one user.
    async fn invalidate_user(&self, user_id: UserId) -> AppResult<()>;

    /// Drops every cached decision.
    async fn flush(&self) -> AppResult<()>;
}
