use async_trait::async_trait;
use chrono::{DateTime, Utc};
use wardkeep_core::AppResult;
use wardkeep_domain::{TemporaryPermission, TemporaryPermissionId, UserId};

/// Repository port for time-boxed permission grants.
#[async_trait]
pub trait TemporaryPermissionRepository: Send + Sync {
    /// Finds a grant for the named permission that is active and unexpired
    /// at `now`.
    async fn find_effective_grant(
        &self,
        user_id: UserId,
        permission: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<TemporaryPermission>>;

    /// Finds one grant by id.
    async fn find_grant(&self, id: TemporaryPermissionId)
    -> AppResult<Option<TemporaryPermission>>;

    /// Lists every grant for a user, newest first.
    async fn list_grants_for_user(&self, user_id: UserId) -> AppResult<Vec<TemporaryPermission>>;

    /// Persists a new grant.
    ///
    /// Fails with a validation error when the user already holds an effective
    /// grant for the same permission at the new grant's `granted_at`.
    async fn insert_grant(&self, grant: TemporaryPermission) -> AppResult<()>;

    /// Persists a revocation decided on `grant`.
    ///
    /// Fails with an invalid state error when the stored row is no longer
    /// active.
    async fn save_revocation(&self, grant: &TemporaryPermission) -> AppResult<()>;
}
