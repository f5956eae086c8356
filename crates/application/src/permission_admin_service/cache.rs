use tracing::info;
use wardkeep_core::AppResult;
use wardkeep_domain::{AuditAction, User, UserId};

use super::PermissionAdminService;

impl PermissionAdminService {
    /// Drops one user's cached permission decisions.
    pub async fn invalidate_user_cache(&self, actor: &User, user_id: UserId) -> AppResult<()> {
        self.authorization_service.invalidate_cache(user_id).await?;

        info!(user_id = %user_id, "invalidated permission cache for user");
        self.audit(
            actor,
            AuditAction::PermissionCacheFlushed,
            "permission_cache",
            user_id.to_string(),
            None,
        )
        .await;
        Ok(())
    }

    /// Drops every cached permission decision.
    pub async fn flush_permission_cache(&self, actor: &User) -> AppResult<()> {
        self.authorization_service.flush_cache().await?;

        info!("flushed permission cache");
        self.audit(
            actor,
            AuditAction::PermissionCacheFlushed,
            "permission_cache",
            "*".to_owned(),
            None,
        )
        .await;
        Ok(())
    }
}
