use tracing::info;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{AuditAction, User, UserId, UserPermissionOverride};

use super::{PermissionAdminService, find_permission_id};

impl PermissionAdminService {
    /// Creates or replaces an allow/deny override for a user.
    pub async fn set_user_override(
        &self,
        actor: &User,
        user_id: UserId,
        permission: &str,
        allowed: bool,
    ) -> AppResult<UserPermissionOverride> {
        let catalog = self.repositories.catalog.load_catalog().await?;
        let permission_id = find_permission_id(&catalog, permission)?;
        let target = self.find_user(user_id).await?;

        let value = UserPermissionOverride {
            user_id: target.id(),
            permission_id,
            allowed,
        };
        self.repositories.overrides.upsert_override(value).await?;
        self.invalidate_cache_for(target.id()).await;

        info!(user_id = %target.id(), permission, allowed, "set user override");
        self.audit(
            actor,
            AuditAction::UserOverrideSet,
            "user_permission_override",
            format!("{}:{permission}", target.id()),
            Some(if allowed { "allow" } else { "deny" }.to_owned()),
        )
        .await;

        Ok(value)
    }

    /// Removes a user's override, returning the permission to role and
    /// temporary resolution.
    pub async fn remove_user_override(
        &self,
        actor: &User,
        user_id: UserId,
        permission: &str,
    ) -> AppResult<()> {
        let catalog = self.repositories.catalog.load_catalog().await?;
        let permission_id = find_permission_id(&catalog, permission)?;

        let removed = self
            .repositories
            .overrides
            .delete_override(user_id, permission_id)
            .await?;
        if !removed {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' has no override for '{permission}'"
            )));
        }
        self.invalidate_cache_for(user_id).await;

        info!(user_id = %user_id, permission, "removed user override");
        self.audit(
            actor,
            AuditAction::UserOverrideRemoved,
            "user_permission_override",
            format!("{user_id}:{permission}"),
            None,
        )
        .await;

        Ok(())
    }
}
