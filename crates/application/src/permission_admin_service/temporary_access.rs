use chrono::{DateTime, Utc};
use tracing::info;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{
    AuditAction, TemporaryPermission, TemporaryPermissionId, TemporaryPermissionInput, User, UserId,
};

use super::{PermissionAdminService, find_permission_id};

/// Input payload for granting a temporary permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTemporaryPermissionInput {
    /// User receiving the grant.
    pub user_id: UserId,
    /// Catalog permission name.
    pub permission: String,
    /// Exclusive expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Justification recorded with the grant.
    pub reason: String,
}

impl PermissionAdminService {
    /// Grants a time-boxed permission to a user.
    pub async fn grant_temporary_permission(
        &self,
        granted_by: &User,
        input: GrantTemporaryPermissionInput,
    ) -> AppResult<TemporaryPermission> {
        let catalog = self.repositories.catalog.load_catalog().await?;
        let permission_id = find_permission_id(&catalog, input.permission.as_str())?;
        let target = self.find_user(input.user_id).await?;
        let now = self.clock.now();

        if input.reason.trim().is_empty() {
            return Err(AppError::Validation(
                "temporary permission reason is required".to_owned(),
            ));
        }

        if input.expires_at <= now {
            return Err(AppError::Validation(
                "temporary permission expiry must be in the future".to_owned(),
            ));
        }

        let already_held = self
            .repositories
            .temporary_permissions
            .list_grants_for_user(target.id())
            .await?
            .iter()
            .any(|grant| grant.permission_id() == permission_id && grant.is_effective_at(now));
        if already_held {
            return Err(AppError::Validation(format!(
                "user '{}' already holds an active temporary grant for '{}'",
                target.username(),
                input.permission
            )));
        }

        let grant = TemporaryPermission::new(TemporaryPermissionInput {
            user_id: target.id(),
            permission_id,
            granted_by: granted_by.id(),
            granted_at: now,
            expires_at: input.expires_at,
            reason: input.reason,
        })?;

        self.repositories
            .temporary_permissions
            .insert_grant(grant.clone())
            .await?;

        info!(
            grant_id = %grant.id(),
            user_id = %target.id(),
            permission = input.permission.as_str(),
            expires_at = %grant.expires_at(),
            "granted temporary permission"
        );
        self.audit(
            granted_by,
            AuditAction::TemporaryPermissionGranted,
            "temporary_permission",
            grant.id().to_string(),
            Some(format!(
                "granted '{}' to '{}' until '{}': {}",
                input.permission,
                target.username(),
                grant.expires_at().to_rfc3339(),
                grant.reason()
            )),
        )
        .await;

        Ok(grant)
    }

    /// Revokes a temporary grant. Only the granter or a super-admin may
    /// revoke, and only while the grant is still effective.
    pub async fn revoke_temporary_permission(
        &self,
        requested_by: &User,
        grant_id: TemporaryPermissionId,
    ) -> AppResult<TemporaryPermission> {
        let mut grant = self
            .repositories
            .temporary_permissions
            .find_grant(grant_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("temporary permission '{grant_id}' does not exist"))
            })?;

        grant.revoke(requested_by, self.clock.now())?;
        self.repositories
            .temporary_permissions
            .save_revocation(&grant)
            .await?;

        info!(
            grant_id = %grant_id,
            revoked_by = %requested_by.id(),
            "revoked temporary permission"
        );
        self.audit(
            requested_by,
            AuditAction::TemporaryPermissionRevoked,
            "temporary_permission",
            grant_id.to_string(),
            None,
        )
        .await;

        Ok(grant)
    }

    /// Lists a user's temporary grants, newest first. With `active_only`,
    /// revoked and expired grants are omitted.
    pub async fn list_temporary_permissions(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> AppResult<Vec<TemporaryPermission>> {
        let now = self.clock.now();
        let grants = self
            .repositories
            .temporary_permissions
            .list_grants_for_user(user_id)
            .await?;

        Ok(grants
            .into_iter()
            .filter(|grant| !active_only || grant.is_effective_at(now))
            .collect())
    }
}
