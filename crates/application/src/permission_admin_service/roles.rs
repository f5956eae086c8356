use tracing::info;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{AuditAction, Role, RoleHierarchy, RoleId, RoleInput, User, UserId};

use super::users::ensure_may_confer_role;
use super::{PermissionAdminService, find_permission_id};

impl PermissionAdminService {
    /// Creates or replaces a normalized role.
    ///
    /// The parent link is validated against the stored hierarchy and the
    /// permission cache is flushed, since the mapping may change for every
    /// holder of the role.
    pub async fn save_role(&self, actor: &User, input: RoleInput) -> AppResult<Role> {
        let catalog = self.repositories.catalog.load_catalog().await?;
        if let Some(unknown) = input
            .permissions
            .iter()
            .find(|permission_id| catalog.get(**permission_id).is_none())
        {
            return Err(AppError::NotFound(format!(
                "permission '{unknown}' does not exist"
            )));
        }

        let role = Role::new(input)?;
        let existing = self.repositories.roles.list_roles().await?;
        RoleHierarchy::from_roles(existing.iter().filter(|stored| stored.id() != role.id()))
            .validate_parent(role.id(), role.parent_role_id())?;

        self.repositories.roles.save_role(role.clone()).await?;
        self.flush_cache_after_mapping_change().await;

        info!(role_id = %role.id(), slug = role.slug(), "saved role");
        self.audit(
            actor,
            AuditAction::RolePermissionsUpdated,
            "role",
            role.id().to_string(),
            Some(format!(
                "role '{}' maps {} permissions",
                role.slug(),
                role.permissions().len()
            )),
        )
        .await;

        Ok(role)
    }

    /// Replaces the permissions mapped to a normalized role.
    pub async fn set_role_permissions(
        &self,
        actor: &User,
        role_id: RoleId,
        permissions: &[String],
    ) -> AppResult<Role> {
        let mut role = self
            .repositories
            .roles
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;

        let catalog = self.repositories.catalog.load_catalog().await?;
        let permission_ids = permissions
            .iter()
            .map(|permission| find_permission_id(&catalog, permission))
            .collect::<AppResult<_>>()?;
        role.set_permissions(permission_ids);

        self.repositories
            .roles
            .set_role_permissions(role_id, role.permissions().clone())
            .await?;
        self.flush_cache_after_mapping_change().await;

        info!(role_id = %role_id, count = permissions.len(), "updated role permissions");
        self.audit(
            actor,
            AuditAction::RolePermissionsUpdated,
            "role",
            role_id.to_string(),
            Some(permissions.join(",")),
        )
        .await;

        Ok(role)
    }

    /// Adds a `legacy role name -> permission` row.
    pub async fn grant_legacy_role_permission(
        &self,
        actor: &User,
        role_name: &str,
        permission: &str,
    ) -> AppResult<()> {
        let role_name = legacy_role_name(role_name)?;
        let catalog = self.repositories.catalog.load_catalog().await?;
        let permission_id = find_permission_id(&catalog, permission)?;

        self.repositories
            .legacy_roles
            .grant_legacy_role_permission(role_name, permission_id)
            .await?;
        self.flush_cache_after_mapping_change().await;

        info!(role = role_name, permission, "granted legacy role permission");
        self.audit(
            actor,
            AuditAction::LegacyRolePermissionUpdated,
            "legacy_role_permission",
            format!("{role_name}:{permission}"),
            Some("granted".to_owned()),
        )
        .await;

        Ok(())
    }

    /// Removes a `legacy role name -> permission` row.
    pub async fn revoke_legacy_role_permission(
        &self,
        actor: &User,
        role_name: &str,
        permission: &str,
    ) -> AppResult<()> {
        let role_name = legacy_role_name(role_name)?;
        let catalog = self.repositories.catalog.load_catalog().await?;
        let permission_id = find_permission_id(&catalog, permission)?;

        let removed = self
            .repositories
            .legacy_roles
            .revoke_legacy_role_permission(role_name, permission_id)
            .await?;
        if !removed {
            return Err(AppError::NotFound(format!(
                "legacy role '{role_name}' does not map '{permission}'"
            )));
        }
        self.flush_cache_after_mapping_change().await;

        info!(role = role_name, permission, "revoked legacy role permission");
        self.audit(
            actor,
            AuditAction::LegacyRolePermissionUpdated,
            "legacy_role_permission",
            format!("{role_name}:{permission}"),
            Some("revoked".to_owned()),
        )
        .await;

        Ok(())
    }

    /// Reassigns a user's legacy role name and normalized role.
    pub async fn assign_role(
        &self,
        actor: &User,
        user_id: UserId,
        legacy_role: Option<String>,
        role_id: Option<RoleId>,
    ) -> AppResult<User> {
        ensure_may_confer_role(actor, legacy_role.as_deref())?;
        let mut user = self.find_user(user_id).await?;

        if let Some(role_id) = role_id
            && self.repositories.roles.find_role(role_id).await?.is_none()
        {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        user.assign_role(legacy_role, role_id);
        self.repositories.users.save_user(user.clone()).await?;
        self.invalidate_cache_for(user_id).await;

        info!(user_id = %user_id, role = user.role(), "assigned user role");
        self.audit(
            actor,
            AuditAction::UserRoleAssigned,
            "user",
            user_id.to_string(),
            Some(format!(
                "role='{}' role_id='{}'",
                user.role().unwrap_or_default(),
                user.role_id().map(|value| value.to_string()).unwrap_or_default()
            )),
        )
        .await;

        Ok(user)
    }
}

fn legacy_role_name(role_name: &str) -> AppResult<&str> {
    let trimmed = role_name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "legacy role name must not be empty".to_owned(),
        ));
    }
    Ok(trimmed)
}
