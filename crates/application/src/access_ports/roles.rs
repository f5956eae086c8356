use std::collections::BTreeSet;

use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionId, Role, RoleId};

/// Repository port for normalized roles and their permission mapping.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds one role by id.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Lists every role.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Creates or replaces a role. Fails with a conflict on a duplicate slug.
    async fn save_role(&self, role: Role) -> AppResult<()>;

    /// Replaces the permission set mapped to a role.
    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: BTreeSet<PermissionId>,
    ) -> AppResult<()>;

    /// Returns whether the role maps the named permission.
    async fn role_grants_permission(&self, role_id: RoleId, permission: &str) -> AppResult<bool>;
}

/// Repository port for the legacy `role name -> permission` table.
///
/// Role names match case-insensitively.
#[async_trait]
pub trait LegacyRolePermissionRepository: Send + Sync {
    /// Returns whether the legacy role maps the named permission.
    async fn legacy_role_grants_permission(
        &self,
        role_name: &str,
        permission: &str,
    ) -> AppResult<bool>;

    /// Lists permission ids mapped to the legacy role.
    async fn list_legacy_role_permissions(&self, role_name: &str)
    -> AppResult<Vec<PermissionId>>;

    /// Adds one mapping row. Adding an existing row is a no-op.
    async fn grant_legacy_role_permission(
        &self,
        role_name: &str,
        permission_id: PermissionId,
    ) -> AppResult<()>;

    /// Removes one mapping row. Returns whether a row existed.
    async fn revoke_legacy_role_permission(
        &self,
        role_name: &str,
        permission_id: PermissionId,
    ) -> AppResult<bool>;
}
