use std::collections::BTreeSet;

use async_trait::async_trait;
use wardkeep_application::{LegacyRolePermissionRepository, RoleRepository};
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{PermissionId, Role, RoleId};

use super::{InMemoryAccessStore, legacy_key};

#[async_trait]
impl RoleRepository for InMemoryAccessStore {
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&role_id).cloned())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.tables.read().await.roles.values().cloned().collect();
        roles.sort_by(|left, right| {
            right
                .priority()
                .cmp(&left.priority())
                .then_with(|| left.slug().cmp(right.slug()))
        });
        Ok(roles)
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .roles
            .values()
            .any(|stored| stored.slug() == role.slug() && stored.id() != role.id())
        {
            return Err(AppError::Conflict(format!(
                "role slug '{}' is already taken",
                role.slug()
            )));
        }

        tables.roles.insert(role.id(), role);
        Ok(())
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: BTreeSet<PermissionId>,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let role = tables
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;
        role.set_permissions(permissions);
        Ok(())
    }

    async fn role_grants_permission(&self, role_id: RoleId, permission: &str) -> AppResult<bool> {
        let tables = self.tables.read().await;
        let Some(permission_id) = tables.permission_id(permission) else {
            return Ok(false);
        };

        Ok(tables
            .roles
            .get(&role_id)
            .is_some_and(|role| role.grants(permission_id)))
    }
}

#[async_trait]
impl LegacyRolePermissionRepository for InMemoryAccessStore {
    async fn legacy_role_grants_permission(
        &self,
        role_name: &str,
        permission: &str,
    ) -> AppResult<bool> {
        let tables = self.tables.read().await;
        let Some(permission_id) = tables.permission_id(permission) else {
            return Ok(false);
        };

        Ok(tables
            .legacy_roles
            .get(&legacy_key(role_name))
            .is_some_and(|permissions| permissions.contains(&permission_id)))
    }

    async fn list_legacy_role_permissions(
        &self,
        role_name: &str,
    ) -> AppResult<Vec<PermissionId>> {
        Ok(self
            .tables
            .read()
            .await
            .legacy_roles
            .get(&legacy_key(role_name))
            .map(|permissions| permissions.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn grant_legacy_role_permission(
        &self,
        role_name: &str,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.permissions.contains_key(&permission_id) {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' does not exist"
            )));
        }

        tables
            .legacy_roles
            .entry(legacy_key(role_name))
            .or_default()
            .insert(permission_id);
        Ok(())
    }

    async fn revoke_legacy_role_permission(
        &self,
        role_name: &str,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .legacy_roles
            .get_mut(&legacy_key(role_name))
            .is_some_and(|permissions| permissions.remove(&permission_id)))
    }
}
