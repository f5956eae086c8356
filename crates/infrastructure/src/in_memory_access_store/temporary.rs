use async_trait::async_trait;
use chrono::{DateTime, Utc};
use wardkeep_application::TemporaryPermissionRepository;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{TemporaryPermission, TemporaryPermissionId, UserId};

use super::InMemoryAccessStore;

#[async_trait]
impl TemporaryPermissionRepository for InMemoryAccessStore {
    async fn find_effective_grant(
        &self,
        user_id: UserId,
        permission: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<TemporaryPermission>> {
        let tables = self.tables.read().await;
        let Some(permission_id) = tables.permission_id(permission) else {
            return Ok(None);
        };

        Ok(tables
            .temporary_permissions
            .values()
            .filter(|grant| {
                grant.user_id() == user_id
                    && grant.permission_id() == permission_id
                    && grant.is_effective_at(now)
            })
            .max_by_key(|grant| grant.expires_at())
            .cloned())
    }

    async fn find_grant(
        &self,
        id: TemporaryPermissionId,
    ) -> AppResult<Option<TemporaryPermission>> {
        Ok(self
            .tables
            .read()
            .await
            .temporary_permissions
            .get(&id)
            .cloned())
    }

    async fn list_grants_for_user(&self, user_id: UserId) -> AppResult<Vec<TemporaryPermission>> {
        let mut grants: Vec<TemporaryPermission> = self
            .tables
            .read()
            .await
            .temporary_permissions
            .values()
            .filter(|grant| grant.user_id() == user_id)
            .cloned()
            .collect();
        grants.sort_by(|left, right| {
            right
                .granted_at()
                .cmp(&left.granted_at())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(grants)
    }

    async fn insert_grant(&self, grant: TemporaryPermission) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.permissions.contains_key(&grant.permission_id()) {
            return Err(AppError::NotFound(format!(
                "permission '{}' does not exist",
                grant.permission_id()
            )));
        }

        let duplicate = tables.temporary_permissions.values().any(|stored| {
            stored.user_id() == grant.user_id()
                && stored.permission_id() == grant.permission_id()
                && stored.is_effective_at(grant.granted_at())
        });
        if duplicate {
            return Err(AppError::Validation(format!(
                "user '{}' already holds an active temporary grant for permission '{}'",
                grant.user_id(),
                grant.permission_id()
            )));
        }

        tables.temporary_permissions.insert(grant.id(), grant);
        Ok(())
    }

    async fn save_revocation(&self, grant: &TemporaryPermission) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .temporary_permissions
            .get_mut(&grant.id())
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "temporary permission '{}' does not exist",
                    grant.id()
                ))
            })?;

        if !stored.is_active() {
            return Err(AppError::InvalidState(format!(
                "temporary permission '{}' is already revoked",
                grant.id()
            )));
        }

        *stored = grant.clone();
        Ok(())
    }
}
