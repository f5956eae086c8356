use async_trait::async_trait;
use wardkeep_application::UserOverrideRepository;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionId, UserId, UserPermissionOverride};

use super::InMemoryAccessStore;

#[async_trait]
impl UserOverrideRepository for InMemoryAccessStore {
    async fn find_override(
        &self,
        user_id: UserId,
        permission: &str,
    ) -> AppResult<Option<UserPermissionOverride>> {
        let tables = self.tables.read().await;
        let Some(permission_id) = tables.permission_id(permission) else {
            return Ok(None);
        };

        Ok(tables
            .overrides
            .get(&(user_id, permission_id))
            .map(|allowed| UserPermissionOverride {
                user_id,
                permission_id,
                allowed: *allowed,
            }))
    }

    async fn list_overrides(&self, user_id: UserId) -> AppResult<Vec<UserPermissionOverride>> {
        let tables = self.tables.read().await;
        let mut overrides: Vec<UserPermissionOverride> = tables
            .overrides
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .map(|((_, permission_id), allowed)| UserPermissionOverride {
                user_id,
                permission_id: *permission_id,
                allowed: *allowed,
            })
            .collect();
        overrides.sort_by_key(|value| value.permission_id);
        Ok(overrides)
    }

    async fn upsert_override(&self, value: UserPermissionOverride) -> AppResult<()> {
        self.tables
            .write()
            .await
            .overrides
            .insert((value.user_id, value.permission_id), value.allowed);
        Ok(())
    }

    async fn delete_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        Ok(self
            .tables
            .write()
            .await
            .overrides
            .remove(&(user_id, permission_id))
            .is_some())
    }
}
