use async_trait::async_trait;
use wardkeep_application::PermissionCatalogRepository;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{PermissionCatalog, PermissionDefinition, PermissionId};

use super::InMemoryAccessStore;

#[async_trait]
impl PermissionCatalogRepository for InMemoryAccessStore {
    async fn load_catalog(&self) -> AppResult<PermissionCatalog> {
        let tables = self.tables.read().await;
        PermissionCatalog::new(tables.permissions.values().cloned().collect())
    }

    async fn insert_permission(&self, definition: PermissionDefinition) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.permission_names.contains_key(definition.name())
            || tables.permissions.contains_key(&definition.id())
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                definition.name()
            )));
        }

        if let Some(missing) = definition
            .dependencies()
            .iter()
            .find(|dependency| !tables.permissions.contains_key(dependency))
        {
            return Err(AppError::NotFound(format!(
                "permission '{missing}' does not exist"
            )));
        }

        tables
            .permission_names
            .insert(definition.name().to_owned(), definition.id());
        tables.permissions.insert(definition.id(), definition);
        Ok(())
    }

    async fn add_permission_dependency(
        &self,
        permission_id: PermissionId,
        depends_on: PermissionId,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.permissions.contains_key(&depends_on) {
            return Err(AppError::NotFound(format!(
                "permission '{depends_on}' does not exist"
            )));
        }

        let definition = tables
            .permissions
            .get_mut(&permission_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("permission '{permission_id}' does not exist"))
            })?;
        definition.add_dependency(depends_on)
    }
}
