use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionCatalog, PermissionDefinition, PermissionId};

/// Repository port for the permission catalog.
#[async_trait]
pub trait PermissionCatalogRepository: Send + Sync {
    /// Loads the full validated catalog.
    async fn load_catalog(&self) -> AppResult<PermissionCatalog>;

    /// Inserts one permission. Fails with a conflict on a duplicate name.
    async fn insert_permission(&self, definition: PermissionDefinition) -> AppResult<()>;

    /// Records a `permission requires depends_on` edge.
    async fn add_permission_dependency(
        &self,
        permission_id: PermissionId,
        depends_on: PermissionId,
    ) -> AppResult<()>;
}
