use std::sync::Arc;

use super::{
    AuditRepository, ChangeRequestRepository, LegacyRolePermissionRepository,
    PermissionCatalogRepository, RoleRepository, TemporaryPermissionRepository,
    UserOverrideRepository, UserRepository,
};

/// Bundle of the repositories the access services read and write.
#[derive(Clone)]
pub struct AccessRepositories {
    /// Permission catalog.
    pub catalog: Arc<dyn PermissionCatalogRepository>,
    /// Normalized roles.
    pub roles: Arc<dyn RoleRepository>,
    /// Legacy role table.
    pub legacy_roles: Arc<dyn LegacyRolePermissionRepository>,
    /// Staff accounts.
    pub users: Arc<dyn UserRepository>,
    /// Per-user overrides.
    pub overrides: Arc<dyn UserOverrideRepository>,
    /// Temporary grants.
    pub temporary_permissions: Arc<dyn TemporaryPermissionRepository>,
    /// Change requests.
    pub change_requests: Arc<dyn ChangeRequestRepository>,
    /// Audit sink.
    pub audit: Arc<dyn AuditRepository>,
}

impl AccessRepositories {
    /// Uses one store for every repository and a separate audit sink.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>, audit: Arc<dyn AuditRepository>) -> Self
    where
        S: PermissionCatalogRepository
            + RoleRepository
            + LegacyRolePermissionRepository
            + UserRepository
            + UserOverrideRepository
            + TemporaryPermissionRepository
            + ChangeRequestRepository
            + 'static,
    {
        Self {
            catalog: store.clone(),
            roles: store.clone(),
            legacy_roles: store.clone(),
            users: store.clone(),
            overrides: store.clone(),
            temporary_permissions: store.clone(),
            change_requests: store,
            audit,
        }
    }
}
