use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{
    AuditAction, PermissionCatalog, PermissionDefinition, PermissionDefinitionInput, PermissionId,
    User, UserId,
};

use crate::audit_trail::record_event;
use crate::{AccessRepositories, AuditEvent, AuthorizationService, Clock};

mod cache;
mod overrides;
mod roles;
mod temporary_access;
mod users;

pub use temporary_access::GrantTemporaryPermissionInput;
pub use users::RegisterUserInput;

/// Application service for permission administration.
///
/// Callers are expected to gate access through
/// [`AuthorizationService::require_permission`]; the service itself only
/// enforces domain rules such as grant ownership on revoke.
#[derive(Clone)]
pub struct PermissionAdminService {
    authorization_service: AuthorizationService,
    repositories: AccessRepositories,
    clock: Arc<dyn Clock>,
}

impl PermissionAdminService {
    /// Creates a new administration service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repositories: AccessRepositories,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            authorization_service,
            repositories,
            clock,
        }
    }

    /// Returns the current permission catalog.
    pub async fn list_catalog(&self) -> AppResult<PermissionCatalog> {
        self.repositories.catalog.load_catalog().await
    }

    /// Seeds an empty catalog. Returns the number of permissions inserted,
    /// which is zero when the catalog already holds entries.
    pub async fn seed_catalog(&self, catalog: PermissionCatalog) -> AppResult<usize> {
        let existing = self.repositories.catalog.load_catalog().await?;
        if !existing.is_empty() {
            return Ok(0);
        }

        let ordered = dependency_order(&catalog);
        let inserted = ordered.len();
        for definition in ordered {
            self.repositories
                .catalog
                .insert_permission(definition)
                .await?;
        }

        self.flush_cache_after_mapping_change().await;
        info!(inserted, "seeded permission catalog");
        Ok(inserted)
    }

    /// Adds one permission to the catalog.
    pub async fn add_permission(
        &self,
        input: PermissionDefinitionInput,
    ) -> AppResult<PermissionDefinition> {
        let definition = PermissionDefinition::new(input)?;
        let existing = self.repositories.catalog.load_catalog().await?;

        let mut definitions: Vec<PermissionDefinition> = existing.iter().cloned().collect();
        definitions.push(definition.clone());
        PermissionCatalog::new(definitions)?;

        self.repositories
            .catalog
            .insert_permission(definition.clone())
            .await?;
        info!(permission = definition.name(), "added catalog permission");
        Ok(definition)
    }

    /// Records that `permission` requires `depends_on`.
    pub async fn add_permission_dependency(
        &self,
        permission: &str,
        depends_on: &str,
    ) -> AppResult<()> {
        let existing = self.repositories.catalog.load_catalog().await?;
        let permission_id = find_permission_id(&existing, permission)?;
        let depends_on_id = find_permission_id(&existing, depends_on)?;

        let mut definitions: Vec<PermissionDefinition> = existing.iter().cloned().collect();
        for definition in &mut definitions {
            if definition.id() == permission_id {
                definition.add_dependency(depends_on_id)?;
            }
        }
        PermissionCatalog::new(definitions)?;

        self.repositories
            .catalog
            .add_permission_dependency(permission_id, depends_on_id)
            .await?;
        info!(permission, depends_on, "added permission dependency");
        Ok(())
    }

    pub(super) async fn find_user(&self, user_id: UserId) -> AppResult<User> {
        self.repositories
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
    }

    pub(super) async fn audit(
        &self,
        actor: &User,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: Option<String>,
    ) {
        record_event(
            self.repositories.audit.as_ref(),
            AuditEvent {
                actor: Some(actor.id()),
                action,
                resource_type: resource_type.to_owned(),
                resource_id,
                detail,
            },
        )
        .await;
    }

    pub(super) async fn flush_cache_after_mapping_change(&self) {
        if let Err(error) = self.authorization_service.flush_cache().await {
            warn!(error = %error, "permission cache flush failed after mapping change");
        }
    }

    pub(super) async fn invalidate_cache_for(&self, user_id: UserId) {
        if let Err(error) = self.authorization_service.invalidate_cache(user_id).await {
            warn!(user_id = %user_id, error = %error, "permission cache invalidation failed");
        }
    }
}

pub(crate) fn find_permission_id(
    catalog: &PermissionCatalog,
    permission: &str,
) -> AppResult<PermissionId> {
    catalog
        .find_by_name(permission)
        .map(PermissionDefinition::id)
        .ok_or_else(|| AppError::NotFound(format!("permission '{permission}' does not exist")))
}

/// Orders definitions so that every dependency precedes its dependents.
fn dependency_order(catalog: &PermissionCatalog) -> Vec<PermissionDefinition> {
    let mut placed = BTreeSet::new();
    let mut ordered = Vec::with_capacity(catalog.len());

    while ordered.len() < catalog.len() {
        let before = ordered.len();
        for definition in catalog.iter() {
            if placed.contains(&definition.id()) {
                continue;
            }
            if definition
                .dependencies()
                .iter()
                .all(|dependency| placed.contains(dependency))
            {
                placed.insert(definition.id());
                ordered.push(definition.clone());
            }
        }

        // Catalogs are acyclic by construction; this only guards the loop.
        if ordered.len() == before {
            break;
        }
    }

    ordered
}
