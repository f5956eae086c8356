use std::sync::Arc;

use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionId, User};

use crate::LegacyRolePermissionRepository;

use super::{AuthorityDecision, AuthorityProvider};

/// Grants permissions mapped to the user's legacy role name.
#[derive(Clone)]
pub struct LegacyRoleMappingProvider {
    legacy_roles: Arc<dyn LegacyRolePermissionRepository>,
}

impl LegacyRoleMappingProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new(legacy_roles: Arc<dyn LegacyRolePermissionRepository>) -> Self {
        Self { legacy_roles }
    }
}

#[async_trait]
impl AuthorityProvider for LegacyRoleMappingProvider {
    fn name(&self) -> &'static str {
        "legacy_role_mapping"
    }

    async fn decide(&self, user: &User, permission: &str) -> AppResult<AuthorityDecision> {
        let Some(role_name) = user.role() else {
            return Ok(AuthorityDecision::Abstain);
        };

        let granted = self
            .legacy_roles
            .legacy_role_grants_permission(role_name, permission)
            .await?;
        Ok(AuthorityDecision::allow_if(granted))
    }

    async fn list_decisions(
        &self,
        user: &User,
    ) -> AppResult<Vec<(PermissionId, AuthorityDecision)>> {
        let Some(role_name) = user.role() else {
            return Ok(Vec::new());
        };

        Ok(self
            .legacy_roles
            .list_legacy_role_permissions(role_name)
            .await?
            .into_iter()
            .map(|permission_id| (permission_id, AuthorityDecision::Allow))
            .collect())
    }
}
