use std::sync::Arc;

use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionId, User};

use crate::RoleRepository;

use super::{AuthorityDecision, AuthorityProvider};

/// Grants permissions mapped to the user's normalized role.
#[derive(Clone)]
pub struct RoleMappingProvider {
    roles: Arc<dyn RoleRepository>,
}

impl RoleMappingProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl AuthorityProvider for RoleMappingProvider {
    fn name(&self) -> &'static str {
        "role_mapping"
    }

    async fn decide(&self, user: &User, permission: &str) -> AppResult<AuthorityDecision> {
        let Some(role_id) = user.role_id() else {
            return Ok(AuthorityDecision::Abstain);
        };

        let granted = self.roles.role_grants_permission(role_id, permission).await?;
        Ok(AuthorityDecision::allow_if(granted))
    }

    async fn list_decisions(
        &self,
        user: &User,
    ) -> AppResult<Vec<(PermissionId, AuthorityDecision)>> {
        let Some(role_id) = user.role_id() else {
            return Ok(Vec::new());
        };

        // A dangling role id grants nothing.
        let Some(role) = self.roles.find_role(role_id).await? else {
            return Ok(Vec::new());
        };

        Ok(role
            .permissions()
            .iter()
            .map(|permission_id| (*permission_id, AuthorityDecision::Allow))
            .collect())
    }
}
