use std::sync::Arc;

use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionId, User};

use crate::{Clock, TemporaryPermissionRepository};

use super::{AuthorityDecision, AuthorityProvider};

/// Grants permissions held through an active, unexpired temporary grant.
///
/// Expiry is evaluated against the clock on every read; no sweeper is
/// needed for correctness.
#[derive(Clone)]
pub struct TemporaryGrantProvider {
    temporary_permissions: Arc<dyn TemporaryPermissionRepository>,
    clock: Arc<dyn Clock>,
}

impl TemporaryGrantProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new(
        temporary_permissions: Arc<dyn TemporaryPermissionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            temporary_permissions,
            clock,
        }
    }
}

#[async_trait]
impl AuthorityProvider for TemporaryGrantProvider {
    fn name(&self) -> &'static str {
        "temporary_grant"
    }

    async fn decide(&self, user: &User, permission: &str) -> AppResult<AuthorityDecision> {
        let grant = self
            .temporary_permissions
            .find_effective_grant(user.id(), permission, self.clock.now())
            .await?;
        Ok(AuthorityDecision::allow_if(grant.is_some()))
    }

    async fn list_decisions(
        &self,
        user: &User,
    ) -> AppResult<Vec<(PermissionId, AuthorityDecision)>> {
        let now = self.clock.now();
        Ok(self
            .temporary_permissions
            .list_grants_for_user(user.id())
            .await?
            .into_iter()
            .filter(|grant| grant.is_effective_at(now))
            .map(|grant| (grant.permission_id(), AuthorityDecision::Allow))
            .collect())
    }
}
