use std::sync::Arc;

use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionId, User};

use crate::UserOverrideRepository;

use super::{AuthorityDecision, AuthorityProvider};

/// Applies explicit per-user allow and deny rows.
#[derive(Clone)]
pub struct UserOverrideProvider {
    overrides: Arc<dyn UserOverrideRepository>,
}

impl UserOverrideProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new(overrides: Arc<dyn UserOverrideRepository>) -> Self {
        Self { overrides }
    }
}

fn decision(allowed: bool) -> AuthorityDecision {
    if allowed {
        AuthorityDecision::Allow
    } else {
        AuthorityDecision::Deny
    }
}

#[async_trait]
impl AuthorityProvider for UserOverrideProvider {
    fn name(&self) -> &'static str {
        "user_override"
    }

    async fn decide(&self, user: &User, permission: &str) -> AppResult<AuthorityDecision> {
        Ok(self
            .overrides
            .find_override(user.id(), permission)
            .await?
            .map_or(AuthorityDecision::Abstain, |value| decision(value.allowed)))
    }

    async fn list_decisions(
        &self,
        user: &User,
    ) -> AppResult<Vec<(PermissionId, AuthorityDecision)>> {
        Ok(self
            .overrides
            .list_overrides(user.id())
            .await?
            .into_iter()
            .map(|value| (value.permission_id, decision(value.allowed)))
            .collect())
    }
}
