//! Independent sources of permission decisions.
//!
//! Each provider answers for one source only. Precedence between sources is
//! owned by [`crate::AuthorizationService`].

mod legacy_role_mapping;
mod role_mapping;
mod temporary_grant;
mod user_override;

use async_trait::async_trait;
use tracing::warn;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionId, User};

pub use legacy_role_mapping::LegacyRoleMappingProvider;
pub use role_mapping::RoleMappingProvider;
pub use temporary_grant::TemporaryGrantProvider;
pub use user_override::UserOverrideProvider;

/// Decision returned by one authority provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityDecision {
    /// The source grants the permission.
    Allow,
    /// The source explicitly denies the permission.
    Deny,
    /// The source has nothing to say.
    Abstain,
}

impl AuthorityDecision {
    /// Maps a plain grant flag, where `false` means no opinion.
    #[must_use]
    pub fn allow_if(granted: bool) -> Self {
        if granted { Self::Allow } else { Self::Abstain }
    }
}

/// One source of permission decisions.
#[async_trait]
pub trait AuthorityProvider: Send + Sync {
    /// Stable label used in logs.
    fn name(&self) -> &'static str;

    /// Decides one permission for a user.
    async fn decide(&self, user: &User, permission: &str) -> AppResult<AuthorityDecision>;

    /// Lists every non-abstaining decision the source holds for a user.
    async fn list_decisions(&self, user: &User)
    -> AppResult<Vec<(PermissionId, AuthorityDecision)>>;
}

/// Asks one provider for a decision, logging failures with its label.
pub(crate) async fn consult(
    provider: &dyn AuthorityProvider,
    user: &User,
    permission: &str,
) -> AppResult<AuthorityDecision> {
    provider
        .decide(user, permission)
        .await
        .inspect_err(|error| {
            warn!(
                provider = provider.name(),
                user_id = %user.id(),
                permission,
                error = %error,
                "authority provider lookup failed"
            );
        })
}

/// Lists one provider's decisions, logging failures with its label.
pub(crate) async fn consult_all(
    provider: &dyn AuthorityProvider,
    user: &User,
) -> AppResult<Vec<(PermissionId, AuthorityDecision)>> {
    provider.list_decisions(user).await.inspect_err(|error| {
        warn!(
            provider = provider.name(),
            user_id = %user.id(),
            error = %error,
            "authority provider listing failed"
        );
    })
}
