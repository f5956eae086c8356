use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{PermissionId, User, UserId};

use crate::authority_providers::{
    AuthorityDecision, TemporaryGrantProvider, UserOverrideProvider, consult,
};
use crate::{AccessRepositories, Clock, PermissionCache, PermissionCatalogRepository};

mod cached_role_lookup;
mod effective_permissions;

use cached_role_lookup::CachedRoleLookup;

/// Source that decided one permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResolution {
    /// The user bypasses every check.
    SuperAdmin,
    /// An allow override granted the permission.
    OverrideAllowed,
    /// A deny override blocked the permission.
    OverrideDenied,
    /// An active temporary grant granted the permission.
    TemporaryGrant,
    /// The normalized or legacy role mapping granted the permission.
    RoleGranted,
    /// No source granted the permission.
    Missing,
}

impl PermissionResolution {
    /// Returns whether the resolution grants access.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(
            self,
            Self::SuperAdmin | Self::OverrideAllowed | Self::TemporaryGrant | Self::RoleGranted
        )
    }

    /// Returns a stable label for this resolution.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::OverrideAllowed => "override_allowed",
            Self::OverrideDenied => "override_denied",
            Self::TemporaryGrant => "temporary_grant",
            Self::RoleGranted => "role",
            Self::Missing => "missing",
        }
    }
}

/// Permission resolver combining every authority source.
///
/// Precedence is fixed: super-admin, then user override, then temporary
/// grant, then the cached role mapping (normalized or legacy), then deny.
/// Override and temporary lookups never touch the cache.
#[derive(Clone)]
pub struct AuthorizationService {
    catalog: Arc<dyn PermissionCatalogRepository>,
    user_overrides: UserOverrideProvider,
    temporary_grants: TemporaryGrantProvider,
    role_lookup: CachedRoleLookup,
}

impl AuthorizationService {
    /// Creates a resolver without a permission cache.
    #[must_use]
    pub fn new(repositories: &AccessRepositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog: repositories.catalog.clone(),
            user_overrides: UserOverrideProvider::new(repositories.overrides.clone()),
            temporary_grants: TemporaryGrantProvider::new(
                repositories.temporary_permissions.clone(),
                clock,
            ),
            role_lookup: CachedRoleLookup::new(
                repositories.roles.clone(),
                repositories.legacy_roles.clone(),
            ),
        }
    }

    /// Enables caching of role-derived decisions. A zero ttl keeps caching
    /// disabled.
    #[must_use]
    pub fn with_permission_cache(
        mut self,
        cache: Arc<dyn PermissionCache>,
        ttl_seconds: u32,
    ) -> Self {
        self.role_lookup = self.role_lookup.with_cache(cache, ttl_seconds);
        self
    }

    /// Returns whether the user currently holds the permission.
    ///
    /// Never fails: any storage error is logged and the check is denied.
    pub async fn has_permission(&self, user: &User, permission: &str) -> bool {
        match self.resolve_permission(user, permission).await {
            Ok(resolution) => resolution.is_granted(),
            Err(error) => {
                warn!(
                    user_id = %user.id(),
                    permission,
                    error = %error,
                    "permission check failed closed"
                );
                false
            }
        }
    }

    /// Returns whether the user holds at least one of the permissions.
    /// An empty list grants nothing.
    pub async fn has_any_permission<S>(&self, user: &User, permissions: &[S]) -> bool
    where
        S: AsRef<str> + Sync,
    {
        for permission in permissions {
            if self.has_permission(user, permission.as_ref()).await {
                return true;
            }
        }

        false
    }

    /// Returns whether the user holds every permission. An empty list is
    /// trivially satisfied.
    pub async fn has_all_permissions<S>(&self, user: &User, permissions: &[S]) -> bool
    where
        S: AsRef<str> + Sync,
    {
        for permission in permissions {
            if !self.has_permission(user, permission.as_ref()).await {
                return false;
            }
        }

        true
    }

    /// Ensures the user holds the permission.
    pub async fn require_permission(&self, user: &User, permission: &str) -> AppResult<()> {
        if self.has_permission(user, permission).await {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{}' is missing permission '{permission}'",
            user.username()
        )))
    }

    /// Resolves one permission and reports which source decided it.
    pub async fn resolve_permission(
        &self,
        user: &User,
        permission: &str,
    ) -> AppResult<PermissionResolution> {
        if user.is_super_admin() {
            return Ok(PermissionResolution::SuperAdmin);
        }

        let resolution = match consult(&self.user_overrides, user, permission).await? {
            AuthorityDecision::Allow => PermissionResolution::OverrideAllowed,
            AuthorityDecision::Deny => PermissionResolution::OverrideDenied,
            AuthorityDecision::Abstain => {
                if consult(&self.temporary_grants, user, permission).await?
                    == AuthorityDecision::Allow
                {
                    PermissionResolution::TemporaryGrant
                } else if self.role_lookup.grants(user, permission).await? {
                    PermissionResolution::RoleGranted
                } else {
                    PermissionResolution::Missing
                }
            }
        };

        debug!(
            user_id = %user.id(),
            permission,
            resolution = resolution.as_str(),
            "resolved permission"
        );
        Ok(resolution)
    }

    /// Returns every permission name the user effectively holds.
    ///
    /// Always computed fresh. Fails closed to an empty set.
    pub async fn effective_permissions(&self, user: &User) -> BTreeSet<String> {
        let result = self.collect_effective_permissions(user).await;
        match result {
            Ok((catalog, granted)) => catalog.names_for(&granted),
            Err(error) => {
                warn!(
                    user_id = %user.id(),
                    error = %error,
                    "effective permission listing failed closed"
                );
                BTreeSet::new()
            }
        }
    }

    /// Returns the ids of every permission the user effectively holds.
    pub async fn effective_permission_ids(
        &self,
        user: &User,
    ) -> AppResult<BTreeSet<PermissionId>> {
        let (_, granted) = self.collect_effective_permissions(user).await?;
        Ok(granted)
    }

    /// Drops cached role-derived decisions for one user.
    pub async fn invalidate_cache(&self, user_id: UserId) -> AppResult<()> {
        self.role_lookup.invalidate_user(user_id).await
    }

    /// Drops every cached role-derived decision.
    pub async fn flush_cache(&self) -> AppResult<()> {
        self.role_lookup.flush().await
    }
}

#[cfg(test)]
mod tests;
