use std::sync::Arc;

use tracing::warn;
use wardkeep_core::AppResult;
use wardkeep_domain::{User, UserId};

use crate::authority_providers::{
    AuthorityDecision, LegacyRoleMappingProvider, RoleMappingProvider, consult,
};
use crate::{LegacyRolePermissionRepository, PermissionCache, RoleRepository};

/// Role-derived lookup with an optional read-through cache.
///
/// Both positive and negative results are cached. Cache failures degrade to
/// a direct lookup. A lookup that races an invalidation may still write its
/// pre-change result afterwards; that entry stays stale until its ttl runs
/// out.
#[derive(Clone)]
pub(super) struct CachedRoleLookup {
    role_mapping: RoleMappingProvider,
    legacy_role_mapping: LegacyRoleMappingProvider,
    cache: Option<Arc<dyn PermissionCache>>,
    ttl_seconds: u32,
}

impl CachedRoleLookup {
    pub(super) fn new(
        roles: Arc<dyn RoleRepository>,
        legacy_roles: Arc<dyn LegacyRolePermissionRepository>,
    ) -> Self {
        Self {
            role_mapping: RoleMappingProvider::new(roles),
            legacy_role_mapping: LegacyRoleMappingProvider::new(legacy_roles),
            cache: None,
            ttl_seconds: 0,
        }
    }

    pub(super) fn with_cache(mut self, cache: Arc<dyn PermissionCache>, ttl_seconds: u32) -> Self {
        if ttl_seconds > 0 {
            self.cache = Some(cache);
            self.ttl_seconds = ttl_seconds;
        }
        self
    }

    pub(super) fn role_mapping(&self) -> &RoleMappingProvider {
        &self.role_mapping
    }

    pub(super) fn legacy_role_mapping(&self) -> &LegacyRoleMappingProvider {
        &self.legacy_role_mapping
    }

    pub(super) async fn grants(&self, user: &User, permission: &str) -> AppResult<bool> {
        let Some(cache) = &self.cache else {
            return self.lookup(user, permission).await;
        };

        match cache.get_decision(user.id(), permission).await {
            Ok(Some(granted)) => return Ok(granted),
            Ok(None) => {}
            Err(error) => {
                warn!(
                    user_id = %user.id(),
                    permission,
                    error = %error,
                    "permission cache read failed"
                );
            }
        }

        let granted = self.lookup(user, permission).await?;
        if let Err(error) = cache
            .set_decision(user.id(), permission, granted, self.ttl_seconds)
            .await
        {
            warn!(
                user_id = %user.id(),
                permission,
                error = %error,
                "permission cache write failed"
            );
        }

        Ok(granted)
    }

    pub(super) async fn invalidate_user(&self, user_id: UserId) -> AppResult<()> {
        match &self.cache {
            Some(cache) => cache.invalidate_user(user_id).await,
            None => Ok(()),
        }
    }

    pub(super) async fn flush(&self) -> AppResult<()> {
        match &self.cache {
            Some(cache) => cache.flush().await,
            None => Ok(()),
        }
    }

    async fn lookup(&self, user: &User, permission: &str) -> AppResult<bool> {
        if consult(&self.role_mapping, user, permission).await? == AuthorityDecision::Allow {
            return Ok(true);
        }

        Ok(consult(&self.legacy_role_mapping, user, permission).await? == AuthorityDecision::Allow)
    }
}
