use std::collections::BTreeSet;

use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionCatalog, PermissionId, User};

use crate::authority_providers::{AuthorityDecision, AuthorityProvider, consult_all};

use super::AuthorizationService;

impl AuthorizationService {
    pub(super) async fn collect_effective_permissions(
        &self,
        user: &User,
    ) -> AppResult<(PermissionCatalog, BTreeSet<PermissionId>)> {
        let catalog = self.catalog.load_catalog().await?;
        if user.is_super_admin() {
            let everything = catalog.iter().map(|definition| definition.id()).collect();
            return Ok((catalog, everything));
        }

        let mut granted = BTreeSet::new();
        let additive: [&dyn AuthorityProvider; 3] = [
            self.role_lookup.role_mapping(),
            self.role_lookup.legacy_role_mapping(),
            &self.temporary_grants,
        ];
        for provider in additive {
            for (permission_id, decision) in consult_all(provider, user).await? {
                if decision == AuthorityDecision::Allow {
                    granted.insert(permission_id);
                }
            }
        }

        for (permission_id, decision) in consult_all(&self.user_overrides, user).await? {
            match decision {
                AuthorityDecision::Allow => {
                    granted.insert(permission_id);
                }
                AuthorityDecision::Deny => {
                    granted.remove(&permission_id);
                }
                AuthorityDecision::Abstain => {}
            }
        }

        // Drop ids that no longer exist in the catalog.
        granted.retain(|permission_id| catalog.get(*permission_id).is_some());
        Ok((catalog, granted))
    }
}
