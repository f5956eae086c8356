use std::collections::{BTreeMap, BTreeSet, HashMap};

use tokio::sync::RwLock;
use wardkeep_domain::{
    ChangeRequestId, PermissionChangeRequest, PermissionDefinition, PermissionId, Role, RoleId,
    TemporaryPermission, TemporaryPermissionId, User, UserId,
};

mod catalog;
mod change_requests;
mod overrides;
mod roles;
mod temporary;
mod users;

#[derive(Debug, Default)]
struct AccessTables {
    permissions: BTreeMap<PermissionId, PermissionDefinition>,
    permission_names: HashMap<String, PermissionId>,
    roles: HashMap<RoleId, Role>,
    // Keyed by lowercased role name.
    legacy_roles: HashMap<String, BTreeSet<PermissionId>>,
    users: HashMap<UserId, User>,
    overrides: HashMap<(UserId, PermissionId), bool>,
    temporary_permissions: HashMap<TemporaryPermissionId, TemporaryPermission>,
    change_requests: HashMap<ChangeRequestId, PermissionChangeRequest>,
}

impl AccessTables {
    fn permission_id(&self, name: &str) -> Option<PermissionId> {
        self.permission_names.get(name).copied()
    }
}

/// In-memory implementation of every access repository port.
///
/// All tables sit behind one lock, so multi-table writes such as an
/// approval are atomic.
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    tables: RwLock<AccessTables>,
}

impl InMemoryAccessStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn legacy_key(role_name: &str) -> String {
    role_name.trim().to_lowercase()
}
