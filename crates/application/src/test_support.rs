//! In-memory fakes shared by service tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{
    ChangeRequestId, ChangeRequestStatus, PermissionCatalog, PermissionChangeRequest,
    PermissionDefinition, PermissionDefinitionInput, PermissionId, RiskLevel, Role, RoleId,
    RoleInput, TemporaryPermission, TemporaryPermissionId, User, UserId, UserPermissionOverride,
};

use crate::{
    AccessRepositories, AuditEvent, AuditRepository, ChangeRequestQuery, ChangeRequestRepository,
    Clock, LegacyRolePermissionRepository, PermissionCache, PermissionCatalogRepository,
    RoleRepository, TemporaryPermissionRepository, UserOverrideRepository, UserRepository,
};

pub(crate) struct FixedClock {
    seconds: AtomicI64,
}

impl FixedClock {
    pub(crate) fn at(now: DateTime<Utc>) -> Self {
        Self {
            seconds: AtomicI64::new(now.timestamp()),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.seconds.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

pub(crate) fn start_of_shift() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_258_000, 0).unwrap_or_default()
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

pub(crate) struct FailingAuditRepository;

#[async_trait]
impl AuditRepository for FailingAuditRepository {
    async fn append_event(&self, _event: AuditEvent) -> AppResult<()> {
        Err(AppError::Internal("audit sink offline".to_owned()))
    }
}

#[derive(Default)]
struct Tables {
    permissions: Vec<PermissionDefinition>,
    roles: HashMap<RoleId, Role>,
    legacy_roles: Vec<(String, PermissionId)>,
    users: HashMap<UserId, User>,
    overrides: Vec<UserPermissionOverride>,
    temporary_permissions: Vec<TemporaryPermission>,
    change_requests: Vec<PermissionChangeRequest>,
}

impl Tables {
    fn permission_id(&self, name: &str) -> Option<PermissionId> {
        self.permissions
            .iter()
            .find(|definition| definition.name() == name)
            .map(PermissionDefinition::id)
    }
}

/// Single-mutex fake of every repository port.
#[derive(Default)]
pub(crate) struct FakeAccessStore {
    tables: Mutex<Tables>,
    pub(crate) fail_reads: std::sync::atomic::AtomicBool,
}

impl FakeAccessStore {
    fn check_reads(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Internal("store offline".to_owned()));
        }
        Ok(())
    }

    pub(crate) async fn stored_request(
        &self,
        id: ChangeRequestId,
    ) -> Option<PermissionChangeRequest> {
        self.tables
            .lock()
            .await
            .change_requests
            .iter()
            .find(|request| request.id() == id)
            .cloned()
    }
}

#[async_trait]
impl PermissionCatalogRepository for FakeAccessStore {
    async fn load_catalog(&self) -> AppResult<PermissionCatalog> {
        self.check_reads()?;
        PermissionCatalog::new(self.tables.lock().await.permissions.clone())
    }

    async fn insert_permission(&self, definition: PermissionDefinition) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.permission_id(definition.name()).is_some() {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                definition.name()
            )));
        }
        tables.permissions.push(definition);
        Ok(())
    }

    async fn add_permission_dependency(
        &self,
        permission_id: PermissionId,
        depends_on: PermissionId,
    ) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let Some(definition) = tables
            .permissions
            .iter_mut()
            .find(|definition| definition.id() == permission_id)
        else {
            return Err(AppError::NotFound("permission not found".to_owned()));
        };
        definition.add_dependency(depends_on)
    }
}

#[async_trait]
impl RoleRepository for FakeAccessStore {
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        self.check_reads()?;
        Ok(self.tables.lock().await.roles.get(&role_id).cloned())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.tables.lock().await.roles.values().cloned().collect())
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if tables
            .roles
            .values()
            .any(|stored| stored.slug() == role.slug() && stored.id() != role.id())
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.slug()
            )));
        }
        tables.roles.insert(role.id(), role);
        Ok(())
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: BTreeSet<PermissionId>,
    ) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let Some(role) = tables.roles.get_mut(&role_id) else {
            return Err(AppError::NotFound(format!("role '{role_id}' not found")));
        };
        role.set_permissions(permissions);
        Ok(())
    }

    async fn role_grants_permission(&self, role_id: RoleId, permission: &str) -> AppResult<bool> {
        self.check_reads()?;
        let tables = self.tables.lock().await;
        let Some(permission_id) = tables.permission_id(permission) else {
            return Ok(false);
        };
        Ok(tables
            .roles
            .get(&role_id)
            .is_some_and(|role| role.grants(permission_id)))
    }
}

#[async_trait]
impl LegacyRolePermissionRepository for FakeAccessStore {
    async fn legacy_role_grants_permission(
        &self,
        role_name: &str,
        permission: &str,
    ) -> AppResult<bool> {
        self.check_reads()?;
        let tables = self.tables.lock().await;
        let Some(permission_id) = tables.permission_id(permission) else {
            return Ok(false);
        };
        Ok(tables.legacy_roles.iter().any(|(role, id)| {
            role.eq_ignore_ascii_case(role_name) && *id == permission_id
        }))
    }

    async fn list_legacy_role_permissions(
        &self,
        role_name: &str,
    ) -> AppResult<Vec<PermissionId>> {
        Ok(self
            .tables
            .lock()
            .await
            .legacy_roles
            .iter()
            .filter(|(role, _)| role.eq_ignore_ascii_case(role_name))
            .map(|(_, id)| *id)
            .collect())
    }

    async fn grant_legacy_role_permission(
        &self,
        role_name: &str,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables
            .legacy_roles
            .iter()
            .any(|(role, id)| role.eq_ignore_ascii_case(role_name) && *id == permission_id)
        {
            tables
                .legacy_roles
                .push((role_name.to_owned(), permission_id));
        }
        Ok(())
    }

    async fn revoke_legacy_role_permission(
        &self,
        role_name: &str,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.legacy_roles.len();
        tables
            .legacy_roles
            .retain(|(role, id)| !(role.eq_ignore_ascii_case(role_name) && *id == permission_id));
        Ok(tables.legacy_roles.len() != before)
    }
}

#[async_trait]
impl UserRepository for FakeAccessStore {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn save_user(&self, user: User) -> AppResult<()> {
        self.tables.lock().await.users.insert(user.id(), user);
        Ok(())
    }
}

#[async_trait]
impl UserOverrideRepository for FakeAccessStore {
    async fn find_override(
        &self,
        user_id: UserId,
        permission: &str,
    ) -> AppResult<Option<UserPermissionOverride>> {
        self.check_reads()?;
        let tables = self.tables.lock().await;
        let Some(permission_id) = tables.permission_id(permission) else {
            return Ok(None);
        };
        Ok(tables
            .overrides
            .iter()
            .find(|value| value.user_id == user_id && value.permission_id == permission_id)
            .copied())
    }

    async fn list_overrides(&self, user_id: UserId) -> AppResult<Vec<UserPermissionOverride>> {
        self.check_reads()?;
        Ok(self
            .tables
            .lock()
            .await
            .overrides
            .iter()
            .filter(|value| value.user_id == user_id)
            .copied()
            .collect())
    }

    async fn upsert_override(&self, value: UserPermissionOverride) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.overrides.retain(|stored| {
            !(stored.user_id == value.user_id && stored.permission_id == value.permission_id)
        });
        tables.overrides.push(value);
        Ok(())
    }

    async fn delete_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.overrides.len();
        tables
            .overrides
            .retain(|stored| !(stored.user_id == user_id && stored.permission_id == permission_id));
        Ok(tables.overrides.len() != before)
    }
}

#[async_trait]
impl TemporaryPermissionRepository for FakeAccessStore {
    async fn find_effective_grant(
        &self,
        user_id: UserId,
        permission: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<TemporaryPermission>> {
        self.check_reads()?;
        let tables = self.tables.lock().await;
        let Some(permission_id) = tables.permission_id(permission) else {
            return Ok(None);
        };
        Ok(tables
            .temporary_permissions
            .iter()
            .find(|grant| {
                grant.user_id() == user_id
                    && grant.permission_id() == permission_id
                    && grant.is_effective_at(now)
            })
            .cloned())
    }

    async fn find_grant(
        &self,
        id: TemporaryPermissionId,
    ) -> AppResult<Option<TemporaryPermission>> {
        Ok(self
            .tables
            .lock()
            .await
            .temporary_permissions
            .iter()
            .find(|grant| grant.id() == id)
            .cloned())
    }

    async fn list_grants_for_user(&self, user_id: UserId) -> AppResult<Vec<TemporaryPermission>> {
        self.check_reads()?;
        let mut grants: Vec<TemporaryPermission> = self
            .tables
            .lock()
            .await
            .temporary_permissions
            .iter()
            .filter(|grant| grant.user_id() == user_id)
            .cloned()
            .collect();
        grants.sort_by_key(|grant| std::cmp::Reverse(grant.granted_at()));
        Ok(grants)
    }

    async fn insert_grant(&self, grant: TemporaryPermission) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.temporary_permissions.iter().any(|stored| {
            stored.user_id() == grant.user_id()
                && stored.permission_id() == grant.permission_id()
                && stored.is_effective_at(grant.granted_at())
        }) {
            return Err(AppError::Validation(
                "duplicate active temporary permission".to_owned(),
            ));
        }
        tables.temporary_permissions.push(grant);
        Ok(())
    }

    async fn save_revocation(&self, grant: &TemporaryPermission) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let Some(stored) = tables
            .temporary_permissions
            .iter_mut()
            .find(|stored| stored.id() == grant.id())
        else {
            return Err(AppError::NotFound("temporary permission not found".to_owned()));
        };
        if !stored.is_active() {
            return Err(AppError::InvalidState(
                "temporary permission is already revoked".to_owned(),
            ));
        }
        *stored = grant.clone();
        Ok(())
    }
}

#[async_trait]
impl ChangeRequestRepository for FakeAccessStore {
    async fn insert_request(&self, request: PermissionChangeRequest) -> AppResult<()> {
        self.tables.lock().await.change_requests.push(request);
        Ok(())
    }

    async fn find_request(
        &self,
        id: ChangeRequestId,
    ) -> AppResult<Option<PermissionChangeRequest>> {
        Ok(self.stored_request(id).await)
    }

    async fn list_requests(
        &self,
        query: ChangeRequestQuery,
    ) -> AppResult<Vec<PermissionChangeRequest>> {
        let tables = self.tables.lock().await;
        let mut requests: Vec<PermissionChangeRequest> = tables
            .change_requests
            .iter()
            .filter(|request| query.status.is_none_or(|status| request.status() == status))
            .filter(|request| query.user_id.is_none_or(|user_id| request.user_id() == user_id))
            .cloned()
            .collect();
        requests.sort_by_key(|request| std::cmp::Reverse(request.created_at()));
        if let Some(limit) = query.limit {
            requests.truncate(limit);
        }
        Ok(requests)
    }

    async fn save_decision(&self, request: &PermissionChangeRequest) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let Some(stored) = tables
            .change_requests
            .iter_mut()
            .find(|stored| stored.id() == request.id())
        else {
            return Err(AppError::NotFound("change request not found".to_owned()));
        };
        if stored.status() != ChangeRequestStatus::Pending {
            return Err(AppError::InvalidState(
                wardkeep_domain::REQUEST_NO_LONGER_VALID.to_owned(),
            ));
        }
        *stored = request.clone();
        Ok(())
    }

    async fn apply_approval(&self, request: &PermissionChangeRequest) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let Some(stored) = tables
            .change_requests
            .iter_mut()
            .find(|stored| stored.id() == request.id())
        else {
            return Err(AppError::NotFound("change request not found".to_owned()));
        };
        if stored.status() != ChangeRequestStatus::Pending {
            return Err(AppError::InvalidState(
                wardkeep_domain::REQUEST_NO_LONGER_VALID.to_owned(),
            ));
        }
        *stored = request.clone();

        let user_id = request.user_id();
        let writes = request
            .permissions_to_add()
            .iter()
            .map(|id| UserPermissionOverride::allow(user_id, *id))
            .chain(
                request
                    .permissions_to_remove()
                    .iter()
                    .map(|id| UserPermissionOverride::deny(user_id, *id)),
            )
            .collect::<Vec<_>>();
        for value in writes {
            tables.overrides.retain(|existing| {
                !(existing.user_id == value.user_id && existing.permission_id == value.permission_id)
            });
            tables.overrides.push(value);
        }
        Ok(())
    }
}

/// Counting cache fake with no expiry.
#[derive(Default)]
pub(crate) struct FakePermissionCache {
    entries: Mutex<HashMap<(UserId, String), bool>>,
    pub(crate) reads: AtomicUsize,
    pub(crate) flushes: AtomicUsize,
}

impl FakePermissionCache {
    pub(crate) async fn cached(&self, user_id: UserId, permission: &str) -> Option<bool> {
        self.entries
            .lock()
            .await
            .get(&(user_id, permission.to_owned()))
            .copied()
    }
}

#[async_trait]
impl PermissionCache for FakePermissionCache {
    async fn get_decision(&self, user_id: UserId, permission: &str) -> AppResult<Option<bool>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.cached(user_id, permission).await)
    }

    async fn set_decision(
        &self,
        user_id: UserId,
        permission: &str,
        granted: bool,
        _ttl_seconds: u32,
    ) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .insert((user_id, permission.to_owned()), granted);
        Ok(())
    }

    async fn invalidate_user(&self, user_id: UserId) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .retain(|(cached_user, _), _| *cached_user != user_id);
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().await.clear();
        Ok(())
    }
}

/// Wiring shared by service tests.
pub(crate) struct Harness {
    pub(crate) store: Arc<FakeAccessStore>,
    pub(crate) audit: Arc<FakeAuditRepository>,
    pub(crate) clock: Arc<FixedClock>,
    pub(crate) repositories: AccessRepositories,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let store = Arc::new(FakeAccessStore::default());
        let audit = Arc::new(FakeAuditRepository::default());
        let clock = Arc::new(FixedClock::at(start_of_shift()));
        let repositories = AccessRepositories::from_store(store.clone(), audit.clone());
        Self {
            store,
            audit,
            clock,
            repositories,
        }
    }

    pub(crate) async fn permission(
        &self,
        name: &str,
        dependencies: &[PermissionId],
    ) -> PermissionId {
        let definition = PermissionDefinition::new(PermissionDefinitionInput {
            id: None,
            name: name.to_owned(),
            description: String::new(),
            resource: "billing".to_owned(),
            action: "view".to_owned(),
            category: "Billing".to_owned(),
            module: "billing".to_owned(),
            risk_level: RiskLevel::Low,
            requires_approval: false,
            dependencies: dependencies.iter().copied().collect(),
            is_critical: false,
        });
        let Ok(definition) = definition else {
            panic!("permission '{name}' should be valid");
        };
        let id = definition.id();
        if self.store.insert_permission(definition).await.is_err() {
            panic!("permission '{name}' should insert");
        }
        id
    }

    pub(crate) async fn role(&self, slug: &str, permissions: &[PermissionId]) -> RoleId {
        let role = Role::new(RoleInput {
            id: None,
            name: slug.to_owned(),
            slug: slug.to_owned(),
            priority: 0,
            parent_role_id: None,
            permissions: permissions.iter().copied().collect(),
        });
        let Ok(role) = role else {
            panic!("role '{slug}' should be valid");
        };
        let id = role.id();
        if self.store.save_role(role).await.is_err() {
            panic!("role '{slug}' should save");
        }
        id
    }

    pub(crate) async fn legacy_role(&self, role_name: &str, permission_id: PermissionId) {
        if self
            .store
            .grant_legacy_role_permission(role_name, permission_id)
            .await
            .is_err()
        {
            panic!("legacy row should insert");
        }
    }

    pub(crate) async fn user(
        &self,
        username: &str,
        role: Option<&str>,
        role_id: Option<RoleId>,
        super_admin: bool,
    ) -> User {
        let user = User::new(
            UserId::new(),
            username,
            role.map(ToOwned::to_owned),
            role_id,
            super_admin,
        );
        let Ok(user) = user else {
            panic!("user '{username}' should be valid");
        };
        if self.store.save_user(user.clone()).await.is_err() {
            panic!("user '{username}' should save");
        }
        user
    }
}
