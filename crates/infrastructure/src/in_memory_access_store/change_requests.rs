use async_trait::async_trait;
use wardkeep_application::{ChangeRequestQuery, ChangeRequestRepository};
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{
    ChangeRequestId, ChangeRequestStatus, PermissionChangeRequest, REQUEST_NO_LONGER_VALID,
};

use super::{AccessTables, InMemoryAccessStore};

impl AccessTables {
    fn replace_pending_request(&mut self, request: &PermissionChangeRequest) -> AppResult<()> {
        let stored = self
            .change_requests
            .get_mut(&request.id())
            .ok_or_else(|| {
                AppError::NotFound(format!("change request '{}' does not exist", request.id()))
            })?;

        if stored.status() != ChangeRequestStatus::Pending {
            return Err(AppError::InvalidState(REQUEST_NO_LONGER_VALID.to_owned()));
        }

        *stored = request.clone();
        Ok(())
    }
}

#[async_trait]
impl ChangeRequestRepository for InMemoryAccessStore {
    async fn insert_request(&self, request: PermissionChangeRequest) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.change_requests.contains_key(&request.id()) {
            return Err(AppError::Conflict(format!(
                "change request '{}' already exists",
                request.id()
            )));
        }

        tables.change_requests.insert(request.id(), request);
        Ok(())
    }

    async fn find_request(
        &self,
        id: ChangeRequestId,
    ) -> AppResult<Option<PermissionChangeRequest>> {
        Ok(self.tables.read().await.change_requests.get(&id).cloned())
    }

    async fn list_requests(
        &self,
        query: ChangeRequestQuery,
    ) -> AppResult<Vec<PermissionChangeRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<PermissionChangeRequest> = tables
            .change_requests
            .values()
            .filter(|request| query.status.is_none_or(|status| request.status() == status))
            .filter(|request| {
                query
                    .user_id
                    .is_none_or(|user_id| request.user_id() == user_id)
            })
            .cloned()
            .collect();

        requests.sort_by(|left, right| {
            right
                .created_at()
                .cmp(&left.created_at())
                .then_with(|| left.id().cmp(&right.id()))
        });
        if let Some(limit) = query.limit {
            requests.truncate(limit);
        }

        Ok(requests)
    }

    async fn save_decision(&self, request: &PermissionChangeRequest) -> AppResult<()> {
        self.tables.write().await.replace_pending_request(request)
    }

    async fn apply_approval(&self, request: &PermissionChangeRequest) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.replace_pending_request(request)?;

        let user_id = request.user_id();
        for permission_id in request.permissions_to_add() {
            tables.overrides.insert((user_id, *permission_id), true);
        }
        for permission_id in request.permissions_to_remove() {
            tables.overrides.insert((user_id, *permission_id), false);
        }

        Ok(())
    }
}
