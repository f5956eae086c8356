use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{
    AuditAction, ChangeRequestId, ChangeRequestInput, ChangeRequestStatus, PermissionCatalog,
    PermissionChangeRequest, PermissionId, User, validate_dependencies,
};

use crate::audit_trail::record_event;
use crate::{AccessRepositories, AuditEvent, AuthorizationService, ChangeRequestQuery, Clock};

/// Input payload for opening a permission change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChangeRequestInput {
    /// Permissions to grant through allow overrides.
    pub permissions_to_add: BTreeSet<PermissionId>,
    /// Permissions to withdraw through deny overrides.
    pub permissions_to_remove: BTreeSet<PermissionId>,
    /// Justification shown to approvers.
    pub reason: String,
    /// Optional decision deadline.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Application service for the approval-gated change request workflow.
#[derive(Clone)]
pub struct ChangeRequestService {
    authorization_service: AuthorizationService,
    repositories: AccessRepositories,
    clock: Arc<dyn Clock>,
}

impl ChangeRequestService {
    /// Creates a new change request service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repositories: AccessRepositories,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            authorization_service,
            repositories,
            clock,
        }
    }

    /// Opens a pending request to change `target`'s permissions.
    ///
    /// Additions are checked against the dependency graph using the target's
    /// current effective permissions plus the batch itself.
    pub async fn create(
        &self,
        target: &User,
        input: CreateChangeRequestInput,
        requested_by: &User,
    ) -> AppResult<PermissionChangeRequest> {
        let now = self.clock.now();
        let request = PermissionChangeRequest::new(
            ChangeRequestInput {
                user_id: target.id(),
                requested_by: requested_by.id(),
                permissions_to_add: input.permissions_to_add,
                permissions_to_remove: input.permissions_to_remove,
                reason: input.reason,
                expires_at: input.expires_at,
            },
            now,
        )?;

        let catalog = self.repositories.catalog.load_catalog().await?;
        if let Some(unknown) = request
            .permissions_to_add()
            .iter()
            .chain(request.permissions_to_remove())
            .find(|permission_id| catalog.get(**permission_id).is_none())
        {
            return Err(AppError::Validation(format!(
                "permission '{unknown}' does not exist"
            )));
        }

        let existing: Vec<PermissionId> = self
            .authorization_service
            .effective_permission_ids(target)
            .await?
            .into_iter()
            .collect();
        let to_add: Vec<PermissionId> = request.permissions_to_add().iter().copied().collect();
        let violations = validate_dependencies(&catalog, &to_add, &existing);
        if !violations.is_empty() {
            let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(AppError::Validation(messages.join("; ")));
        }

        self.repositories
            .change_requests
            .insert_request(request.clone())
            .await?;

        info!(
            request_id = %request.id(),
            user_id = %target.id(),
            requested_by = %requested_by.id(),
            "opened permission change request"
        );
        self.audit(
            Some(requested_by),
            AuditAction::ChangeRequestCreated,
            request.id(),
            Some(format!(
                "add=[{}] remove=[{}]",
                joined_names(&catalog, request.permissions_to_add()),
                joined_names(&catalog, request.permissions_to_remove())
            )),
        )
        .await;

        Ok(request)
    }

    /// Approves a pending request and applies its overrides atomically.
    pub async fn approve(
        &self,
        id: ChangeRequestId,
        approver: &User,
    ) -> AppResult<PermissionChangeRequest> {
        let mut request = self.find_existing(id).await?;
        request.approve(approver, self.clock.now())?;

        self.repositories
            .change_requests
            .apply_approval(&request)
            .await?;
        if let Err(error) = self
            .authorization_service
            .invalidate_cache(request.user_id())
            .await
        {
            warn!(
                user_id = %request.user_id(),
                error = %error,
                "permission cache invalidation failed after approval"
            );
        }

        info!(
            request_id = %id,
            approved_by = %approver.id(),
            "approved permission change request"
        );
        self.audit(Some(approver), AuditAction::ChangeRequestApproved, id, None)
            .await;

        Ok(request)
    }

    /// Rejects a pending request. No permissions change.
    pub async fn reject(
        &self,
        id: ChangeRequestId,
        approver: &User,
    ) -> AppResult<PermissionChangeRequest> {
        let mut request = self.find_existing(id).await?;
        request.reject(approver, self.clock.now())?;
        self.repositories
            .change_requests
            .save_decision(&request)
            .await?;

        info!(
            request_id = %id,
            rejected_by = %approver.id(),
            "rejected permission change request"
        );
        self.audit(Some(approver), AuditAction::ChangeRequestRejected, id, None)
            .await;

        Ok(request)
    }

    /// Withdraws a pending request on behalf of its requester.
    pub async fn cancel(
        &self,
        id: ChangeRequestId,
        requester: &User,
    ) -> AppResult<PermissionChangeRequest> {
        let mut request = self.find_existing(id).await?;
        request.cancel(requester, self.clock.now())?;
        self.repositories
            .change_requests
            .save_decision(&request)
            .await?;

        info!(
            request_id = %id,
            cancelled_by = %requester.id(),
            "cancelled permission change request"
        );
        self.audit(Some(requester), AuditAction::ChangeRequestCancelled, id, None)
            .await;

        Ok(request)
    }

    /// Moves every overdue pending request to `expired`. Returns the count.
    pub async fn expire_overdue(&self) -> AppResult<usize> {
        let now = self.clock.now();
        let pending = self
            .repositories
            .change_requests
            .list_requests(ChangeRequestQuery {
                status: Some(ChangeRequestStatus::Pending),
                ..ChangeRequestQuery::default()
            })
            .await?;

        let mut expired = 0_usize;
        for mut request in pending {
            if !request.expire(now) {
                continue;
            }

            match self
                .repositories
                .change_requests
                .save_decision(&request)
                .await
            {
                Ok(()) => {
                    expired += 1;
                    self.audit(None, AuditAction::ChangeRequestExpired, request.id(), None)
                        .await;
                }
                // Decided concurrently; nothing left to expire.
                Err(AppError::InvalidState(_)) => {}
                Err(error) => return Err(error),
            }
        }

        if expired > 0 {
            info!(expired, "expired overdue permission change requests");
        }
        Ok(expired)
    }

    /// Finds one request by id.
    pub async fn find(&self, id: ChangeRequestId) -> AppResult<Option<PermissionChangeRequest>> {
        self.repositories.change_requests.find_request(id).await
    }

    /// Lists requests newest first.
    pub async fn list(&self, query: ChangeRequestQuery) -> AppResult<Vec<PermissionChangeRequest>> {
        self.repositories.change_requests.list_requests(query).await
    }

    /// Returns the status a request has at the current time.
    #[must_use]
    pub fn effective_status(&self, request: &PermissionChangeRequest) -> ChangeRequestStatus {
        request.effective_status(self.clock.now())
    }

    async fn find_existing(&self, id: ChangeRequestId) -> AppResult<PermissionChangeRequest> {
        self.repositories
            .change_requests
            .find_request(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("change request '{id}' does not exist")))
    }

    async fn audit(
        &self,
        actor: Option<&User>,
        action: AuditAction,
        id: ChangeRequestId,
        detail: Option<String>,
    ) {
        record_event(
            self.repositories.audit.as_ref(),
            AuditEvent {
                actor: actor.map(User::id),
                action,
                resource_type: "permission_change_request".to_owned(),
                resource_id: id.to_string(),
                detail,
            },
        )
        .await;
    }
}

fn joined_names(catalog: &PermissionCatalog, ids: &BTreeSet<PermissionId>) -> String {
    catalog
        .names_for(ids)
        .into_iter()
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests;
