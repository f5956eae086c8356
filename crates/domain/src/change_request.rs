use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardkeep_core::{AppError, AppResult};

use crate::{PermissionId, User, UserId};

/// Error message returned when approving or rejecting a request that is
/// no longer pending or has expired.
pub const REQUEST_NO_LONGER_VALID: &str = "Request is no longer valid.";

/// Error message returned when cancelling a request that is not pending.
pub const ONLY_PENDING_CANCELLABLE: &str = "Only pending requests can be cancelled.";

/// Error message returned when a request carries no permission changes.
pub const EMPTY_CHANGE_REQUEST: &str = "At least one permission must be added or removed.";

/// Unique identifier for a permission change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeRequestId(Uuid);

impl ChangeRequestId {
    /// Creates a new random request identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a request identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ChangeRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChangeRequestId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle status of a permission change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestStatus {
    /// Awaiting a decision.
    Pending,
    /// Applied to the target user's overrides.
    Approved,
    /// Denied by an approver or withdrawn by the requester.
    Rejected,
    /// Passed its expiry while pending.
    Expired,
}

impl ChangeRequestStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    /// Returns whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for ChangeRequestStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            _ => Err(AppError::Validation(format!(
                "unknown change request status '{value}'"
            ))),
        }
    }
}

/// Input payload used to open a change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequestInput {
    /// User whose overrides will change.
    pub user_id: UserId,
    /// User opening the request.
    pub requested_by: UserId,
    /// Permissions to grant as allow overrides.
    pub permissions_to_add: BTreeSet<PermissionId>,
    /// Permissions to withdraw with deny overrides.
    pub permissions_to_remove: BTreeSet<PermissionId>,
    /// Justification.
    pub reason: String,
    /// Optional deadline for a decision.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Persisted state of a change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequestRecord {
    /// Request id.
    pub id: ChangeRequestId,
    /// Target user.
    pub user_id: UserId,
    /// Requesting user.
    pub requested_by: UserId,
    /// Permissions to add.
    pub permissions_to_add: BTreeSet<PermissionId>,
    /// Permissions to remove.
    pub permissions_to_remove: BTreeSet<PermissionId>,
    /// Justification.
    pub reason: String,
    /// Stored status.
    pub status: ChangeRequestStatus,
    /// Deciding user for approvals, rejections and cancellations.
    pub approved_by: Option<UserId>,
    /// Decision time.
    pub approved_at: Option<DateTime<Utc>>,
    /// Optional decision deadline.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Whether the rejection came from the requester withdrawing it.
    pub withdrawn: bool,
}

/// Approval-gated batch mutation of one user's override permissions.
///
/// `pending` is the only non-terminal state. Cancellation shares the
/// `rejected` state with denial and is told apart by [`Self::withdrawn`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChangeRequest {
    record: ChangeRequestRecord,
}

impl PermissionChangeRequest {
    /// Opens a validated pending request.
    pub fn new(input: ChangeRequestInput, now: DateTime<Utc>) -> AppResult<Self> {
        let ChangeRequestInput {
            user_id,
            requested_by,
            permissions_to_add,
            permissions_to_remove,
            reason,
            expires_at,
        } = input;

        if permissions_to_add.is_empty() && permissions_to_remove.is_empty() {
            return Err(AppError::Validation(EMPTY_CHANGE_REQUEST.to_owned()));
        }

        if permissions_to_add
            .intersection(&permissions_to_remove)
            .next()
            .is_some()
        {
            return Err(AppError::Validation(
                "a permission cannot be both added and removed in one request".to_owned(),
            ));
        }

        if expires_at.is_some_and(|deadline| deadline <= now) {
            return Err(AppError::Validation(
                "change request expiry must be in the future".to_owned(),
            ));
        }

        Ok(Self {
            record: ChangeRequestRecord {
                id: ChangeRequestId::new(),
                user_id,
                requested_by,
                permissions_to_add,
                permissions_to_remove,
                reason: reason.trim().to_owned(),
                status: ChangeRequestStatus::Pending,
                approved_by: None,
                approved_at: None,
                expires_at,
                created_at: now,
                withdrawn: false,
            },
        })
    }

    /// Rebuilds a request from persisted state.
    #[must_use]
    pub fn restore(record: ChangeRequestRecord) -> Self {
        Self { record }
    }

    /// Returns the request id.
    #[must_use]
    pub fn id(&self) -> ChangeRequestId {
        self.record.id
    }

    /// Returns the target user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.record.user_id
    }

    /// Returns the requesting user.
    #[must_use]
    pub fn requested_by(&self) -> UserId {
        self.record.requested_by
    }

    /// Returns permissions to add.
    #[must_use]
    pub fn permissions_to_add(&self) -> &BTreeSet<PermissionId> {
        &self.record.permissions_to_add
    }

    /// Returns permissions to remove.
    #[must_use]
    pub fn permissions_to_remove(&self) -> &BTreeSet<PermissionId> {
        &self.record.permissions_to_remove
    }

    /// Returns the justification.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.record.reason.as_str()
    }

    /// Returns the stored status.
    #[must_use]
    pub fn status(&self) -> ChangeRequestStatus {
        self.record.status
    }

    /// Returns the deciding user.
    #[must_use]
    pub fn approved_by(&self) -> Option<UserId> {
        self.record.approved_by
    }

    /// Returns the decision time.
    #[must_use]
    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.record.approved_at
    }

    /// Returns the decision deadline.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.record.expires_at
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at
    }

    /// Returns whether the requester withdrew the request.
    #[must_use]
    pub fn withdrawn(&self) -> bool {
        self.record.withdrawn
    }

    /// Returns whether the decision deadline has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.record
            .expires_at
            .is_some_and(|deadline| deadline <= now)
    }

    /// Returns the status as observed at `now`, reporting overdue pending
    /// requests as expired without mutating them.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> ChangeRequestStatus {
        if self.record.status == ChangeRequestStatus::Pending && self.is_expired_at(now) {
            return ChangeRequestStatus::Expired;
        }

        self.record.status
    }

    /// Returns whether approval or rejection is still possible at `now`.
    #[must_use]
    pub fn is_decidable_at(&self, now: DateTime<Utc>) -> bool {
        !self.effective_status(now).is_terminal()
    }

    /// Marks the request approved by `approver`.
    pub fn approve(&mut self, approver: &User, now: DateTime<Utc>) -> AppResult<()> {
        self.decide(approver, now, ChangeRequestStatus::Approved)
    }

    /// Marks the request rejected by `approver`.
    pub fn reject(&mut self, approver: &User, now: DateTime<Utc>) -> AppResult<()> {
        self.decide(approver, now, ChangeRequestStatus::Rejected)
    }

    /// Withdraws the request on behalf of `requester`.
    pub fn cancel(&mut self, requester: &User, now: DateTime<Utc>) -> AppResult<()> {
        if requester.id() != self.record.requested_by && !requester.is_super_admin() {
            return Err(AppError::Forbidden(format!(
                "user '{}' may not cancel change request '{}'",
                requester.id(),
                self.record.id
            )));
        }

        if !self.is_decidable_at(now) {
            return Err(AppError::InvalidState(ONLY_PENDING_CANCELLABLE.to_owned()));
        }

        self.record.status = ChangeRequestStatus::Rejected;
        self.record.approved_by = Some(requester.id());
        self.record.approved_at = Some(now);
        self.record.withdrawn = true;
        Ok(())
    }

    /// Moves an overdue pending request to `expired`. Returns whether the
    /// status changed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if self.record.status.is_terminal() || !self.is_expired_at(now) {
            return false;
        }

        self.record.status = ChangeRequestStatus::Expired;
        true
    }

    fn decide(
        &mut self,
        approver: &User,
        now: DateTime<Utc>,
        status: ChangeRequestStatus,
    ) -> AppResult<()> {
        if !self.is_decidable_at(now) {
            return Err(AppError::InvalidState(REQUEST_NO_LONGER_VALID.to_owned()));
        }

        self.record.status = status;
        self.record.approved_by = Some(approver.id());
        self.record.approved_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{DateTime, Duration, Utc};
    use wardkeep_core::AppError;

    use crate::{PermissionId, User, UserId};

    use super::{
        ChangeRequestInput, ChangeRequestStatus, EMPTY_CHANGE_REQUEST, ONLY_PENDING_CANCELLABLE,
        PermissionChangeRequest, REQUEST_NO_LONGER_VALID,
    };

    fn user(super_admin: bool) -> User {
        match User::new(UserId::new(), "admin", None, None, super_admin) {
            Ok(value) => value,
            Err(error) => panic!("invalid user: {error}"),
        }
    }

    fn request(
        requested_by: UserId,
        now: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> PermissionChangeRequest {
        let built = PermissionChangeRequest::new(
            ChangeRequestInput {
                user_id: UserId::new(),
                requested_by,
                permissions_to_add: BTreeSet::from([PermissionId::new()]),
                permissions_to_remove: BTreeSet::new(),
                reason: "covering pharmacy".to_owned(),
                expires_at,
            },
            now,
        );

        match built {
            Ok(value) => value,
            Err(error) => panic!("invalid request: {error}"),
        }
    }

    fn state_message(error: AppError) -> String {
        match error {
            AppError::InvalidState(message) => message,
            other => panic!("expected state error, got {other}"),
        }
    }

    #[test]
    fn empty_request_is_rejected() {
        let result = PermissionChangeRequest::new(
            ChangeRequestInput {
                user_id: UserId::new(),
                requested_by: UserId::new(),
                permissions_to_add: BTreeSet::new(),
                permissions_to_remove: BTreeSet::new(),
                reason: String::new(),
                expires_at: None,
            },
            Utc::now(),
        );

        let Err(AppError::Validation(message)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(message, EMPTY_CHANGE_REQUEST);
    }

    #[test]
    fn overlapping_add_and_remove_is_rejected() {
        let permission = PermissionId::new();
        let result = PermissionChangeRequest::new(
            ChangeRequestInput {
                user_id: UserId::new(),
                requested_by: UserId::new(),
                permissions_to_add: BTreeSet::from([permission]),
                permissions_to_remove: BTreeSet::from([permission]),
                reason: String::new(),
                expires_at: None,
            },
            Utc::now(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn approve_only_once() {
        let now = Utc::now();
        let approver = user(false);
        let mut request = request(UserId::new(), now, None);

        assert!(request.approve(&approver, now).is_ok());
        assert_eq!(request.status(), ChangeRequestStatus::Approved);
        assert_eq!(request.approved_by(), Some(approver.id()));

        let Err(error) = request.approve(&approver, now) else {
            panic!("second approval must fail");
        };
        assert_eq!(state_message(error), REQUEST_NO_LONGER_VALID);
    }

    #[test]
    fn expired_request_cannot_be_decided() {
        let now = Utc::now();
        let approver = user(false);
        let mut request = request(UserId::new(), now, Some(now + Duration::hours(1)));
        let later = now + Duration::hours(2);

        assert_eq!(request.effective_status(later), ChangeRequestStatus::Expired);
        assert_eq!(request.status(), ChangeRequestStatus::Pending);

        let Err(error) = request.reject(&approver, later) else {
            panic!("expired request must not be rejected");
        };
        assert_eq!(state_message(error), REQUEST_NO_LONGER_VALID);
    }

    #[test]
    fn cancel_requires_requester_or_super_admin() {
        let now = Utc::now();
        let requester = user(false);
        let stranger = user(false);
        let mut request = request(requester.id(), now, None);

        assert!(matches!(
            request.cancel(&stranger, now),
            Err(AppError::Forbidden(_))
        ));

        assert!(request.cancel(&requester, now).is_ok());
        assert_eq!(request.status(), ChangeRequestStatus::Rejected);
        assert!(request.withdrawn());

        let Err(error) = request.cancel(&requester, now) else {
            panic!("second cancel must fail");
        };
        assert_eq!(state_message(error), ONLY_PENDING_CANCELLABLE);
    }

    #[test]
    fn super_admin_may_cancel_any_request() {
        let now = Utc::now();
        let mut request = request(UserId::new(), now, None);
        assert!(request.cancel(&user(true), now).is_ok());
    }

    #[test]
    fn expire_marks_only_overdue_pending_requests() {
        let now = Utc::now();
        let mut overdue = request(UserId::new(), now, Some(now + Duration::minutes(10)));
        let mut open = request(UserId::new(), now, None);
        let later = now + Duration::hours(1);

        assert!(overdue.expire(later));
        assert!(!overdue.expire(later));
        assert_eq!(overdue.status(), ChangeRequestStatus::Expired);
        assert!(!open.expire(later));
    }

    #[test]
    fn decided_requests_never_expire() {
        let now = Utc::now();
        let approver = user(false);
        let mut approved = request(UserId::new(), now, Some(now + Duration::minutes(10)));
        assert!(approved.approve(&approver, now).is_ok());

        assert!(approved.status().is_terminal());
        assert!(!approved.expire(now + Duration::hours(1)));
        assert_eq!(approved.status(), ChangeRequestStatus::Approved);
    }
}
