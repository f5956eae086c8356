use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::{ChangeRequestId, ChangeRequestStatus, PermissionChangeRequest, UserId};

/// Filter for change request listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeRequestQuery {
    /// Stored status to match.
    pub status: Option<ChangeRequestStatus>,
    /// Target user to match.
    pub user_id: Option<UserId>,
    /// Maximum number of rows, newest first.
    pub limit: Option<usize>,
}

/// Repository port for permission change requests.
///
/// Every write is a compare-and-set on a `pending` stored status; a writer
/// that loses the race receives [`wardkeep_core::AppError::InvalidState`].
#[async_trait]
pub trait ChangeRequestRepository: Send + Sync {
    /// Persists a new pending request.
    async fn insert_request(&self, request: PermissionChangeRequest) -> AppResult<()>;

    /// Finds one request by id.
    async fn find_request(&self, id: ChangeRequestId)
    -> AppResult<Option<PermissionChangeRequest>>;

    /// Lists requests newest first.
    async fn list_requests(
        &self,
        query: ChangeRequestQuery,
    ) -> AppResult<Vec<PermissionChangeRequest>>;

    /// Stores a rejection, cancellation, or expiry decided on `request`.
    async fn save_decision(&self, request: &PermissionChangeRequest) -> AppResult<()>;

    /// Stores an approval and writes its overrides in one transaction.
    ///
    /// Additions become allow overrides and removals become deny overrides.
    async fn apply_approval(&self, request: &PermissionChangeRequest) -> AppResult<()>;
}
