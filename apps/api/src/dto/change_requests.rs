use serde::{Deserialize, Serialize};
use ts_rs::TS;
use wardkeep_domain::{ChangeRequestStatus, PermissionCatalog, PermissionChangeRequest};

/// Incoming payload for opening a change request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-change-request-request.ts"
)]
pub struct CreateChangeRequestRequest {
    pub user_id: String,
    #[serde(default)]
    pub permissions_to_add: Vec<String>,
    #[serde(default)]
    pub permissions_to_remove: Vec<String>,
    #[serde(default)]
    pub reason: String,
    /// Optional RFC 3339 deadline.
    pub expires_at: Option<String>,
}

/// API representation of a permission change request.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/change-request-response.ts"
)]
pub struct ChangeRequestResponse {
    pub request_id: String,
    pub user_id: String,
    pub requested_by: String,
    pub permissions_to_add: Vec<String>,
    pub permissions_to_remove: Vec<String>,
    pub reason: String,
    /// Status as observed now; overdue pending requests read as `expired`.
    pub status: String,
    pub withdrawn: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: String,
}

impl ChangeRequestResponse {
    pub fn from_request(
        catalog: &PermissionCatalog,
        value: &PermissionChangeRequest,
        status: ChangeRequestStatus,
    ) -> Self {
        Self {
            request_id: value.id().to_string(),
            user_id: value.user_id().to_string(),
            requested_by: value.requested_by().to_string(),
            permissions_to_add: catalog
                .names_for(value.permissions_to_add())
                .into_iter()
                .collect(),
            permissions_to_remove: catalog
                .names_for(value.permissions_to_remove())
                .into_iter()
                .collect(),
            reason: value.reason().to_owned(),
            status: status.as_str().to_owned(),
            withdrawn: value.withdrawn(),
            approved_by: value.approved_by().map(|actor| actor.to_string()),
            approved_at: value.approved_at().map(|instant| instant.to_rfc3339()),
            expires_at: value.expires_at().map(|instant| instant.to_rfc3339()),
            created_at: value.created_at().to_rfc3339(),
        }
    }
}

/// Result of an expiry sweep.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/expired-change-requests-response.ts"
)]
pub struct ExpiredChangeRequestsResponse {
    pub expired: usize,
}
