mod access;
mod administration;
mod change_requests;

use serde::Serialize;
use ts_rs::TS;

pub use access::{
    CheckPermissionsRequest, EffectivePermissionsResponse, PermissionCheckResponse,
    PermissionResponse, PermissionSetCheckResponse,
};
pub use administration::{
    AssignRoleRequest, GrantTemporaryPermissionRequest, OverrideResponse, RegisterUserRequest,
    RoleResponse, SaveRoleRequest, SetOverrideRequest, SetRolePermissionsRequest,
    TemporaryPermissionResponse, UserResponse,
};
pub use change_requests::{
    ChangeRequestResponse, CreateChangeRequestRequest, ExpiredChangeRequestsResponse,
};

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}
