//! Domain entities and invariants for hospital permission resolution.

#![forbid(unsafe_code)]

mod audit;
mod catalog;
mod change_request;
mod dependency;
mod permission;
mod role;
mod seed;
mod temporary_permission;
mod user;
mod user_override;

pub use audit::AuditAction;
pub use catalog::PermissionCatalog;
pub use change_request::{
    ChangeRequestId, ChangeRequestInput, ChangeRequestRecord, ChangeRequestStatus,
    EMPTY_CHANGE_REQUEST, ONLY_PENDING_CANCELLABLE, PermissionChangeRequest,
    REQUEST_NO_LONGER_VALID,
};
pub use dependency::{DependencyViolation, validate_dependencies};
pub use permission::{PermissionDefinition, PermissionDefinitionInput, PermissionId, RiskLevel};
pub use role::{MAX_ROLE_DEPTH, Role, RoleHierarchy, RoleId, RoleInput};
pub use seed::{APPROVE_PERMISSION_REQUESTS, MANAGE_PERMISSIONS, default_hospital_catalog};
pub use temporary_permission::{
    TemporaryPermission, TemporaryPermissionId, TemporaryPermissionInput,
};
pub use user::{SUPER_ADMIN_ROLE_NAME, User, UserId};
pub use user_override::UserPermissionOverride;
