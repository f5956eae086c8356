//! Application services and ports for permission resolution.

#![forbid(unsafe_code)]

mod access_ports;
mod audit_trail;
pub mod authority_providers;
mod authorization_service;
mod change_request_service;
mod permission_admin_service;

#[cfg(test)]
mod test_support;

pub use access_ports::{
    AccessRepositories, AuditEvent, AuditRepository, ChangeRequestQuery, ChangeRequestRepository,
    Clock, LegacyRolePermissionRepository, PermissionCache, PermissionCatalogRepository,
    RoleRepository, SystemClock, TemporaryPermissionRepository, UserOverrideRepository,
    UserRepository,
};
pub use authorization_service::{AuthorizationService, PermissionResolution};
pub use change_request_service::{ChangeRequestService, CreateChangeRequestInput};
pub use permission_admin_service::{
    GrantTemporaryPermissionInput, PermissionAdminService, RegisterUserInput,
};
