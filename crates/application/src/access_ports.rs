mod audit;
mod cache;
mod catalog;
mod change_requests;
mod clock;
mod overrides;
mod repositories;
mod roles;
mod temporary;
mod users;

pub use audit::{AuditEvent, AuditRepository};
pub use cache::PermissionCache;
pub use catalog::PermissionCatalogRepository;
pub use change_requests::{ChangeRequestQuery, ChangeRequestRepository};
pub use clock::{Clock, SystemClock};
pub use overrides::UserOverrideRepository;
pub use repositories::AccessRepositories;
pub use roles::{LegacyRolePermissionRepository, RoleRepository};
pub use temporary::TemporaryPermissionRepository;
pub use users::UserRepository;
