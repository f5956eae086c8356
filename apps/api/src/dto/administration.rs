use serde::{Deserialize, Serialize};
use ts_rs::TS;
use wardkeep_domain::{PermissionCatalog, Role, TemporaryPermission, User, UserPermissionOverride};

/// Incoming payload for temporary permission grants.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/grant-temporary-permission-request.ts"
)]
pub struct GrantTemporaryPermissionRequest {
    pub user_id: String,
    pub permission: String,
    /// RFC 3339 timestamp.
    pub expires_at: String,
    pub reason: String,
}

/// API representation of a temporary permission grant.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/temporary-permission-response.ts"
)]
pub struct TemporaryPermissionResponse {
    pub grant_id: String,
    pub user_id: String,
    pub permission: String,
    pub granted_by: String,
    pub granted_at: String,
    pub expires_at: String,
    pub reason: String,
    pub is_active: bool,
    pub revoked_by: Option<String>,
    pub revoked_at: Option<String>,
}

impl TemporaryPermissionResponse {
    pub fn from_grant(catalog: &PermissionCatalog, value: &TemporaryPermission) -> Self {
        Self {
            grant_id: value.id().to_string(),
            user_id: value.user_id().to_string(),
            permission: catalog.display_name(value.permission_id()),
            granted_by: value.granted_by().to_string(),
            granted_at: value.granted_at().to_rfc3339(),
            expires_at: value.expires_at().to_rfc3339(),
            reason: value.reason().to_owned(),
            is_active: value.is_active(),
            revoked_by: value.revoked_by().map(|actor| actor.to_string()),
            revoked_at: value.revoked_at().map(|instant| instant.to_rfc3339()),
        }
    }
}

/// Incoming payload for user overrides.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/set-override-request.ts"
)]
pub struct SetOverrideRequest {
    pub allowed: bool,
}

/// API representation of a user override.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/override-response.ts"
)]
pub struct OverrideResponse {
    pub user_id: String,
    pub permission: String,
    pub allowed: bool,
}

impl OverrideResponse {
    pub fn from_override(catalog: &PermissionCatalog, value: UserPermissionOverride) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            permission: catalog.display_name(value.permission_id),
            allowed: value.allowed,
        }
    }
}

/// Incoming payload for staff account registration.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/register-user-request.ts"
)]
pub struct RegisterUserRequest {
    pub username: String,
    pub role: Option<String>,
    pub role_id: Option<String>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assign-role-request.ts"
)]
pub struct AssignRoleRequest {
    pub role: Option<String>,
    pub role_id: Option<String>,
}

/// API representation of a staff account.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-response.ts"
)]
pub struct UserResponse {
    pub user_id: String,
    pub username: String,
    pub role: Option<String>,
    pub role_id: Option<String>,
    pub is_super_admin: bool,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        Self {
            user_id: value.id().to_string(),
            username: value.username().to_owned(),
            role: value.role().map(str::to_owned),
            role_id: value.role_id().map(|role_id| role_id.to_string()),
            is_super_admin: value.is_super_admin(),
        }
    }
}

/// Incoming payload for role creation and replacement.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/save-role-request.ts"
)]
pub struct SaveRoleRequest {
    pub role_id: Option<String>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub priority: i32,
    pub parent_role_id: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Incoming payload for replacing a role's permission mapping.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/set-role-permissions-request.ts"
)]
pub struct SetRolePermissionsRequest {
    pub permissions: Vec<String>,
}

/// API representation of a normalized role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub slug: String,
    pub priority: i32,
    pub parent_role_id: Option<String>,
    pub permissions: Vec<String>,
}

impl RoleResponse {
    pub fn from_role(catalog: &PermissionCatalog, value: &Role) -> Self {
        Self {
            role_id: value.id().to_string(),
            name: value.name().to_owned(),
            slug: value.slug().to_owned(),
            priority: value.priority(),
            parent_role_id: value.parent_role_id().map(|parent| parent.to_string()),
            permissions: catalog.names_for(value.permissions()).into_iter().collect(),
        }
    }
}
