use serde::{Deserialize, Serialize};
use ts_rs::TS;
use wardkeep_domain::{PermissionCatalog, PermissionDefinition};

/// Incoming payload for multi-permission checks.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/check-permissions-request.ts"
)]
pub struct CheckPermissionsRequest {
    pub permissions: Vec<String>,
}

/// Result of a single permission check for the acting user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-check-response.ts"
)]
pub struct PermissionCheckResponse {
    pub permission: String,
    pub granted: bool,
}

/// Result of an any/all permission check for the acting user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-set-check-response.ts"
)]
pub struct PermissionSetCheckResponse {
    pub permissions: Vec<String>,
    pub granted: bool,
}

/// Effective permission names of a user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/effective-permissions-response.ts"
)]
pub struct EffectivePermissionsResponse {
    pub user_id: String,
    pub permissions: Vec<String>,
}

/// API representation of a catalog permission.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub name: String,
    pub description: String,
    pub resource: String,
    pub action: String,
    pub category: String,
    pub module: String,
    pub risk_level: String,
    pub requires_approval: bool,
    pub is_critical: bool,
    pub dependencies: Vec<String>,
}

impl PermissionResponse {
    pub fn from_definition(catalog: &PermissionCatalog, value: &PermissionDefinition) -> Self {
        Self {
            permission_id: value.id().to_string(),
            name: value.name().to_owned(),
            description: value.description().to_owned(),
            resource: value.resource().to_owned(),
            action: value.action().to_owned(),
            category: value.category().to_owned(),
            module: value.module().to_owned(),
            risk_level: value.risk_level().as_str().to_owned(),
            requires_approval: value.requires_approval(),
            is_critical: value.is_critical(),
            dependencies: catalog.names_for(value.dependencies()).into_iter().collect(),
        }
    }
}
