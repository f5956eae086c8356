use std::collections::BTreeSet;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;
use wardkeep_application::{GrantTemporaryPermissionInput, RegisterUserInput};
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{
    MANAGE_PERMISSIONS, PermissionCatalog, PermissionId, RoleId, RoleInput,
    TemporaryPermissionId, User, UserId,
};

use crate::dto::{
    AssignRoleRequest, GrantTemporaryPermissionRequest, OverrideResponse, RegisterUserRequest,
    RoleResponse, SaveRoleRequest, SetOverrideRequest, SetRolePermissionsRequest,
    TemporaryPermissionResponse, UserResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{
    parse_role_id, parse_timestamp, parse_user_id, require_permission,
    require_self_or_permission,
};

#[derive(Debug, Deserialize)]
pub struct TemporaryPermissionsQuery {
    #[serde(default)]
    pub active_only: bool,
}

pub async fn grant_temporary_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Json(payload): Json<GrantTemporaryPermissionRequest>,
) -> ApiResult<(StatusCode, Json<TemporaryPermissionResponse>)> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    let grant = state
        .permission_admin_service
        .grant_temporary_permission(
            &actor,
            GrantTemporaryPermissionInput {
                user_id: parse_user_id(payload.user_id.as_str())?,
                permission: payload.permission,
                expires_at: parse_timestamp("expires_at", payload.expires_at.as_str())?,
                reason: payload.reason,
            },
        )
        .await?;
    let catalog = state.permission_admin_service.list_catalog().await?;

    Ok((
        StatusCode::CREATED,
        Json(TemporaryPermissionResponse::from_grant(&catalog, &grant)),
    ))
}

pub async fn revoke_temporary_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(grant_id): Path<Uuid>,
) -> ApiResult<Json<TemporaryPermissionResponse>> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    let grant = state
        .permission_admin_service
        .revoke_temporary_permission(&actor, TemporaryPermissionId::from_uuid(grant_id))
        .await?;
    let catalog = state.permission_admin_service.list_catalog().await?;

    Ok(Json(TemporaryPermissionResponse::from_grant(&catalog, &grant)))
}

pub async fn list_temporary_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<TemporaryPermissionsQuery>,
) -> ApiResult<Json<Vec<TemporaryPermissionResponse>>> {
    let user_id = UserId::from_uuid(user_id);
    require_self_or_permission(&state, &actor, user_id, MANAGE_PERMISSIONS).await?;

    let grants = state
        .permission_admin_service
        .list_temporary_permissions(user_id, query.active_only)
        .await?;
    let catalog = state.permission_admin_service.list_catalog().await?;

    Ok(Json(
        grants
            .iter()
            .map(|grant| TemporaryPermissionResponse::from_grant(&catalog, grant))
            .collect(),
    ))
}

pub async fn set_override_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path((user_id, permission)): Path<(Uuid, String)>,
    Json(payload): Json<SetOverrideRequest>,
) -> ApiResult<Json<OverrideResponse>> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    let value = state
        .permission_admin_service
        .set_user_override(
            &actor,
            UserId::from_uuid(user_id),
            permission.as_str(),
            payload.allowed,
        )
        .await?;
    let catalog = state.permission_admin_service.list_catalog().await?;

    Ok(Json(OverrideResponse::from_override(&catalog, value)))
}

pub async fn remove_override_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path((user_id, permission)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    state
        .permission_admin_service
        .remove_user_override(&actor, UserId::from_uuid(user_id), permission.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn register_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Json(payload): Json<RegisterUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    let user = state
        .permission_admin_service
        .register_user(
            &actor,
            RegisterUserInput {
                username: payload.username,
                role: payload.role,
                role_id: parse_role_id("role_id", payload.role_id.as_deref())?,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<Json<UserResponse>> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    let user = state
        .permission_admin_service
        .assign_role(
            &actor,
            UserId::from_uuid(user_id),
            payload.role,
            parse_role_id("role_id", payload.role_id.as_deref())?,
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn save_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Json(payload): Json<SaveRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    let catalog = state.permission_admin_service.list_catalog().await?;
    let role = state
        .permission_admin_service
        .save_role(
            &actor,
            RoleInput {
                id: parse_role_id("role_id", payload.role_id.as_deref())?,
                name: payload.name,
                slug: payload.slug,
                priority: payload.priority,
                parent_role_id: parse_role_id(
                    "parent_role_id",
                    payload.parent_role_id.as_deref(),
                )?,
                permissions: permission_ids(&catalog, &payload.permissions)?,
            },
        )
        .await?;

    Ok(Json(RoleResponse::from_role(&catalog, &role)))
}

pub async fn set_role_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<SetRolePermissionsRequest>,
) -> ApiResult<Json<RoleResponse>> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    let role = state
        .permission_admin_service
        .set_role_permissions(&actor, RoleId::from_uuid(role_id), &payload.permissions)
        .await?;
    let catalog = state.permission_admin_service.list_catalog().await?;

    Ok(Json(RoleResponse::from_role(&catalog, &role)))
}

pub async fn grant_legacy_role_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path((role, permission)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    state
        .permission_admin_service
        .grant_legacy_role_permission(&actor, role.as_str(), permission.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_legacy_role_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path((role, permission)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    state
        .permission_admin_service
        .revoke_legacy_role_permission(&actor, role.as_str(), permission.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn invalidate_user_cache_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    state
        .permission_admin_service
        .invalidate_user_cache(&actor, UserId::from_uuid(user_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn flush_cache_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
) -> ApiResult<StatusCode> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    state
        .permission_admin_service
        .flush_permission_cache(&actor)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Resolves permission names, rejecting unknown ones.
pub(super) fn permission_ids(
    catalog: &PermissionCatalog,
    names: &[String],
) -> AppResult<BTreeSet<PermissionId>> {
    names
        .iter()
        .map(|name| {
            catalog
                .find_by_name(name.trim())
                .map(|definition| definition.id())
                .ok_or_else(|| {
                    AppError::Validation(format!("permission '{name}' does not exist"))
                })
        })
        .collect()
}
