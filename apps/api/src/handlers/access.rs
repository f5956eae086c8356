use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;
use wardkeep_domain::{MANAGE_PERMISSIONS, User, UserId};

use crate::dto::{
    CheckPermissionsRequest, EffectivePermissionsResponse, PermissionCheckResponse,
    PermissionResponse, PermissionSetCheckResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{find_user, require_self_or_permission};

#[derive(Debug, Deserialize)]
pub struct CheckPermissionQuery {
    pub permission: String,
}

pub async fn check_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Query(query): Query<CheckPermissionQuery>,
) -> Json<PermissionCheckResponse> {
    let granted = state
        .authorization_service
        .has_permission(&actor, query.permission.as_str())
        .await;

    Json(PermissionCheckResponse {
        permission: query.permission,
        granted,
    })
}

pub async fn check_any_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Json(payload): Json<CheckPermissionsRequest>,
) -> Json<PermissionSetCheckResponse> {
    let granted = state
        .authorization_service
        .has_any_permission(&actor, &payload.permissions)
        .await;

    Json(PermissionSetCheckResponse {
        permissions: payload.permissions,
        granted,
    })
}

pub async fn check_all_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Json(payload): Json<CheckPermissionsRequest>,
) -> Json<PermissionSetCheckResponse> {
    let granted = state
        .authorization_service
        .has_all_permissions(&actor, &payload.permissions)
        .await;

    Json(PermissionSetCheckResponse {
        permissions: payload.permissions,
        granted,
    })
}

pub async fn effective_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let user_id = UserId::from_uuid(user_id);
    require_self_or_permission(&state, &actor, user_id, MANAGE_PERMISSIONS).await?;

    let user = find_user(&state, user_id).await?;
    let permissions = state
        .authorization_service
        .effective_permissions(&user)
        .await
        .into_iter()
        .collect();

    Ok(Json(EffectivePermissionsResponse {
        user_id: user_id.to_string(),
        permissions,
    }))
}

pub async fn list_catalog_handler(
    State(state): State<AppState>,
    Extension(_actor): Extension<User>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let catalog = state.permission_admin_service.list_catalog().await?;
    let mut permissions: Vec<PermissionResponse> = catalog
        .iter()
        .map(|definition| PermissionResponse::from_definition(&catalog, definition))
        .collect();
    permissions.sort_by(|left, right| left.name.cmp(&right.name));

    Ok(Json(permissions))
}
