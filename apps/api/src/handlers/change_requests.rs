use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;
use wardkeep_application::{ChangeRequestQuery, CreateChangeRequestInput};
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{
    APPROVE_PERMISSION_REQUESTS, ChangeRequestId, ChangeRequestStatus, MANAGE_PERMISSIONS,
    PermissionChangeRequest, User,
};

use crate::dto::{
    ChangeRequestResponse, CreateChangeRequestRequest, ExpiredChangeRequestsResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::administration::permission_ids;
use super::{find_user, parse_timestamp, parse_user_id, require_permission};

const REVIEWER_PERMISSIONS: [&str; 2] = [MANAGE_PERMISSIONS, APPROVE_PERMISSION_REQUESTS];

#[derive(Debug, Default, Deserialize)]
pub struct ListChangeRequestsQuery {
    pub status: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

pub async fn create_change_request_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Json(payload): Json<CreateChangeRequestRequest>,
) -> ApiResult<(StatusCode, Json<ChangeRequestResponse>)> {
    require_permission(&state, &actor, MANAGE_PERMISSIONS).await?;

    let target = find_user(&state, parse_user_id(payload.user_id.as_str())?).await?;
    let catalog = state.permission_admin_service.list_catalog().await?;
    let expires_at = payload
        .expires_at
        .as_deref()
        .map(|value| parse_timestamp("expires_at", value))
        .transpose()?;

    let request = state
        .change_request_service
        .create(
            &target,
            CreateChangeRequestInput {
                permissions_to_add: permission_ids(&catalog, &payload.permissions_to_add)?,
                permissions_to_remove: permission_ids(&catalog, &payload.permissions_to_remove)?,
                reason: payload.reason,
                expires_at,
            },
            &actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(respond(&state, &request).await?)))
}

pub async fn list_change_requests_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Query(query): Query<ListChangeRequestsQuery>,
) -> ApiResult<Json<Vec<ChangeRequestResponse>>> {
    require_reviewer(&state, &actor).await?;

    let status = query
        .status
        .as_deref()
        .map(str::parse::<ChangeRequestStatus>)
        .transpose()?;
    let user_id = query.user_id.as_deref().map(parse_user_id).transpose()?;

    let requests = state
        .change_request_service
        .list(ChangeRequestQuery {
            status,
            user_id,
            limit: query.limit,
        })
        .await?;
    let catalog = state.permission_admin_service.list_catalog().await?;

    Ok(Json(
        requests
            .iter()
            .map(|request| {
                ChangeRequestResponse::from_request(
                    &catalog,
                    request,
                    state.change_request_service.effective_status(request),
                )
            })
            .collect(),
    ))
}

pub async fn get_change_request_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<ChangeRequestResponse>> {
    let id = ChangeRequestId::from_uuid(request_id);
    let request = state
        .change_request_service
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("change request '{id}' does not exist")))?;

    if request.requested_by() != actor.id() {
        require_reviewer(&state, &actor).await?;
    }

    Ok(Json(respond(&state, &request).await?))
}

pub async fn approve_change_request_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<ChangeRequestResponse>> {
    require_permission(&state, &actor, APPROVE_PERMISSION_REQUESTS).await?;

    let request = state
        .change_request_service
        .approve(ChangeRequestId::from_uuid(request_id), &actor)
        .await?;

    Ok(Json(respond(&state, &request).await?))
}

pub async fn reject_change_request_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<ChangeRequestResponse>> {
    require_permission(&state, &actor, APPROVE_PERMISSION_REQUESTS).await?;

    let request = state
        .change_request_service
        .reject(ChangeRequestId::from_uuid(request_id), &actor)
        .await?;

    Ok(Json(respond(&state, &request).await?))
}

/// Requester withdrawal; ownership is enforced by the domain.
pub async fn cancel_change_request_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<ChangeRequestResponse>> {
    let request = state
        .change_request_service
        .cancel(ChangeRequestId::from_uuid(request_id), &actor)
        .await?;

    Ok(Json(respond(&state, &request).await?))
}

pub async fn expire_change_requests_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
) -> ApiResult<Json<ExpiredChangeRequestsResponse>> {
    require_permission(&state, &actor, APPROVE_PERMISSION_REQUESTS).await?;

    let expired = state.change_request_service.expire_overdue().await?;
    Ok(Json(ExpiredChangeRequestsResponse { expired }))
}

async fn require_reviewer(state: &AppState, actor: &User) -> AppResult<()> {
    if state
        .authorization_service
        .has_any_permission(actor, &REVIEWER_PERMISSIONS)
        .await
    {
        return Ok(());
    }

    Err(AppError::Forbidden(format!(
        "user '{}' may not review permission change requests",
        actor.id()
    )))
}

async fn respond(
    state: &AppState,
    request: &PermissionChangeRequest,
) -> AppResult<ChangeRequestResponse> {
    let catalog = state.permission_admin_service.list_catalog().await?;
    Ok(ChangeRequestResponse::from_request(
        &catalog,
        request,
        state.change_request_service.effective_status(request),
    ))
}
