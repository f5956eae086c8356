use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use wardkeep_core::AppError;
use wardkeep_domain::UserId;

use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying the acting user's id.
pub const ACTOR_HEADER: &str = "x-user-id";

/// Resolves the acting user and stores it as a request extension.
pub async fn require_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let raw = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let user_id = uuid::Uuid::parse_str(raw)
        .map(UserId::from_uuid)
        .map_err(|_| AppError::Unauthorized(format!("'{raw}' is not a valid user id")))?;

    let actor = state
        .user_repository
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("user '{user_id}' is not known")))?;

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}
