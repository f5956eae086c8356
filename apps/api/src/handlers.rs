use chrono::{DateTime, Utc};
use uuid::Uuid;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{RoleId, User, UserId};

use crate::state::AppState;

pub mod access;
pub mod administration;
pub mod change_requests;
pub mod health;


async fn find_user(state: &AppState, user_id: UserId) -> AppResult<User> {
    state
        .user_repository
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
}

async fn require_permission(state: &AppState, actor: &User, permission: &str) -> AppResult<()> {
    state
        .authorization_service
        .require_permission(actor, permission)
        .await
}

/// Allows the user themselves, or anyone holding `permission`.
async fn require_self_or_permission(
    state: &AppState,
    actor: &User,
    user_id: UserId,
    permission: &str,
) -> AppResult<()> {
    if actor.id() == user_id {
        return Ok(());
    }

    require_permission(state, actor, permission).await
}

fn parse_uuid(field: &str, value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|error| AppError::Validation(format!("invalid {field} '{value}': {error}")))
}

fn parse_user_id(value: &str) -> AppResult<UserId> {
    parse_uuid("user_id", value).map(UserId::from_uuid)
}

fn parse_role_id(field: &str, value: Option<&str>) -> AppResult<Option<RoleId>> {
    value
        .map(|value| parse_uuid(field, value).map(RoleId::from_uuid))
        .transpose()
}

fn parse_timestamp(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|error| AppError::Validation(format!("invalid {field} '{value}': {error}")))
}
