use tracing::info;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{AuditAction, RoleId, SUPER_ADMIN_ROLE_NAME, User, UserId};

use super::PermissionAdminService;

/// Input payload for registering a staff account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserInput {
    /// Unique login name.
    pub username: String,
    /// Legacy role name.
    pub role: Option<String>,
    /// Normalized role.
    pub role_id: Option<RoleId>,
}

impl PermissionAdminService {
    /// Registers a staff account. The explicit super-admin flag is never set
    /// through this path.
    pub async fn register_user(&self, actor: &User, input: RegisterUserInput) -> AppResult<User> {
        ensure_may_confer_role(actor, input.role.as_deref())?;
        if let Some(role_id) = input.role_id
            && self.repositories.roles.find_role(role_id).await?.is_none()
        {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        let user = User::new(
            UserId::new(),
            input.username.trim(),
            input.role,
            input.role_id,
            false,
        )?;
        self.repositories.users.save_user(user.clone()).await?;

        info!(user_id = %user.id(), username = user.username(), "registered user");
        self.audit(
            actor,
            AuditAction::UserRegistered,
            "user",
            user.id().to_string(),
            Some(format!("username='{}'", user.username())),
        )
        .await;

        Ok(user)
    }
}

/// Only super-admins may hand out the legacy super-admin role.
pub(super) fn ensure_may_confer_role(actor: &User, role: Option<&str>) -> AppResult<()> {
    let confers_super_admin =
        role.is_some_and(|role| role.trim().eq_ignore_ascii_case(SUPER_ADMIN_ROLE_NAME));
    if confers_super_admin && !actor.is_super_admin() {
        return Err(AppError::Forbidden(format!(
            "user '{}' may not assign the '{SUPER_ADMIN_ROLE_NAME}' role",
            actor.id()
        )));
    }

    Ok(())
}
