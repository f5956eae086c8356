use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use wardkeep_application::TemporaryPermissionRepository;
use wardkeep_core::{AppError, AppResult, NonEmptyString};
use wardkeep_domain::{PermissionId, TemporaryPermission, TemporaryPermissionId, UserId};

use super::{PostgresAccessStore, database_error};

#[derive(Debug, FromRow)]
struct TemporaryPermissionRow {
    id: Uuid,
    user_id: Uuid,
    permission_id: Uuid,
    granted_by: Uuid,
    granted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    reason: String,
    is_active: bool,
    revoked_by: Option<Uuid>,
    revoked_at: Option<DateTime<Utc>>,
}

impl TryFrom<TemporaryPermissionRow> for TemporaryPermission {
    type Error = AppError;

    fn try_from(row: TemporaryPermissionRow) -> Result<Self, Self::Error> {
        let reason = NonEmptyString::new(row.reason).map_err(|error| {
            AppError::Internal(format!(
                "temporary permission '{}' has an invalid reason: {error}",
                row.id
            ))
        })?;

        Ok(TemporaryPermission::restore(
            TemporaryPermissionId::from_uuid(row.id),
            UserId::from_uuid(row.user_id),
            PermissionId::from_uuid(row.permission_id),
            UserId::from_uuid(row.granted_by),
            row.granted_at,
            row.expires_at,
            reason,
            row.is_active,
            row.revoked_by.map(UserId::from_uuid),
            row.revoked_at,
        ))
    }
}

const GRANT_COLUMNS: &str = r#"
    temporary_permissions.id,
    temporary_permissions.user_id,
    temporary_permissions.permission_id,
    temporary_permissions.granted_by,
    temporary_permissions.granted_at,
    temporary_permissions.expires_at,
    temporary_permissions.reason,
    temporary_permissions.is_active,
    temporary_permissions.revoked_by,
    temporary_permissions.revoked_at
"#;

#[async_trait]
impl TemporaryPermissionRepository for PostgresAccessStore {
    async fn find_effective_grant(
        &self,
        user_id: UserId,
        permission: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<TemporaryPermission>> {
        let row = sqlx::query_as::<_, TemporaryPermissionRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM temporary_permissions
            INNER JOIN permissions
                ON permissions.id = temporary_permissions.permission_id
            WHERE temporary_permissions.user_id = $1
              AND permissions.name = $2
              AND temporary_permissions.is_active
              AND temporary_permissions.expires_at > $3
            ORDER BY temporary_permissions.expires_at DESC
            LIMIT 1
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(permission)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to load temporary grant '{permission}' for user '{user_id}'"),
                error,
            )
        })?;

        row.map(TemporaryPermission::try_from).transpose()
    }

    async fn find_grant(
        &self,
        id: TemporaryPermissionId,
    ) -> AppResult<Option<TemporaryPermission>> {
        let row = sqlx::query_as::<_, TemporaryPermissionRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM temporary_permissions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            database_error(format!("failed to load temporary permission '{id}'"), error)
        })?;

        row.map(TemporaryPermission::try_from).transpose()
    }

    async fn list_grants_for_user(&self, user_id: UserId) -> AppResult<Vec<TemporaryPermission>> {
        let rows = sqlx::query_as::<_, TemporaryPermissionRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM temporary_permissions
            WHERE user_id = $1
            ORDER BY granted_at DESC, id
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to list temporary permissions for user '{user_id}'"),
                error,
            )
        })?;

        rows.into_iter().map(TemporaryPermission::try_from).collect()
    }

    async fn insert_grant(&self, grant: TemporaryPermission) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| database_error("failed to start transaction", error))?;

        // Serializes concurrent grants for the same user.
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(grant.user_id().as_uuid())
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| {
                database_error(format!("failed to lock user '{}'", grant.user_id()), error)
            })?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!(
                "user '{}' does not exist",
                grant.user_id()
            )));
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM temporary_permissions
                WHERE user_id = $1
                  AND permission_id = $2
                  AND is_active
                  AND expires_at > $3
            )
            "#,
        )
        .bind(grant.user_id().as_uuid())
        .bind(grant.permission_id().as_uuid())
        .bind(grant.granted_at())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| database_error("failed to check for an active grant", error))?;
        if duplicate {
            return Err(AppError::Validation(format!(
                "user '{}' already holds an active temporary grant for permission '{}'",
                grant.user_id(),
                grant.permission_id()
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO temporary_permissions (
                id,
                user_id,
                permission_id,
                granted_by,
                granted_at,
                expires_at,
                reason,
                is_active,
                revoked_by,
                revoked_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(grant.id().as_uuid())
        .bind(grant.user_id().as_uuid())
        .bind(grant.permission_id().as_uuid())
        .bind(grant.granted_by().as_uuid())
        .bind(grant.granted_at())
        .bind(grant.expires_at())
        .bind(grant.reason())
        .bind(grant.is_active())
        .bind(grant.revoked_by().map(|value| value.as_uuid()))
        .bind(grant.revoked_at())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            let foreign_key_violation = error
                .as_database_error()
                .is_some_and(|database_error| database_error.is_foreign_key_violation());
            if foreign_key_violation {
                return AppError::NotFound(format!(
                    "permission '{}' does not exist",
                    grant.permission_id()
                ));
            }
            database_error("failed to insert temporary permission", error)
        })?;

        transaction
            .commit()
            .await
            .map_err(|error| database_error("failed to commit temporary permission", error))
    }

    async fn save_revocation(&self, grant: &TemporaryPermission) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE temporary_permissions
            SET is_active = $2,
                revoked_by = $3,
                revoked_at = $4
            WHERE id = $1
              AND is_active
            "#,
        )
        .bind(grant.id().as_uuid())
        .bind(grant.is_active())
        .bind(grant.revoked_by().map(|value| value.as_uuid()))
        .bind(grant.revoked_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to revoke temporary permission '{}'", grant.id()),
                error,
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidState(format!(
                "temporary permission '{}' is already revoked",
                grant.id()
            )));
        }

        Ok(())
    }
}
