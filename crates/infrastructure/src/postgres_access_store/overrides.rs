use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;
use wardkeep_application::UserOverrideRepository;
use wardkeep_core::AppResult;
use wardkeep_domain::{PermissionId, UserId, UserPermissionOverride};

use super::{PostgresAccessStore, database_error};

#[derive(Debug, FromRow)]
struct OverrideRow {
    permission_id: Uuid,
    allowed: bool,
}

#[async_trait]
impl UserOverrideRepository for PostgresAccessStore {
    async fn find_override(
        &self,
        user_id: UserId,
        permission: &str,
    ) -> AppResult<Option<UserPermissionOverride>> {
        let row = sqlx::query_as::<_, OverrideRow>(
            r#"
            SELECT user_permissions.permission_id, user_permissions.allowed
            FROM user_permissions
            INNER JOIN permissions
                ON permissions.id = user_permissions.permission_id
            WHERE user_permissions.user_id = $1
              AND permissions.name = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(permission)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to load override '{permission}' for user '{user_id}'"),
                error,
            )
        })?;

        Ok(row.map(|row| UserPermissionOverride {
            user_id,
            permission_id: PermissionId::from_uuid(row.permission_id),
            allowed: row.allowed,
        }))
    }

    async fn list_overrides(&self, user_id: UserId) -> AppResult<Vec<UserPermissionOverride>> {
        let rows = sqlx::query_as::<_, OverrideRow>(
            r#"
            SELECT permission_id, allowed
            FROM user_permissions
            WHERE user_id = $1
            ORDER BY permission_id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            database_error(format!("failed to list overrides for user '{user_id}'"), error)
        })?;

        Ok(rows
            .into_iter()
            .map(|row| UserPermissionOverride {
                user_id,
                permission_id: PermissionId::from_uuid(row.permission_id),
                allowed: row.allowed,
            })
            .collect())
    }

    async fn upsert_override(&self, value: UserPermissionOverride) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_permissions (user_id, permission_id, allowed)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, permission_id) DO UPDATE
            SET allowed = EXCLUDED.allowed,
                updated_at = now()
            "#,
        )
        .bind(value.user_id.as_uuid())
        .bind(value.permission_id.as_uuid())
        .bind(value.allowed)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to save override for user '{}'", value.user_id),
                error,
            )
        })?;

        Ok(())
    }

    async fn delete_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_permissions
            WHERE user_id = $1
              AND permission_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            database_error(format!("failed to delete override for user '{user_id}'"), error)
        })?;

        Ok(result.rows_affected() > 0)
    }
}
