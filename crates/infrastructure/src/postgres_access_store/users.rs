use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;
use wardkeep_application::UserRepository;
use wardkeep_core::AppResult;
use wardkeep_domain::{RoleId, User, UserId};

use super::{PostgresAccessStore, database_error};

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    role: Option<String>,
    role_id: Option<Uuid>,
    is_super_admin: bool,
}

#[async_trait]
impl UserRepository for PostgresAccessStore {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, role, role_id, is_super_admin
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| database_error(format!("failed to load user '{user_id}'"), error))?;

        row.map(|row| {
            User::new(
                UserId::from_uuid(row.id),
                row.username,
                row.role,
                row.role_id.map(RoleId::from_uuid),
                row.is_super_admin,
            )
        })
        .transpose()
    }

    async fn save_user(&self, user: User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, role, role_id, is_super_admin)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username,
                role = EXCLUDED.role,
                role_id = EXCLUDED.role_id,
                is_super_admin = EXCLUDED.is_super_admin
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.username())
        .bind(user.role())
        .bind(user.role_id().map(|value| value.as_uuid()))
        .bind(user.is_super_admin())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            database_error(format!("failed to save user '{}'", user.username()), error)
        })?;

        Ok(())
    }
}
