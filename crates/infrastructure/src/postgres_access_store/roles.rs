use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;
use wardkeep_application::{LegacyRolePermissionRepository, RoleRepository};
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{PermissionId, Role, RoleId, RoleInput};

use super::{PostgresAccessStore, database_error};

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    slug: String,
    priority: i32,
    parent_role_id: Option<Uuid>,
    permission_id: Option<Uuid>,
}

fn roles_from_rows(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut grouped: HashMap<Uuid, (RoleRow, BTreeSet<PermissionId>)> = HashMap::new();

    for row in rows {
        let permission_id = row.permission_id.map(PermissionId::from_uuid);
        let entry = grouped.entry(row.id).or_insert_with(|| {
            order.push(row.id);
            let permissions = BTreeSet::new();
            (row, permissions)
        });
        if let Some(permission_id) = permission_id {
            entry.1.insert(permission_id);
        }
    }

    order
        .into_iter()
        .filter_map(|id| grouped.remove(&id))
        .map(|(row, permissions)| {
            Role::new(RoleInput {
                id: Some(RoleId::from_uuid(row.id)),
                name: row.name,
                slug: row.slug,
                priority: row.priority,
                parent_role_id: row.parent_role_id.map(RoleId::from_uuid),
                permissions,
            })
        })
        .collect()
}

const ROLE_SELECT: &str = r#"
    SELECT
        roles.id,
        roles.name,
        roles.slug,
        roles.priority,
        roles.parent_role_id,
        role_permissions.permission_id
    FROM roles
    LEFT JOIN role_permissions
        ON role_permissions.role_id = roles.id
"#;

#[async_trait]
impl RoleRepository for PostgresAccessStore {
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!("{ROLE_SELECT} WHERE roles.id = $1"))
            .bind(role_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| database_error(format!("failed to load role '{role_id}'"), error))?;

        Ok(roles_from_rows(rows)?.into_iter().next())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT} ORDER BY roles.priority DESC, roles.slug"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to list roles", error))?;

        roles_from_rows(rows)
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| database_error("failed to start transaction", error))?;

        sqlx::query(
            r#"
            INSERT INTO roles (id, name, slug, priority, parent_role_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                slug = EXCLUDED.slug,
                priority = EXCLUDED.priority,
                parent_role_id = EXCLUDED.parent_role_id
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.name())
        .bind(role.slug())
        .bind(role.priority())
        .bind(role.parent_role_id().map(|value| value.as_uuid()))
        .execute(&mut *transaction)
        .await
        .map_err(|error| database_error(format!("failed to save role '{}'", role.slug()), error))?;

        replace_role_permissions(&mut transaction, role.id(), role.permissions()).await?;

        transaction
            .commit()
            .await
            .map_err(|error| database_error("failed to commit role save", error))
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: BTreeSet<PermissionId>,
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| database_error("failed to start transaction", error))?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM roles WHERE id = $1 FOR UPDATE")
            .bind(role_id.as_uuid())
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| database_error(format!("failed to lock role '{role_id}'"), error))?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        replace_role_permissions(&mut transaction, role_id, &permissions).await?;

        transaction
            .commit()
            .await
            .map_err(|error| database_error("failed to commit role permissions", error))
    }

    async fn role_grants_permission(&self, role_id: RoleId, permission: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM role_permissions
                INNER JOIN permissions
                    ON permissions.id = role_permissions.permission_id
                WHERE role_permissions.role_id = $1
                  AND permissions.name = $2
            )
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to check role '{role_id}' for permission '{permission}'"),
                error,
            )
        })
    }
}

async fn replace_role_permissions(
    transaction: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    role_id: RoleId,
    permissions: &BTreeSet<PermissionId>,
) -> AppResult<()> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id.as_uuid())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            database_error(format!("failed to clear permissions of role '{role_id}'"), error)
        })?;

    let permission_ids: Vec<Uuid> = permissions.iter().map(PermissionId::as_uuid).collect();
    sqlx::query(
        r#"
        INSERT INTO role_permissions (role_id, permission_id)
        SELECT $1, permission_id
        FROM unnest($2::uuid[]) AS permission_id
        "#,
    )
    .bind(role_id.as_uuid())
    .bind(permission_ids)
    .execute(&mut **transaction)
    .await
    .map_err(|error| {
        database_error(format!("failed to map permissions of role '{role_id}'"), error)
    })?;

    Ok(())
}

#[async_trait]
impl LegacyRolePermissionRepository for PostgresAccessStore {
    async fn legacy_role_grants_permission(
        &self,
        role_name: &str,
        permission: &str,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM legacy_role_permissions
                INNER JOIN permissions
                    ON permissions.id = legacy_role_permissions.permission_id
                WHERE lower(legacy_role_permissions.role) = lower(btrim($1))
                  AND permissions.name = $2
            )
            "#,
        )
        .bind(role_name)
        .bind(permission)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to check legacy role '{role_name}' for '{permission}'"),
                error,
            )
        })
    }

    async fn list_legacy_role_permissions(
        &self,
        role_name: &str,
    ) -> AppResult<Vec<PermissionId>> {
        let rows = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT permission_id
            FROM legacy_role_permissions
            WHERE lower(role) = lower(btrim($1))
            ORDER BY permission_id
            "#,
        )
        .bind(role_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            database_error(format!("failed to list legacy role '{role_name}'"), error)
        })?;

        Ok(rows.into_iter().map(PermissionId::from_uuid).collect())
    }

    async fn grant_legacy_role_permission(
        &self,
        role_name: &str,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO legacy_role_permissions (role, permission_id)
            VALUES (btrim($1), $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_name)
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            database_error(format!("failed to grant legacy role '{role_name}'"), error)
        })?;

        Ok(())
    }

    async fn revoke_legacy_role_permission(
        &self,
        role_name: &str,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM legacy_role_permissions
            WHERE lower(role) = lower(btrim($1))
              AND permission_id = $2
            "#,
        )
        .bind(role_name)
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            database_error(format!("failed to revoke legacy role '{role_name}'"), error)
        })?;

        Ok(result.rows_affected() > 0)
    }
}
