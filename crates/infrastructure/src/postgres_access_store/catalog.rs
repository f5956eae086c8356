use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;
use wardkeep_application::PermissionCatalogRepository;
use wardkeep_core::AppResult;
use wardkeep_domain::{
    PermissionCatalog, PermissionDefinition, PermissionDefinitionInput, PermissionId, RiskLevel,
};

use super::{PostgresAccessStore, database_error};

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    name: String,
    description: String,
    resource: String,
    action: String,
    category: String,
    module: String,
    risk_level: String,
    requires_approval: bool,
    is_critical: bool,
}

#[derive(Debug, FromRow)]
struct DependencyRow {
    permission_id: Uuid,
    depends_on_permission_id: Uuid,
}

#[async_trait]
impl PermissionCatalogRepository for PostgresAccessStore {
    async fn load_catalog(&self) -> AppResult<PermissionCatalog> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT
                id,
                name,
                description,
                resource,
                action,
                category,
                module,
                risk_level,
                requires_approval,
                is_critical
            FROM permissions
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to load permissions", error))?;

        let edges = sqlx::query_as::<_, DependencyRow>(
            r#"
            SELECT permission_id, depends_on_permission_id
            FROM permission_dependencies
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to load permission dependencies", error))?;

        let mut dependencies: HashMap<Uuid, BTreeSet<PermissionId>> = HashMap::new();
        for edge in edges {
            dependencies
                .entry(edge.permission_id)
                .or_default()
                .insert(PermissionId::from_uuid(edge.depends_on_permission_id));
        }

        let definitions = rows
            .into_iter()
            .map(|row| {
                PermissionDefinition::new(PermissionDefinitionInput {
                    id: Some(PermissionId::from_uuid(row.id)),
                    dependencies: dependencies.remove(&row.id).unwrap_or_default(),
                    risk_level: RiskLevel::from_str(row.risk_level.as_str())?,
                    name: row.name,
                    description: row.description,
                    resource: row.resource,
                    action: row.action,
                    category: row.category,
                    module: row.module,
                    requires_approval: row.requires_approval,
                    is_critical: row.is_critical,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        PermissionCatalog::new(definitions)
    }

    async fn insert_permission(&self, definition: PermissionDefinition) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| database_error("failed to start transaction", error))?;

        sqlx::query(
            r#"
            INSERT INTO permissions (
                id,
                name,
                description,
                resource,
                action,
                category,
                module,
                risk_level,
                requires_approval,
                is_critical
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(definition.id().as_uuid())
        .bind(definition.name())
        .bind(definition.description())
        .bind(definition.resource())
        .bind(definition.action())
        .bind(definition.category())
        .bind(definition.module())
        .bind(definition.risk_level().as_str())
        .bind(definition.requires_approval())
        .bind(definition.is_critical())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to insert permission '{}'", definition.name()),
                error,
            )
        })?;

        let dependencies: Vec<Uuid> = definition
            .dependencies()
            .iter()
            .map(PermissionId::as_uuid)
            .collect();
        sqlx::query(
            r#"
            INSERT INTO permission_dependencies (permission_id, depends_on_permission_id)
            SELECT $1, dependency
            FROM unnest($2::uuid[]) AS dependency
            "#,
        )
        .bind(definition.id().as_uuid())
        .bind(dependencies)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            database_error(
                format!(
                    "failed to record dependencies of permission '{}'",
                    definition.name()
                ),
                error,
            )
        })?;

        transaction
            .commit()
            .await
            .map_err(|error| database_error("failed to commit permission insert", error))
    }

    async fn add_permission_dependency(
        &self,
        permission_id: PermissionId,
        depends_on: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permission_dependencies (permission_id, depends_on_permission_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(permission_id.as_uuid())
        .bind(depends_on.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to record dependency '{permission_id}' -> '{depends_on}'"),
                error,
            )
        })?;

        Ok(())
    }
}
