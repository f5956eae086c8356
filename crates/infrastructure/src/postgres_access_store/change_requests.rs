use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;
use wardkeep_application::{ChangeRequestQuery, ChangeRequestRepository};
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{
    ChangeRequestId, ChangeRequestRecord, ChangeRequestStatus, PermissionChangeRequest,
    PermissionId, REQUEST_NO_LONGER_VALID, UserId,
};

use super::{PostgresAccessStore, database_error};

#[derive(Debug, FromRow)]
struct ChangeRequestRow {
    id: Uuid,
    user_id: Uuid,
    requested_by: Uuid,
    permissions_to_add: Vec<Uuid>,
    permissions_to_remove: Vec<Uuid>,
    reason: String,
    status: String,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    withdrawn: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChangeRequestRow> for PermissionChangeRequest {
    type Error = AppError;

    fn try_from(row: ChangeRequestRow) -> Result<Self, Self::Error> {
        let status = ChangeRequestStatus::from_str(row.status.as_str()).map_err(|error| {
            AppError::Internal(format!("change request '{}': {error}", row.id))
        })?;

        Ok(PermissionChangeRequest::restore(ChangeRequestRecord {
            id: ChangeRequestId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            requested_by: UserId::from_uuid(row.requested_by),
            permissions_to_add: row
                .permissions_to_add
                .into_iter()
                .map(PermissionId::from_uuid)
                .collect(),
            permissions_to_remove: row
                .permissions_to_remove
                .into_iter()
                .map(PermissionId::from_uuid)
                .collect(),
            reason: row.reason,
            status,
            approved_by: row.approved_by.map(UserId::from_uuid),
            approved_at: row.approved_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
            withdrawn: row.withdrawn,
        }))
    }
}

const REQUEST_COLUMNS: &str = r#"
    id,
    user_id,
    requested_by,
    permissions_to_add,
    permissions_to_remove,
    reason,
    status,
    approved_by,
    approved_at,
    expires_at,
    withdrawn,
    created_at
"#;

fn uuids(ids: &std::collections::BTreeSet<PermissionId>) -> Vec<Uuid> {
    ids.iter().map(PermissionId::as_uuid).collect()
}

async fn update_pending<'e, E>(executor: E, request: &PermissionChangeRequest) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE permission_change_requests
        SET status = $2,
            approved_by = $3,
            approved_at = $4,
            withdrawn = $5
        WHERE id = $1
          AND status = 'pending'
        "#,
    )
    .bind(request.id().as_uuid())
    .bind(request.status().as_str())
    .bind(request.approved_by().map(|value| value.as_uuid()))
    .bind(request.approved_at())
    .bind(request.withdrawn())
    .execute(executor)
    .await
    .map_err(|error| {
        database_error(
            format!("failed to update change request '{}'", request.id()),
            error,
        )
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::InvalidState(REQUEST_NO_LONGER_VALID.to_owned()));
    }

    Ok(())
}

#[async_trait]
impl ChangeRequestRepository for PostgresAccessStore {
    async fn insert_request(&self, request: PermissionChangeRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permission_change_requests (
                id,
                user_id,
                requested_by,
                permissions_to_add,
                permissions_to_remove,
                reason,
                status,
                approved_by,
                approved_at,
                expires_at,
                withdrawn,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.user_id().as_uuid())
        .bind(request.requested_by().as_uuid())
        .bind(uuids(request.permissions_to_add()))
        .bind(uuids(request.permissions_to_remove()))
        .bind(request.reason())
        .bind(request.status().as_str())
        .bind(request.approved_by().map(|value| value.as_uuid()))
        .bind(request.approved_at())
        .bind(request.expires_at())
        .bind(request.withdrawn())
        .bind(request.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to insert change request '{}'", request.id()),
                error,
            )
        })?;

        Ok(())
    }

    async fn find_request(
        &self,
        id: ChangeRequestId,
    ) -> AppResult<Option<PermissionChangeRequest>> {
        let row = sqlx::query_as::<_, ChangeRequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM permission_change_requests WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| database_error(format!("failed to load change request '{id}'"), error))?;

        row.map(PermissionChangeRequest::try_from).transpose()
    }

    async fn list_requests(
        &self,
        query: ChangeRequestQuery,
    ) -> AppResult<Vec<PermissionChangeRequest>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {REQUEST_COLUMNS} FROM permission_change_requests WHERE TRUE"
        ));
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ").push_bind(user_id.as_uuid());
        }
        builder.push(" ORDER BY created_at DESC, id");
        if let Some(limit) = query.limit {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            builder.push(" LIMIT ").push_bind(limit);
        }

        let rows = builder
            .build_query_as::<ChangeRequestRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| database_error("failed to list change requests", error))?;

        rows.into_iter()
            .map(PermissionChangeRequest::try_from)
            .collect()
    }

    async fn save_decision(&self, request: &PermissionChangeRequest) -> AppResult<()> {
        update_pending(&self.pool, request).await
    }

    async fn apply_approval(&self, request: &PermissionChangeRequest) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| database_error("failed to start transaction", error))?;

        update_pending(&mut *transaction, request).await?;

        sqlx::query(
            r#"
            INSERT INTO user_permissions (user_id, permission_id, allowed)
            SELECT $1, permission_id, TRUE
            FROM unnest($2::uuid[]) AS permission_id
            UNION ALL
            SELECT $1, permission_id, FALSE
            FROM unnest($3::uuid[]) AS permission_id
            ON CONFLICT (user_id, permission_id) DO UPDATE
            SET allowed = EXCLUDED.allowed,
                updated_at = now()
            "#,
        )
        .bind(request.user_id().as_uuid())
        .bind(uuids(request.permissions_to_add()))
        .bind(uuids(request.permissions_to_remove()))
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            database_error(
                format!("failed to apply change request '{}'", request.id()),
                error,
            )
        })?;

        transaction
            .commit()
            .await
            .map_err(|error| database_error("failed to commit change request approval", error))
    }
}
