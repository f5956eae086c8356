use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;
use wardkeep_application::{
    AccessRepositories, AuthorizationService, ChangeRequestService, Clock, PermissionAdminService,
    PermissionCache, SystemClock,
};
use wardkeep_core::AppResult;
use wardkeep_domain::{User, UserId, default_hospital_catalog};
use wardkeep_infrastructure::{
    InMemoryAccessStore, InMemoryPermissionCache, PostgresAccessStore, PostgresAuditRepository,
    RedisPermissionCache, TracingAuditRepository,
};

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::redis::build_redis_client;

/// Wires the store, cache and services. Without a pool the in-memory store
/// and the tracing audit sink are used.
pub fn build_app_state(pool: Option<PgPool>, config: &ApiConfig) -> AppResult<AppState> {
    let repositories = match pool {
        Some(pool) => AccessRepositories::from_store(
            Arc::new(PostgresAccessStore::new(pool.clone())),
            Arc::new(PostgresAuditRepository::new(pool)),
        ),
        None => {
            info!("DATABASE_URL not set, using the in-memory access store");
            AccessRepositories::from_store(
                Arc::new(InMemoryAccessStore::new()),
                Arc::new(TracingAuditRepository),
            )
        }
    };

    let permission_cache: Arc<dyn PermissionCache> = match config.redis_url.as_deref() {
        Some(redis_url) => Arc::new(RedisPermissionCache::new(
            build_redis_client(redis_url)?,
            config.permission_cache_key_prefix.clone(),
        )),
        None => Arc::new(InMemoryPermissionCache::new()),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let authorization_service = AuthorizationService::new(&repositories, clock.clone())
        .with_permission_cache(permission_cache, config.permission_cache_ttl_seconds);

    Ok(AppState {
        permission_admin_service: PermissionAdminService::new(
            authorization_service.clone(),
            repositories.clone(),
            clock.clone(),
        ),
        change_request_service: ChangeRequestService::new(
            authorization_service.clone(),
            repositories.clone(),
            clock,
        ),
        authorization_service,
        user_repository: repositories.users,
    })
}

/// Seeds the hospital catalog into an empty store.
pub async fn seed_default_catalog(state: &AppState) -> AppResult<()> {
    let inserted = state
        .permission_admin_service
        .seed_catalog(default_hospital_catalog()?)
        .await?;

    if inserted > 0 {
        info!(inserted, "seeded default hospital permission catalog");
    }

    Ok(())
}

/// Creates the bootstrap super-admin account when it does not exist yet.
pub async fn ensure_bootstrap_admin(state: &AppState, user_id: UserId) -> AppResult<()> {
    if state.user_repository.find_user(user_id).await?.is_some() {
        return Ok(());
    }

    let admin = User::new(
        user_id,
        format!("bootstrap-admin-{}", user_id.as_uuid().simple()),
        None,
        None,
        true,
    )?;
    state.user_repository.save_user(admin).await?;
    info!(user_id = %user_id, "created bootstrap super-admin");
    Ok(())
}
