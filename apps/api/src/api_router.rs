use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;
use wardkeep_core::AppError;

use crate::handlers::{access, administration, change_requests, health};
use crate::middleware;
use crate::state::AppState;

mod cors;

pub fn build_router(app_state: AppState, cors_allowed_origin: Option<&str>) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route("/api/permissions", get(access::list_catalog_handler))
        .route("/api/permissions/check", get(access::check_permission_handler))
        .route(
            "/api/permissions/check-any",
            post(access::check_any_permission_handler),
        )
        .route(
            "/api/permissions/check-all",
            post(access::check_all_permissions_handler),
        )
        .route("/api/users", post(administration::register_user_handler))
        .route(
            "/api/users/{user_id}/permissions",
            get(access::effective_permissions_handler),
        )
        .route(
            "/api/users/{user_id}/role",
            put(administration::assign_role_handler),
        )
        .route(
            "/api/users/{user_id}/temporary-permissions",
            get(administration::list_temporary_permissions_handler),
        )
        .route(
            "/api/users/{user_id}/overrides/{permission}",
            put(administration::set_override_handler)
                .delete(administration::remove_override_handler),
        )
        .route(
            "/api/temporary-permissions",
            post(administration::grant_temporary_permission_handler),
        )
        .route(
            "/api/temporary-permissions/{grant_id}",
            delete(administration::revoke_temporary_permission_handler),
        )
        .route("/api/roles", post(administration::save_role_handler))
        .route(
            "/api/roles/{role_id}/permissions",
            put(administration::set_role_permissions_handler),
        )
        .route(
            "/api/legacy-roles/{role}/permissions/{permission}",
            put(administration::grant_legacy_role_permission_handler)
                .delete(administration::revoke_legacy_role_permission_handler),
        )
        .route(
            "/api/change-requests",
            get(change_requests::list_change_requests_handler)
                .post(change_requests::create_change_request_handler),
        )
        .route(
            "/api/change-requests/expire",
            post(change_requests::expire_change_requests_handler),
        )
        .route(
            "/api/change-requests/{request_id}",
            get(change_requests::get_change_request_handler),
        )
        .route(
            "/api/change-requests/{request_id}/approve",
            post(change_requests::approve_change_request_handler),
        )
        .route(
            "/api/change-requests/{request_id}/reject",
            post(change_requests::reject_change_request_handler),
        )
        .route(
            "/api/change-requests/{request_id}/cancel",
            post(change_requests::cancel_change_request_handler),
        )
        .route(
            "/api/cache/users/{user_id}/invalidate",
            post(administration::invalidate_user_cache_handler),
        )
        .route("/api/cache/flush", post(administration::flush_cache_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_actor,
        ));

    let router = Router::new()
        .route("/health", get(health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http());

    let router = match cors_allowed_origin {
        Some(origin) => router.layer(cors::build_cors_layer(origin)?),
        None => router,
    };

    Ok(router.with_state(app_state))
}
