use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Duration;
use wardkeep_core::AppError;
use wardkeep_domain::{
    PermissionId, TemporaryPermission, TemporaryPermissionInput, User, UserId,
    UserPermissionOverride,
};

use crate::test_support::{FakePermissionCache, Harness};
use crate::{Clock, RoleRepository, TemporaryPermissionRepository, UserOverrideRepository};

use super::{AuthorizationService, PermissionResolution};

fn service(harness: &Harness) -> AuthorizationService {
    AuthorizationService::new(&harness.repositories, harness.clock.clone())
}

fn cached_service(harness: &Harness, cache: Arc<FakePermissionCache>) -> AuthorizationService {
    service(harness).with_permission_cache(cache, 300)
}

async fn grant_temporary(
    harness: &Harness,
    user_id: UserId,
    permission_id: PermissionId,
    hours: i64,
) -> TemporaryPermission {
    let now = harness.clock.now();
    let grant = TemporaryPermission::new(TemporaryPermissionInput {
        user_id,
        permission_id,
        granted_by: user_id,
        granted_at: now,
        expires_at: now + Duration::hours(hours),
        reason: "theatre cover".to_owned(),
    });
    let Ok(grant) = grant else {
        panic!("grant should be valid");
    };
    if harness.store.insert_grant(grant.clone()).await.is_err() {
        panic!("grant should insert");
    }
    grant
}

#[tokio::test]
async fn super_admin_holds_unknown_permissions() {
    let harness = Harness::new();
    let flagged = harness.user("root", None, None, true).await;
    let legacy = harness.user("chief", Some("super admin"), None, false).await;
    let service = service(&harness);

    assert!(service.has_permission(&flagged, "does-not-exist").await);
    assert!(service.has_permission(&legacy, "does-not-exist").await);
}

#[tokio::test]
async fn override_wins_over_role_grant() {
    let harness = Harness::new();
    let view_billing = harness.permission("view-billing", &[]).await;
    let role_id = harness.role("reception-admin", &[view_billing]).await;
    let user = harness.user("clerk", None, Some(role_id), false).await;
    let service = service(&harness);

    assert!(service.has_permission(&user, "view-billing").await);

    let denied = harness
        .store
        .upsert_override(UserPermissionOverride::deny(user.id(), view_billing))
        .await;
    assert!(denied.is_ok());
    assert!(!service.has_permission(&user, "view-billing").await);
    assert!(matches!(
        service.resolve_permission(&user, "view-billing").await,
        Ok(PermissionResolution::OverrideDenied)
    ));
}

#[tokio::test]
async fn allow_override_grants_without_role() {
    let harness = Harness::new();
    let view_lab = harness.permission("view-lab", &[]).await;
    let user = harness.user("porter", None, None, false).await;

    let allowed = harness
        .store
        .upsert_override(UserPermissionOverride::allow(user.id(), view_lab))
        .await;
    assert!(allowed.is_ok());
    assert!(service(&harness).has_permission(&user, "view-lab").await);
}

#[tokio::test]
async fn temporary_grant_lapses_at_expiry() {
    let harness = Harness::new();
    let view_pharmacy = harness.permission("view-pharmacy", &[]).await;
    let user = harness.user("locum", None, None, false).await;
    grant_temporary(&harness, user.id(), view_pharmacy, 2).await;
    let service = service(&harness);

    assert!(service.has_permission(&user, "view-pharmacy").await);

    harness.clock.advance(Duration::hours(2) - Duration::seconds(1));
    assert!(service.has_permission(&user, "view-pharmacy").await);

    harness.clock.advance(Duration::seconds(1));
    assert!(!service.has_permission(&user, "view-pharmacy").await);
}

#[tokio::test]
async fn revoked_temporary_grant_is_denied_without_flush() {
    let harness = Harness::new();
    let view_pharmacy = harness.permission("view-pharmacy", &[]).await;
    let user = harness.user("locum", None, None, false).await;
    let cache = Arc::new(FakePermissionCache::default());
    let service = cached_service(&harness, cache.clone());

    let mut grant = grant_temporary(&harness, user.id(), view_pharmacy, 2).await;
    assert!(service.has_permission(&user, "view-pharmacy").await);

    let Ok(admin) = User::new(UserId::new(), "admin", None, None, true) else {
        panic!("admin should be valid");
    };
    assert!(grant.revoke(&admin, harness.clock.now()).is_ok());
    assert!(harness.store.save_revocation(&grant).await.is_ok());

    assert!(!service.has_permission(&user, "view-pharmacy").await);
    assert_eq!(cache.flushes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn temporary_and_override_paths_bypass_cache() {
    let harness = Harness::new();
    let view_lab = harness.permission("view-lab", &[]).await;
    let user = harness.user("locum", None, None, false).await;
    let cache = Arc::new(FakePermissionCache::default());
    let service = cached_service(&harness, cache.clone());

    grant_temporary(&harness, user.id(), view_lab, 1).await;
    assert!(service.has_permission(&user, "view-lab").await);
    assert_eq!(cache.reads.load(Ordering::SeqCst), 0);
    assert_eq!(cache.cached(user.id(), "view-lab").await, None);
}

#[tokio::test]
async fn role_grants_are_cached_until_invalidated() {
    let harness = Harness::new();
    let view_billing = harness.permission("view-billing", &[]).await;
    let role_id = harness.role("reception-admin", &[view_billing]).await;
    let user = harness
        .user("clerk", Some("Reception Admin"), Some(role_id), false)
        .await;
    let cache = Arc::new(FakePermissionCache::default());
    let service = cached_service(&harness, cache.clone());

    assert!(service.has_permission(&user, "view-billing").await);
    assert_eq!(cache.cached(user.id(), "view-billing").await, Some(true));

    let cleared = harness
        .store
        .set_role_permissions(role_id, BTreeSet::new())
        .await;
    assert!(cleared.is_ok());

    // Stale until invalidated.
    assert!(service.has_permission(&user, "view-billing").await);

    assert!(service.invalidate_cache(user.id()).await.is_ok());
    assert!(!service.has_permission(&user, "view-billing").await);
    assert_eq!(cache.cached(user.id(), "view-billing").await, Some(false));
}

#[tokio::test]
async fn legacy_role_grants_when_normalized_role_does_not() {
    let harness = Harness::new();
    let view_reports = harness.permission("view-reports", &[]).await;
    harness.legacy_role("Doctor", view_reports).await;
    let role_id = harness.role("doctor", &[]).await;
    let user = harness
        .user("house-officer", Some("Doctor"), Some(role_id), false)
        .await;

    assert!(matches!(
        service(&harness).resolve_permission(&user, "view-reports").await,
        Ok(PermissionResolution::RoleGranted)
    ));
}

#[tokio::test]
async fn storage_failure_fails_closed() {
    let harness = Harness::new();
    let view_billing = harness.permission("view-billing", &[]).await;
    let role_id = harness.role("reception-admin", &[view_billing]).await;
    let user = harness.user("clerk", None, Some(role_id), false).await;
    let service = service(&harness);

    harness.store.fail_reads.store(true, Ordering::SeqCst);
    assert!(!service.has_permission(&user, "view-billing").await);
    assert!(service.effective_permissions(&user).await.is_empty());
    assert!(matches!(
        service.require_permission(&user, "view-billing").await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn any_and_all_follow_single_checks() {
    let harness = Harness::new();
    let view_billing = harness.permission("view-billing", &[]).await;
    harness.permission("edit-billing", &[view_billing]).await;
    let role_id = harness.role("cashier", &[view_billing]).await;
    let user = harness.user("cashier", None, Some(role_id), false).await;
    let service = service(&harness);

    assert!(
        service
            .has_any_permission(&user, &["edit-billing", "view-billing"])
            .await
    );
    assert!(
        !service
            .has_all_permissions(&user, &["edit-billing", "view-billing"])
            .await
    );
    assert!(service.has_all_permissions(&user, &["view-billing"]).await);
    assert!(!service.has_any_permission::<&str>(&user, &[]).await);
    assert!(service.has_all_permissions::<&str>(&user, &[]).await);
}

#[tokio::test]
async fn effective_permissions_apply_overrides_last() {
    let harness = Harness::new();
    let view_billing = harness.permission("view-billing", &[]).await;
    let edit_billing = harness.permission("edit-billing", &[view_billing]).await;
    let view_lab = harness.permission("view-lab", &[]).await;
    let view_reports = harness.permission("view-reports", &[]).await;
    let role_id = harness.role("cashier", &[view_billing, edit_billing]).await;
    harness.legacy_role("Cashier", view_reports).await;
    let user = harness
        .user("cashier", Some("Cashier"), Some(role_id), false)
        .await;

    for value in [
        UserPermissionOverride::deny(user.id(), edit_billing),
        UserPermissionOverride::allow(user.id(), view_lab),
    ] {
        assert!(harness.store.upsert_override(value).await.is_ok());
    }

    let names = service(&harness).effective_permissions(&user).await;
    let expected: BTreeSet<String> = ["view-billing", "view-lab", "view-reports"]
        .into_iter()
        .map(ToOwned::to_owned)
        .collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn effective_permissions_for_super_admin_cover_catalog() {
    let harness = Harness::new();
    harness.permission("view-billing", &[]).await;
    harness.permission("view-lab", &[]).await;
    let admin = harness.user("root", None, None, true).await;

    assert_eq!(service(&harness).effective_permissions(&admin).await.len(), 2);
}

#[tokio::test]
async fn reception_admin_end_to_end() {
    let harness = Harness::new();
    let view_billing = harness.permission("view-billing", &[]).await;
    let role_id = harness.role("reception-admin", &[]).await;
    let user = harness
        .user("front-desk", Some("Reception Admin"), Some(role_id), false)
        .await;
    let cache = Arc::new(FakePermissionCache::default());
    let service = cached_service(&harness, cache);

    let mapped = harness
        .store
        .set_role_permissions(role_id, BTreeSet::from([view_billing]))
        .await;
    assert!(mapped.is_ok());
    assert!(service.has_permission(&user, "view-billing").await);

    let unmapped = harness
        .store
        .set_role_permissions(role_id, BTreeSet::new())
        .await;
    assert!(unmapped.is_ok());
    assert!(service.invalidate_cache(user.id()).await.is_ok());
    assert!(!service.has_permission(&user, "view-billing").await);
}

#[tokio::test]
async fn zero_ttl_disables_cache() {
    let harness = Harness::new();
    let view_billing = harness.permission("view-billing", &[]).await;
    let role_id = harness.role("cashier", &[view_billing]).await;
    let user = harness.user("cashier", None, Some(role_id), false).await;
    let cache = Arc::new(FakePermissionCache::default());
    let service = service(&harness).with_permission_cache(cache.clone(), 0);

    assert!(service.has_permission(&user, "view-billing").await);
    assert_eq!(cache.reads.load(Ordering::SeqCst), 0);
}
