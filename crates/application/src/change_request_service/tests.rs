use chrono::Duration;
use wardkeep_core::AppError;
use wardkeep_domain::{
    AuditAction, ChangeRequestId, ChangeRequestStatus, EMPTY_CHANGE_REQUEST,
    ONLY_PENDING_CANCELLABLE, PermissionId, REQUEST_NO_LONGER_VALID, User,
};

use crate::test_support::Harness;
use crate::{AuthorizationService, ChangeRequestQuery, Clock, UserOverrideRepository};

use super::{ChangeRequestService, CreateChangeRequestInput};

struct Fixture {
    harness: Harness,
    authorization: AuthorizationService,
    service: ChangeRequestService,
    view_users: PermissionId,
    edit_users: PermissionId,
    requester: User,
    approver: User,
    target: User,
}

async fn fixture() -> Fixture {
    let harness = Harness::new();
    let view_users = harness.permission("view-users", &[]).await;
    let edit_users = harness.permission("edit-users", &[view_users]).await;
    let requester = harness.user("ward-manager", None, None, false).await;
    let approver = harness.user("it-lead", None, None, true).await;
    let target = harness.user("nurse", None, None, false).await;

    let authorization = AuthorizationService::new(&harness.repositories, harness.clock.clone());
    let service = ChangeRequestService::new(
        authorization.clone(),
        harness.repositories.clone(),
        harness.clock.clone(),
    );

    Fixture {
        harness,
        authorization,
        service,
        view_users,
        edit_users,
        requester,
        approver,
        target,
    }
}

fn input(add: &[PermissionId], remove: &[PermissionId]) -> CreateChangeRequestInput {
    CreateChangeRequestInput {
        permissions_to_add: add.iter().copied().collect(),
        permissions_to_remove: remove.iter().copied().collect(),
        reason: "rota change".to_owned(),
        expires_at: None,
    }
}

#[tokio::test]
async fn empty_request_is_rejected() {
    let fixture = fixture().await;
    let result = fixture
        .service
        .create(&fixture.target, input(&[], &[]), &fixture.requester)
        .await;

    let Err(AppError::Validation(message)) = result else {
        panic!("empty request should fail validation");
    };
    assert_eq!(message, EMPTY_CHANGE_REQUEST);
}

#[tokio::test]
async fn missing_dependency_is_reported() {
    let fixture = fixture().await;
    let result = fixture
        .service
        .create(&fixture.target, input(&[fixture.edit_users], &[]), &fixture.requester)
        .await;

    let Err(AppError::Validation(message)) = result else {
        panic!("unsatisfied dependency should fail validation");
    };
    assert_eq!(message, "edit-users requires view-users");

    let together = fixture
        .service
        .create(
            &fixture.target,
            input(&[fixture.view_users, fixture.edit_users], &[]),
            &fixture.requester,
        )
        .await;
    assert!(together.is_ok());
}

#[tokio::test]
async fn unknown_permission_is_rejected() {
    let fixture = fixture().await;
    let result = fixture
        .service
        .create(&fixture.target, input(&[PermissionId::new()], &[]), &fixture.requester)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn approval_writes_overrides_once() {
    let fixture = fixture().await;
    let Ok(request) = fixture
        .service
        .create(&fixture.target, input(&[fixture.view_users], &[]), &fixture.requester)
        .await
    else {
        panic!("request should be created");
    };
    assert!(
        !fixture
            .authorization
            .has_permission(&fixture.target, "view-users")
            .await
    );

    let approved = fixture.service.approve(request.id(), &fixture.approver).await;
    assert!(approved.is_ok_and(|value| value.status() == ChangeRequestStatus::Approved));
    assert!(
        fixture
            .authorization
            .has_permission(&fixture.target, "view-users")
            .await
    );

    let overrides = fixture.harness.store.list_overrides(fixture.target.id()).await;
    assert!(overrides.is_ok_and(|values| values.len() == 1 && values[0].allowed));

    let Err(AppError::InvalidState(message)) =
        fixture.service.approve(request.id(), &fixture.approver).await
    else {
        panic!("second approval should fail");
    };
    assert_eq!(message, REQUEST_NO_LONGER_VALID);
}

#[tokio::test]
async fn approval_turns_removals_into_deny_overrides() {
    let fixture = fixture().await;
    let role_id = fixture.harness.role("ward-staff", &[fixture.view_users]).await;
    let target = fixture
        .harness
        .user("agency-nurse", None, Some(role_id), false)
        .await;
    assert!(fixture.authorization.has_permission(&target, "view-users").await);

    let Ok(request) = fixture
        .service
        .create(&target, input(&[], &[fixture.view_users]), &fixture.requester)
        .await
    else {
        panic!("request should be created");
    };
    assert!(
        fixture
            .service
            .approve(request.id(), &fixture.approver)
            .await
            .is_ok()
    );

    assert!(!fixture.authorization.has_permission(&target, "view-users").await);
}

#[tokio::test]
async fn rejection_changes_nothing() {
    let fixture = fixture().await;
    let Ok(request) = fixture
        .service
        .create(&fixture.target, input(&[fixture.view_users], &[]), &fixture.requester)
        .await
    else {
        panic!("request should be created");
    };

    let rejected = fixture.service.reject(request.id(), &fixture.approver).await;
    assert!(rejected.is_ok_and(|value| {
        value.status() == ChangeRequestStatus::Rejected && !value.withdrawn()
    }));
    assert!(
        !fixture
            .authorization
            .has_permission(&fixture.target, "view-users")
            .await
    );

    let approve_after = fixture.service.approve(request.id(), &fixture.approver).await;
    assert!(matches!(approve_after, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn only_requester_or_super_admin_may_cancel() {
    let fixture = fixture().await;
    let Ok(request) = fixture
        .service
        .create(&fixture.target, input(&[fixture.view_users], &[]), &fixture.requester)
        .await
    else {
        panic!("request should be created");
    };

    let bystander = fixture.harness.user("porter", None, None, false).await;
    let forbidden = fixture.service.cancel(request.id(), &bystander).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let cancelled = fixture.service.cancel(request.id(), &fixture.requester).await;
    assert!(cancelled.is_ok_and(|value| {
        value.status() == ChangeRequestStatus::Rejected && value.withdrawn()
    }));

    let Err(AppError::InvalidState(message)) =
        fixture.service.cancel(request.id(), &fixture.requester).await
    else {
        panic!("second cancel should fail");
    };
    assert_eq!(message, ONLY_PENDING_CANCELLABLE);
}

#[tokio::test]
async fn overdue_requests_expire() {
    let fixture = fixture().await;
    let mut with_deadline = input(&[fixture.view_users], &[]);
    with_deadline.expires_at = Some(fixture.harness.clock.now() + Duration::hours(24));
    let Ok(request) = fixture
        .service
        .create(&fixture.target, with_deadline, &fixture.requester)
        .await
    else {
        panic!("request should be created");
    };
    let Ok(open_ended) = fixture
        .service
        .create(
            &fixture.target,
            input(&[fixture.view_users], &[]),
            &fixture.requester,
        )
        .await
    else {
        panic!("request should be created");
    };

    fixture.harness.clock.advance(Duration::hours(24));
    assert_eq!(
        fixture.service.effective_status(&request),
        ChangeRequestStatus::Expired
    );

    let approve_late = fixture.service.approve(request.id(), &fixture.approver).await;
    assert!(matches!(approve_late, Err(AppError::InvalidState(_))));

    assert!(fixture.service.expire_overdue().await.is_ok_and(|count| count == 1));
    assert!(fixture.service.expire_overdue().await.is_ok_and(|count| count == 0));

    let stored = fixture.harness.store.stored_request(request.id()).await;
    assert!(stored.is_some_and(|value| value.status() == ChangeRequestStatus::Expired));
    let untouched = fixture.harness.store.stored_request(open_ended.id()).await;
    assert!(untouched.is_some_and(|value| value.status() == ChangeRequestStatus::Pending));

    let events = fixture.harness.audit.events.lock().await;
    assert!(
        events
            .iter()
            .any(|event| event.action == AuditAction::ChangeRequestExpired
                && event.actor.is_none())
    );
}

#[tokio::test]
async fn list_filters_by_status_and_user() {
    let fixture = fixture().await;
    let other = fixture.harness.user("physio", None, None, false).await;
    for target in [&fixture.target, &other] {
        let created = fixture
            .service
            .create(target, input(&[fixture.view_users], &[]), &fixture.requester)
            .await;
        assert!(created.is_ok());
    }

    let for_target = fixture
        .service
        .list(ChangeRequestQuery {
            user_id: Some(fixture.target.id()),
            ..ChangeRequestQuery::default()
        })
        .await;
    assert!(for_target.is_ok_and(|requests| requests.len() == 1));

    let approved = fixture
        .service
        .list(ChangeRequestQuery {
            status: Some(ChangeRequestStatus::Approved),
            ..ChangeRequestQuery::default()
        })
        .await;
    assert!(approved.is_ok_and(|requests| requests.is_empty()));

    let unknown = fixture
        .service
        .find(ChangeRequestId::new())
        .await;
    assert!(unknown.is_ok_and(|value| value.is_none()));
}
