//! Maker-checker workflow scenarios through the engine facade

use chrono::Utc;
use sacco_authz::resolver::InMemoryMembershipProvider;
use sacco_authz::{
    Actor, ApprovalRequest, ApprovalStatus, ApprovalStore, AuthzEngine, AuthzError, GateOutcome,
    GroupMembership, GroupRole, GroupType, InMemoryApprovalStore, OperationPayload,
    OperationRegistry, PermissionCatalog, PermissionScope, Role, ScopeTarget, ServiceRole,
};
use std::collections::HashSet;
use std::sync::Arc;

mod common;

fn org_admin(id: &str) -> Actor {
    Actor::new(id, ServiceRole::Member).with_membership(GroupMembership::new(
        "org1",
        GroupType::Organization,
        GroupRole::GroupAdmin,
    ))
}

fn engine() -> AuthzEngine {
    common::init_tracing();
    AuthzEngine::new(
        Arc::new(PermissionCatalog::sacco_default()),
        OperationRegistry::with_sacco_defaults(),
        Arc::new(InMemoryMembershipProvider::new()),
    )
}

async fn pending_withdrawal(engine: &AuthzEngine, maker: &Actor) -> uuid::Uuid {
    let outcome = engine
        .submit(
            maker,
            "withdraw",
            &ScopeTarget::organization("org1"),
            &OperationPayload::with_amount(250_000),
        )
        .await
        .unwrap();
    match outcome {
        GateOutcome::Pending { request_id } => request_id,
        GateOutcome::Executed => panic!("withdrawal must be gated"),
    }
}

#[tokio::test]
async fn test_quorum_of_two_releases_exactly_once() {
    let engine = engine();
    let maker = org_admin("maker");
    let request_id = pending_withdrawal(&engine, &maker).await;

    // The maker cannot approve their own request
    let err = engine.submit_approval(request_id, &maker).await.unwrap_err();
    assert!(matches!(err, AuthzError::SelfApprovalForbidden(_)));

    let first = engine
        .submit_approval(request_id, &org_admin("checker-1"))
        .await
        .unwrap();
    assert_eq!(first, ApprovalStatus::Pending);

    let second = engine
        .submit_approval(request_id, &org_admin("checker-2"))
        .await
        .unwrap();
    assert_eq!(second, ApprovalStatus::Approved);

    // A third approval arrives too late
    let err = engine
        .submit_approval(request_id, &org_admin("checker-3"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::ApprovalNotPending(_)));
}

#[tokio::test]
async fn test_concurrent_approvals_release_exactly_once() {
    let engine = Arc::new(engine());
    let request_id = pending_withdrawal(&engine, &org_admin("maker")).await;

    let mut tasks = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let checker = org_admin(&format!("checker-{i}"));
        tasks.push(tokio::spawn(async move {
            engine.submit_approval(request_id, &checker).await
        }));
    }
    let results = futures::future::join_all(tasks).await;

    let mut released = 0;
    for result in results {
        match result.unwrap() {
            Ok(ApprovalStatus::Approved) => released += 1,
            Ok(ApprovalStatus::Pending) => {}
            Err(AuthzError::ApprovalNotPending(_)) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    // Exactly one caller observed the releasing transition
    assert_eq!(released, 1);
    assert_eq!(
        engine.approval_status(request_id).await.unwrap(),
        ApprovalStatus::Approved
    );
}

#[tokio::test]
async fn test_single_rejection_vetoes_despite_prior_approvals() {
    let engine = engine();
    let request_id = pending_withdrawal(&engine, &org_admin("maker")).await;

    engine
        .submit_approval(request_id, &org_admin("checker-1"))
        .await
        .unwrap();

    let status = engine
        .submit_rejection(request_id, &org_admin("checker-2"))
        .await
        .unwrap();
    assert_eq!(status, ApprovalStatus::Rejected);

    let err = engine
        .submit_approval(request_id, &org_admin("checker-3"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::ApprovalNotPending(_)));
}

#[tokio::test]
async fn test_unqualified_members_can_neither_approve_nor_reject() {
    let engine = engine();
    let request_id = pending_withdrawal(&engine, &org_admin("maker")).await;

    let member = Actor::new("mallory", ServiceRole::Member).with_membership(
        GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupMember),
    );

    let err = engine.submit_approval(request_id, &member).await.unwrap_err();
    assert!(matches!(err, AuthzError::UnauthorizedApprover(_)));
    let err = engine.submit_rejection(request_id, &member).await.unwrap_err();
    assert!(matches!(err, AuthzError::UnauthorizedApprover(_)));

    // A service-level admin qualifies without any org membership
    let admin = Actor::new("service-admin", ServiceRole::Admin);
    let status = engine.submit_approval(request_id, &admin).await.unwrap();
    assert_eq!(status, ApprovalStatus::Pending);
}

#[tokio::test]
async fn test_expired_request_rejects_approvals_on_access() {
    let store = Arc::new(InMemoryApprovalStore::new());
    let engine = engine().with_approval_store(store.clone());

    // A request whose window elapsed before anyone looked at it
    let mut request = ApprovalRequest::new(
        "withdraw",
        "maker",
        PermissionScope::Organization,
        ScopeTarget::organization("org1"),
        HashSet::from([Role::Group(GroupRole::GroupAdmin)]),
        2,
        false,
        24,
    );
    request.expires_at = Utc::now() - chrono::Duration::hours(2);
    let request_id = request.id;
    store.insert(request).await.unwrap();

    let err = engine
        .submit_approval(request_id, &org_admin("checker-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::ApprovalExpired(_)));
    assert_eq!(
        engine.approval_status(request_id).await.unwrap(),
        ApprovalStatus::Expired
    );
}

#[tokio::test]
async fn test_overdue_sweep_expires_only_stale_requests() {
    let store = Arc::new(InMemoryApprovalStore::new());
    let engine = engine().with_approval_store(store.clone());

    let maker = org_admin("maker");
    let live_id = pending_withdrawal(&engine, &maker).await;

    let mut stale = ApprovalRequest::new(
        "withdraw",
        "maker",
        PermissionScope::Organization,
        ScopeTarget::organization("org1"),
        HashSet::new(),
        2,
        false,
        24,
    );
    stale.expires_at = Utc::now() - chrono::Duration::hours(2);
    let stale_id = stale.id;
    store.insert(stale).await.unwrap();

    assert_eq!(engine.expire_overdue_approvals().await.unwrap(), 1);
    assert_eq!(
        engine.approval_status(stale_id).await.unwrap(),
        ApprovalStatus::Expired
    );
    assert_eq!(
        engine.approval_status(live_id).await.unwrap(),
        ApprovalStatus::Pending
    );
}

#[tokio::test]
async fn test_threshold_gating_depends_on_the_operation_kind() {
    let engine = engine();
    let maker = org_admin("maker");
    let target = ScopeTarget::organization("org1");

    // Transfers are gated only above 50,000
    let outcome = engine
        .submit(&maker, "transfer", &target, &OperationPayload::with_amount(50_000))
        .await
        .unwrap();
    assert_eq!(outcome, GateOutcome::Executed);

    let outcome = engine
        .submit(&maker, "transfer", &target, &OperationPayload::with_amount(50_001))
        .await
        .unwrap();
    assert!(matches!(outcome, GateOutcome::Pending { .. }));

    // Loan approvals use the 500,000 limit
    let outcome = engine
        .submit(&maker, "approveLoan", &target, &OperationPayload::with_amount(400_000))
        .await
        .unwrap();
    assert_eq!(outcome, GateOutcome::Executed);

    let outcome = engine
        .submit(&maker, "approveLoan", &target, &OperationPayload::with_amount(600_000))
        .await
        .unwrap();
    assert!(matches!(outcome, GateOutcome::Pending { .. }));
}
