//! Engine facade wiring the authorization pipeline together
//!
//! One entry point per request: resolve the scope from the target, look the
//! operation up (fail closed on unknown names), run the guard, emit an
//! audit record, and route gated operations through the maker-checker
//! workflow. The maker-checker configuration is hot-reloadable; each gating
//! decision reads one snapshot of it.

use crate::approval::{
    ApprovalGate, ApprovalStatus, ApprovalStore, GateOutcome, InMemoryApprovalStore,
    OperationPayload,
};
use crate::audit::{AuditEntry, AuditSink, TracingAuditSink};
use crate::catalog::PermissionCatalog;
use crate::config::MakerCheckerConfig;
use crate::error::{AuthzError, Result};
use crate::guard::{AuthDecision, AuthorizationGuard, DecisionReason};
use crate::registry::OperationRegistry;
use crate::resolver::{MembershipProvider, PermissionResolver};
use crate::scope::{resolve_scope, ScopeTarget};
use crate::types::{Actor, AuditLevel, Permission, ServiceRole};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// The authorization engine
///
/// Immutable after construction apart from the hot-reloadable
/// maker-checker configuration; share with `Arc` across request handlers.
pub struct AuthzEngine {
    registry: OperationRegistry,
    guard: AuthorizationGuard,
    gate: ApprovalGate,
    memberships: Arc<dyn MembershipProvider>,
    audit: Arc<dyn AuditSink>,
    config: RwLock<Arc<MakerCheckerConfig>>,
}

impl AuthzEngine {
    /// Assemble an engine over a catalog, an operation registry and a
    /// membership provider; store, sink and config have in-process defaults
    pub fn new(
        catalog: Arc<PermissionCatalog>,
        registry: OperationRegistry,
        memberships: Arc<dyn MembershipProvider>,
    ) -> Self {
        let resolver = PermissionResolver::new(catalog);
        Self {
            registry,
            guard: AuthorizationGuard::new(resolver.clone()),
            gate: ApprovalGate::new(resolver, Arc::new(InMemoryApprovalStore::new())),
            memberships,
            audit: Arc::new(TracingAuditSink),
            config: RwLock::new(Arc::new(MakerCheckerConfig::default())),
        }
    }

    /// Replace the approval store (e.g. a durable backend)
    pub fn with_approval_store(mut self, store: Arc<dyn ApprovalStore>) -> Self {
        let resolver = self.guard.resolver().clone();
        self.gate = ApprovalGate::new(resolver, store);
        self
    }

    /// Replace the audit sink
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Replace the maker-checker configuration
    pub fn with_config(self, config: MakerCheckerConfig) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            ..self
        }
    }

    /// Hydrate an actor from the membership provider
    ///
    /// The returned actor carries a snapshot of memberships as of now;
    /// callers reuse it for the whole request.
    pub async fn load_actor(
        &self,
        actor_id: impl Into<String>,
        service_role: ServiceRole,
    ) -> Result<Actor> {
        let id = actor_id.into();
        let group_memberships = self.memberships.memberships_for(&id).await?;
        Ok(Actor {
            id,
            service_role,
            group_memberships,
        })
    }

    /// Effective permissions for an actor against a request target
    pub fn resolve_permissions(&self, actor: &Actor, target: &ScopeTarget) -> HashSet<Permission> {
        let scope = resolve_scope(target);
        self.guard
            .resolver()
            .resolve(actor, scope, target.id_for(scope))
    }

    /// Authorize an operation by name against a request target
    ///
    /// Unknown operation names deny rather than error. Every decision,
    /// allowed or denied, is handed to the audit sink.
    pub async fn authorize(
        &self,
        actor: &Actor,
        operation_name: &str,
        target: &ScopeTarget,
    ) -> AuthDecision {
        let scope = resolve_scope(target);

        let (decision, audit_level) = match self.registry.get(operation_name) {
            Some(operation) => (
                self.guard.authorize(actor, operation, scope, target),
                operation.audit_level,
            ),
            None => (
                self.guard.deny_unknown_operation(actor, operation_name, scope),
                AuditLevel::Comprehensive,
            ),
        };

        self.audit
            .record(AuditEntry::new(decision.clone(), audit_level))
            .await;

        decision
    }

    /// Authorize and, when required, divert the operation into the
    /// approval workflow
    ///
    /// Returns `Executed` when the caller may proceed immediately and
    /// `Pending` when execution is withheld for approvals. Denials surface
    /// as typed errors.
    pub async fn submit(
        &self,
        actor: &Actor,
        operation_name: &str,
        target: &ScopeTarget,
        payload: &OperationPayload,
    ) -> Result<GateOutcome> {
        let decision = self.authorize(actor, operation_name, target).await;
        if !decision.is_allowed() {
            return Err(denial_error(operation_name, &decision));
        }

        let operation = self
            .registry
            .get(operation_name)
            .ok_or_else(|| AuthzError::UnknownOperation(operation_name.to_string()))?;

        let config = self.config_snapshot().await;
        self.gate
            .submit_if_required(operation, actor, decision.scope, target, payload, &config)
            .await
    }

    /// Record an approval on a pending request
    pub async fn submit_approval(
        &self,
        request_id: Uuid,
        approver: &Actor,
    ) -> Result<ApprovalStatus> {
        self.gate.submit_approval(request_id, approver).await
    }

    /// Record a rejection on a pending request (single veto)
    pub async fn submit_rejection(
        &self,
        request_id: Uuid,
        approver: &Actor,
    ) -> Result<ApprovalStatus> {
        self.gate.submit_rejection(request_id, approver).await
    }

    /// Current status of an approval request, applying lazy expiry
    pub async fn approval_status(&self, request_id: Uuid) -> Result<ApprovalStatus> {
        self.gate.status(request_id).await
    }

    /// Transition all overdue pending requests to expired
    pub async fn expire_overdue_approvals(&self) -> Result<usize> {
        self.gate.expire_overdue().await
    }

    /// The configuration snapshot gating decisions read
    pub async fn config_snapshot(&self) -> Arc<MakerCheckerConfig> {
        self.config.read().await.clone()
    }

    /// Swap in a new maker-checker configuration
    ///
    /// In-flight approval requests keep the requirements they snapshotted
    /// at creation; only new gating decisions see the new values.
    pub async fn reload_config(&self, config: MakerCheckerConfig) {
        let mut current = self.config.write().await;
        *current = Arc::new(config);
        info!("maker-checker configuration reloaded");
    }
}

/// Map a denial decision to its typed error
fn denial_error(operation_name: &str, decision: &AuthDecision) -> AuthzError {
    match &decision.reason {
        // Only reachable if called with an allowed decision; fail closed
        DecisionReason::Allowed => AuthzError::UnknownOperation(operation_name.to_string()),
        DecisionReason::ScopeNotAllowed { scope } => AuthzError::ScopeNotAllowed {
            operation: operation_name.to_string(),
            scope: *scope,
        },
        DecisionReason::MissingPermission { permission } => {
            AuthzError::MissingPermission(*permission)
        }
        DecisionReason::InsufficientRole { role, scope } => AuthzError::InsufficientRole {
            role: *role,
            scope: *scope,
        },
        DecisionReason::UnknownOperation { name } => AuthzError::UnknownOperation(name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::InMemoryMembershipProvider;
    use crate::types::{GroupMembership, GroupRole, GroupType};

    fn engine_with_memberships() -> (AuthzEngine, Arc<InMemoryMembershipProvider>) {
        let provider = Arc::new(InMemoryMembershipProvider::new());
        let engine = AuthzEngine::new(
            Arc::new(PermissionCatalog::sacco_default()),
            OperationRegistry::with_sacco_defaults(),
            provider.clone(),
        );
        (engine, provider)
    }

    #[tokio::test]
    async fn test_load_actor_hydrates_memberships() {
        let (engine, provider) = engine_with_memberships();
        provider
            .add(
                "alice",
                GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupAdmin),
            )
            .await;

        let actor = engine.load_actor("alice", ServiceRole::Member).await.unwrap();
        assert_eq!(actor.group_memberships.len(), 1);

        let permissions = engine.resolve_permissions(&actor, &ScopeTarget::organization("org1"));
        assert!(permissions.contains(&Permission::FinanceApprove));
    }

    #[tokio::test]
    async fn test_unknown_operation_denies_fail_closed() {
        let (engine, _) = engine_with_memberships();
        let root = Actor::new("root", ServiceRole::SystemAdmin);

        let decision = engine
            .authorize(&root, "no-such-operation", &ScopeTarget::global())
            .await;
        assert!(!decision.is_allowed());

        let err = engine
            .submit(
                &root,
                "no-such-operation",
                &ScopeTarget::global(),
                &OperationPayload::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::UnknownOperation(_)));
    }

    #[tokio::test]
    async fn test_submit_denied_surfaces_typed_error() {
        let (engine, _) = engine_with_memberships();
        let member = Actor::new("alice", ServiceRole::Member);

        let err = engine
            .submit(
                &member,
                "withdraw",
                &ScopeTarget::organization("org1"),
                &OperationPayload::with_amount(1_000),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthzError::MissingPermission(Permission::FinanceWithdraw)
        ));
    }

    #[tokio::test]
    async fn test_submit_routes_gated_operation_to_pending() {
        let (engine, _) = engine_with_memberships();
        let maker = Actor::new("maker", ServiceRole::Member).with_membership(
            GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupAdmin),
        );

        // withdraw always requires approval
        let outcome = engine
            .submit(
                &maker,
                "withdraw",
                &ScopeTarget::organization("org1"),
                &OperationPayload::with_amount(1_000),
            )
            .await
            .unwrap();
        let GateOutcome::Pending { request_id } = outcome else {
            panic!("expected pending outcome");
        };
        assert_eq!(
            engine.approval_status(request_id).await.unwrap(),
            ApprovalStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_submit_executes_ungated_operation() {
        let (engine, _) = engine_with_memberships();
        let maker = Actor::new("maker", ServiceRole::Member).with_membership(
            GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupAdmin),
        );

        // transfer below the threshold executes immediately
        let outcome = engine
            .submit(
                &maker,
                "transfer",
                &ScopeTarget::organization("org1"),
                &OperationPayload::with_amount(10_000),
            )
            .await
            .unwrap();
        assert_eq!(outcome, GateOutcome::Executed);
    }

    #[tokio::test]
    async fn test_config_reload_applies_to_new_decisions_only() {
        let (engine, _) = engine_with_memberships();
        let maker = Actor::new("maker", ServiceRole::Member).with_membership(
            GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupAdmin),
        );
        let target = ScopeTarget::organization("org1");

        // Pending request created under the default quorum of 2
        let outcome = engine
            .submit(&maker, "withdraw", &target, &OperationPayload::with_amount(1))
            .await
            .unwrap();
        let GateOutcome::Pending { request_id } = outcome else {
            panic!("expected pending outcome");
        };

        // Reload with a quorum of 1
        let mut config = MakerCheckerConfig::default();
        config.approval_requirements.minimum_approvers = 1;
        engine.reload_config(config).await;

        // The in-flight request still needs two approvals
        let checker = Actor::new("checker-1", ServiceRole::Member).with_membership(
            GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupAdmin),
        );
        let status = engine.submit_approval(request_id, &checker).await.unwrap();
        assert_eq!(status, ApprovalStatus::Pending);

        // A new request created after the reload needs only one
        let outcome = engine
            .submit(&maker, "withdraw", &target, &OperationPayload::with_amount(1))
            .await
            .unwrap();
        let GateOutcome::Pending { request_id } = outcome else {
            panic!("expected pending outcome");
        };
        let status = engine.submit_approval(request_id, &checker).await.unwrap();
        assert_eq!(status, ApprovalStatus::Approved);
    }
}
