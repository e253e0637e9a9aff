//! Authorization enforcement point
//!
//! Checks run in a fixed order and the first failure wins: scope, then
//! permissions (AND semantics), then the optional explicit role. Every
//! denial is terminal and carries a typed reason; an operation is wholly
//! allowed or wholly denied, never partially.

use crate::registry::OperationDescriptor;
use crate::resolver::PermissionResolver;
use crate::scope::ScopeTarget;
use crate::types::{Actor, Permission, PermissionScope, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

/// Why a request was allowed or denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionReason {
    /// All checks passed
    Allowed,

    /// Resolved scope is not in the operation's allowed set
    ScopeNotAllowed { scope: PermissionScope },

    /// First required permission absent from the effective set
    MissingPermission { permission: Permission },

    /// Required role not held in the relevant scope
    InsufficientRole { role: Role, scope: PermissionScope },

    /// No descriptor registered under the requested name (fail closed)
    UnknownOperation { name: String },
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::ScopeNotAllowed { scope } => write!(f, "scope_not_allowed: {}", scope),
            Self::MissingPermission { permission } => {
                write!(f, "missing_permission: {}", permission)
            }
            Self::InsufficientRole { role, scope } => {
                write!(f, "insufficient_role: {} in {}", role, scope)
            }
            Self::UnknownOperation { name } => write!(f, "unknown_operation: {}", name),
        }
    }
}

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthDecision {
    /// Unique decision identifier
    pub id: Uuid,

    /// Operation the decision is about
    pub operation: String,

    /// Actor the decision is about
    pub actor_id: String,

    /// Scope the decision was made in
    pub scope: PermissionScope,

    pub allowed: bool,

    pub reason: DecisionReason,

    /// Effective permissions at decision time (empty on early denials)
    #[serde(default)]
    pub effective_permissions: HashSet<Permission>,
}

impl AuthDecision {
    fn new(
        operation: &str,
        actor_id: &str,
        scope: PermissionScope,
        reason: DecisionReason,
        effective_permissions: HashSet<Permission>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation: operation.to_string(),
            actor_id: actor_id.to_string(),
            scope,
            allowed: reason == DecisionReason::Allowed,
            reason,
            effective_permissions,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// The enforcement point; fails closed on every check
#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    resolver: PermissionResolver,
}

impl AuthorizationGuard {
    pub fn new(resolver: PermissionResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Check an operation descriptor against an actor in a resolved scope
    ///
    /// Order: scope check, effective permission resolution, AND permission
    /// check (first missing permission named), optional explicit role check.
    /// Group-level role requirements can never be satisfied in global scope.
    pub fn authorize(
        &self,
        actor: &Actor,
        operation: &OperationDescriptor,
        scope: PermissionScope,
        target: &ScopeTarget,
    ) -> AuthDecision {
        if !operation.allowed_scopes.contains(&scope) {
            debug!(operation = %operation.name, %scope, "scope not allowed");
            return AuthDecision::new(
                &operation.name,
                &actor.id,
                scope,
                DecisionReason::ScopeNotAllowed { scope },
                HashSet::new(),
            );
        }

        let target_id = target.id_for(scope);
        let effective = self.resolver.resolve(actor, scope, target_id);

        for permission in &operation.required_permissions {
            if !effective.contains(permission) {
                debug!(
                    operation = %operation.name,
                    actor = %actor.id,
                    %permission,
                    "missing required permission"
                );
                return AuthDecision::new(
                    &operation.name,
                    &actor.id,
                    scope,
                    DecisionReason::MissingPermission {
                        permission: *permission,
                    },
                    effective,
                );
            }
        }

        if let Some(required_role) = operation.required_role {
            if !self.resolver.holds_role(actor, required_role, scope, target_id) {
                debug!(
                    operation = %operation.name,
                    actor = %actor.id,
                    role = %required_role,
                    "required role not held"
                );
                return AuthDecision::new(
                    &operation.name,
                    &actor.id,
                    scope,
                    DecisionReason::InsufficientRole {
                        role: required_role,
                        scope,
                    },
                    effective,
                );
            }
        }

        AuthDecision::new(
            &operation.name,
            &actor.id,
            scope,
            DecisionReason::Allowed,
            effective,
        )
    }

    /// Denial for a name with no registered descriptor
    ///
    /// Unknown operations deny rather than error so a registry gap can
    /// never grant access.
    pub fn deny_unknown_operation(
        &self,
        actor: &Actor,
        name: &str,
        scope: PermissionScope,
    ) -> AuthDecision {
        AuthDecision::new(
            name,
            &actor.id,
            scope,
            DecisionReason::UnknownOperation {
                name: name.to_string(),
            },
            HashSet::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PermissionCatalog;
    use crate::registry::OperationDescriptor;
    use crate::types::{GroupMembership, GroupRole, GroupType, ServiceRole};
    use std::sync::Arc;

    fn guard() -> AuthorizationGuard {
        AuthorizationGuard::new(PermissionResolver::new(Arc::new(
            PermissionCatalog::sacco_default(),
        )))
    }

    fn withdraw_op() -> OperationDescriptor {
        OperationDescriptor::new("withdraw")
            .require_permissions([Permission::FinanceWithdraw])
            .allow_scopes([PermissionScope::Organization, PermissionScope::Chama])
    }

    #[test]
    fn test_scope_check_first() {
        let actor = Actor::new("alice", ServiceRole::SystemAdmin);
        let decision = guard().authorize(
            &actor,
            &withdraw_op(),
            PermissionScope::Global,
            &ScopeTarget::global(),
        );

        assert!(!decision.is_allowed());
        assert_eq!(
            decision.reason,
            DecisionReason::ScopeNotAllowed {
                scope: PermissionScope::Global
            }
        );
    }

    #[test]
    fn test_member_without_membership_denied() {
        let actor = Actor::new("alice", ServiceRole::Member);
        let decision = guard().authorize(
            &actor,
            &withdraw_op(),
            PermissionScope::Organization,
            &ScopeTarget::organization("org1"),
        );

        assert!(!decision.is_allowed());
        assert_eq!(
            decision.reason,
            DecisionReason::MissingPermission {
                permission: Permission::FinanceWithdraw
            }
        );
        assert_eq!(decision.reason.to_string(), "missing_permission: finance:withdraw");
    }

    #[test]
    fn test_group_admin_allowed() {
        let actor = Actor::new("alice", ServiceRole::Member).with_membership(
            GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupAdmin),
        );
        let decision = guard().authorize(
            &actor,
            &withdraw_op(),
            PermissionScope::Organization,
            &ScopeTarget::organization("org1"),
        );

        assert!(decision.is_allowed());
        assert!(decision
            .effective_permissions
            .contains(&Permission::FinanceWithdraw));
    }

    #[test]
    fn test_and_semantics_partial_satisfaction_denies() {
        // group_member has finance:read but not finance:withdraw
        let actor = Actor::new("alice", ServiceRole::Member).with_membership(
            GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupMember),
        );
        let operation = OperationDescriptor::new("audit-finances")
            .require_permissions([Permission::FinanceRead, Permission::FinanceWithdraw])
            .allow_scopes([PermissionScope::Organization]);

        let decision = guard().authorize(
            &actor,
            &operation,
            PermissionScope::Organization,
            &ScopeTarget::organization("org1"),
        );

        assert!(!decision.is_allowed());
        assert_eq!(
            decision.reason,
            DecisionReason::MissingPermission {
                permission: Permission::FinanceWithdraw
            }
        );
    }

    #[test]
    fn test_required_group_role_via_hierarchy() {
        let actor = Actor::new("alice", ServiceRole::Member).with_membership(
            GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupAdmin),
        );
        let operation = OperationDescriptor::new("view-reports")
            .require_permissions([Permission::ReportsRead])
            .require_role(GroupRole::GroupViewer)
            .allow_scopes([PermissionScope::Organization]);

        let decision = guard().authorize(
            &actor,
            &operation,
            PermissionScope::Organization,
            &ScopeTarget::organization("org1"),
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_group_role_never_satisfied_globally() {
        let actor = Actor::new("alice", ServiceRole::SystemAdmin).with_membership(
            GroupMembership::new("org1", GroupType::Organization, GroupRole::GroupAdmin),
        );
        let operation = OperationDescriptor::new("moderate")
            .require_role(GroupRole::GroupAdmin)
            .allow_scopes([PermissionScope::Global]);

        let decision = guard().authorize(
            &actor,
            &operation,
            PermissionScope::Global,
            &ScopeTarget::global(),
        );

        assert!(!decision.is_allowed());
        assert!(matches!(
            decision.reason,
            DecisionReason::InsufficientRole { .. }
        ));
    }

    #[test]
    fn test_service_role_requirement_uses_hierarchy() {
        let actor = Actor::new("root", ServiceRole::SystemAdmin);
        let operation = OperationDescriptor::new("manage-members")
            .require_role(ServiceRole::Admin)
            .allow_scopes([PermissionScope::Global]);

        let decision = guard().authorize(
            &actor,
            &operation,
            PermissionScope::Global,
            &ScopeTarget::global(),
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_unknown_operation_denies() {
        let actor = Actor::new("alice", ServiceRole::SystemAdmin);
        let decision =
            guard().deny_unknown_operation(&actor, "no-such-op", PermissionScope::Global);

        assert!(!decision.is_allowed());
        assert_eq!(
            decision.reason,
            DecisionReason::UnknownOperation {
                name: "no-such-op".to_string()
            }
        );
    }
}
