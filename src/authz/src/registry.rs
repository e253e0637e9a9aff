//! Declarative operation metadata
//!
//! Each service registers its operations once at startup; the guard and the
//! approval gate look descriptors up by name. This replaces the metadata
//! annotations the platform previously attached to handlers with plain data.

use crate::types::{AuditLevel, GroupRole, Permission, PermissionScope, RiskLevel, Role, ServiceRole};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Which configured financial threshold applies to an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialOperationKind {
    Withdrawal,
    Transfer,
    LoanApproval,
}

/// Immutable per-operation authorization metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Operation name, unique within the registry
    pub name: String,

    /// All of these are required (AND semantics)
    pub required_permissions: Vec<Permission>,

    /// Optional explicit role requirement on top of the permission check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_role: Option<Role>,

    /// Scopes the operation may run in; anything else is rejected
    pub allowed_scopes: HashSet<PermissionScope>,

    /// Always route through the approval workflow
    pub requires_approval: bool,

    /// Roles qualified to approve this operation when it is gated
    #[serde(default)]
    pub required_approver_roles: HashSet<Role>,

    /// Which financial threshold applies, for amount-based gating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_kind: Option<FinancialOperationKind>,

    pub risk_level: RiskLevel,

    pub audit_level: AuditLevel,
}

impl OperationDescriptor {
    /// A low-risk descriptor; refine with the builder methods
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_permissions: Vec::new(),
            required_role: None,
            allowed_scopes: HashSet::new(),
            requires_approval: false,
            required_approver_roles: HashSet::new(),
            financial_kind: None,
            risk_level: RiskLevel::Low,
            audit_level: AuditLevel::Basic,
        }
    }

    pub fn require_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.required_permissions.extend(permissions);
        self
    }

    pub fn require_role(mut self, role: impl Into<Role>) -> Self {
        self.required_role = Some(role.into());
        self
    }

    pub fn allow_scopes(mut self, scopes: impl IntoIterator<Item = PermissionScope>) -> Self {
        self.allowed_scopes.extend(scopes);
        self
    }

    pub fn requires_approval_by(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.requires_approval = true;
        self.required_approver_roles.extend(roles);
        self
    }

    pub fn financial(mut self, kind: FinancialOperationKind) -> Self {
        self.financial_kind = Some(kind);
        self
    }

    pub fn risk(mut self, level: RiskLevel) -> Self {
        self.risk_level = level;
        self
    }

    pub fn audit(mut self, level: AuditLevel) -> Self {
        self.audit_level = level;
        self
    }

    /// Approver roles snapshotted into an approval request
    ///
    /// A gated descriptor that names no approver roles falls back to the
    /// conservative admin set.
    pub fn approver_roles(&self) -> HashSet<Role> {
        if self.required_approver_roles.is_empty() {
            HashSet::from([
                Role::Service(ServiceRole::SystemAdmin),
                Role::Service(ServiceRole::Admin),
                Role::Group(GroupRole::GroupAdmin),
            ])
        } else {
            self.required_approver_roles.clone()
        }
    }
}

/// Registry of operation descriptors, populated at service construction
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, OperationDescriptor>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor; the last registration under a name wins
    pub fn register(&mut self, descriptor: OperationDescriptor) {
        self.operations.insert(descriptor.name.clone(), descriptor);
    }

    /// Look up a descriptor by operation name
    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.get(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The operation set used by the SACCO services
    pub fn with_sacco_defaults() -> Self {
        use FinancialOperationKind::*;
        use Permission::*;
        use PermissionScope::*;

        let mut registry = Self::new();

        registry.register(
            OperationDescriptor::new("viewBalance")
                .require_permissions([FinanceRead])
                .allow_scopes([Global, Organization, Chama, Personal]),
        );
        registry.register(
            OperationDescriptor::new("deposit")
                .require_permissions([FinanceDeposit])
                .allow_scopes([Organization, Chama, Personal])
                .risk(RiskLevel::Medium)
                .audit(AuditLevel::Detailed),
        );
        registry.register(
            OperationDescriptor::new("withdraw")
                .require_permissions([FinanceWithdraw])
                .allow_scopes([Organization, Chama])
                .requires_approval_by([
                    Role::Group(GroupRole::GroupAdmin),
                    Role::Service(ServiceRole::Admin),
                ])
                .financial(Withdrawal)
                .risk(RiskLevel::High)
                .audit(AuditLevel::Comprehensive),
        );
        registry.register(
            OperationDescriptor::new("transfer")
                .require_permissions([FinanceTransfer])
                .allow_scopes([Organization, Chama])
                .financial(Transfer)
                .risk(RiskLevel::High)
                .audit(AuditLevel::Comprehensive),
        );
        registry.register(
            OperationDescriptor::new("viewLoans")
                .require_permissions([LoanRead])
                .allow_scopes([Global, Organization, Chama, Personal]),
        );
        registry.register(
            OperationDescriptor::new("applyLoan")
                .require_permissions([LoanApply])
                .allow_scopes([Organization, Chama, Personal])
                .requires_approval_by([
                    Role::Group(GroupRole::GroupAdmin),
                    Role::Service(ServiceRole::Admin),
                ])
                .risk(RiskLevel::Medium)
                .audit(AuditLevel::Detailed),
        );
        registry.register(
            OperationDescriptor::new("approveLoan")
                .require_permissions([LoanApprove])
                .allow_scopes([Organization, Chama])
                .financial(LoanApproval)
                .risk(RiskLevel::High)
                .audit(AuditLevel::Comprehensive),
        );
        registry.register(
            OperationDescriptor::new("disburseLoan")
                .require_permissions([LoanDisburse])
                .allow_scopes([Organization])
                .require_role(GroupRole::GroupAdmin)
                .risk(RiskLevel::High)
                .audit(AuditLevel::Comprehensive),
        );
        registry.register(
            OperationDescriptor::new("repayLoan")
                .require_permissions([FinanceDeposit])
                .allow_scopes([Organization, Chama, Personal])
                .risk(RiskLevel::Medium)
                .audit(AuditLevel::Detailed),
        );
        registry.register(
            OperationDescriptor::new("tradeShares")
                .require_permissions([SharesRead, SharesTrade])
                .allow_scopes([Organization, Chama, Personal])
                .risk(RiskLevel::Medium)
                .audit(AuditLevel::Detailed),
        );

        registry
    }
}
