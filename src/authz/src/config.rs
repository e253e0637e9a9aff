//! Maker-checker configuration
//!
//! Read-only at decision time. The engine snapshots the configuration once
//! per gating decision so a hot reload never drifts a request mid-flight;
//! approval requests additionally snapshot the approver roles and quorum
//! they were created under.

use crate::registry::FinancialOperationKind;
use serde::{Deserialize, Serialize};

/// Amounts above which financial operations require approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialThresholds {
    /// Amount above which a withdrawal requires approval
    pub withdrawal_limit: u64,
    /// Amount above which a transfer requires approval
    pub transfer_limit: u64,
    /// Loan amount requiring multiple approvals
    pub loan_approval_limit: u64,
}

/// Administrative operation thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminThresholds {
    /// Number of invites requiring approval
    pub member_invite_limit: u32,
    /// Whether organization settings changes need approval
    pub organization_settings_change: bool,
    /// Number of chamas that can be created without approval
    pub chama_creation_limit: u32,
}

/// Approval workflow requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequirements {
    /// Minimum number of distinct qualified approvers (quorum)
    pub minimum_approvers: usize,
    /// Whether approvers must hold the same or a higher role level
    pub same_level_approval: bool,
    /// Hours before an approval request expires
    pub timeout_hours: i64,
    /// Whether the initiator may approve their own request
    pub allow_self_approval: bool,
}

/// Configuration for the maker-checker approval workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakerCheckerConfig {
    pub financial_thresholds: FinancialThresholds,
    pub admin_thresholds: AdminThresholds,
    pub approval_requirements: ApprovalRequirements,
}

impl MakerCheckerConfig {
    /// The threshold that applies to a financial operation kind
    pub fn threshold_for(&self, kind: FinancialOperationKind) -> u64 {
        match kind {
            FinancialOperationKind::Withdrawal => self.financial_thresholds.withdrawal_limit,
            FinancialOperationKind::Transfer => self.financial_thresholds.transfer_limit,
            FinancialOperationKind::LoanApproval => self.financial_thresholds.loan_approval_limit,
        }
    }
}

impl Default for MakerCheckerConfig {
    /// Conservative defaults for financial oversight (amounts in KES)
    fn default() -> Self {
        Self {
            financial_thresholds: FinancialThresholds {
                withdrawal_limit: 100_000,
                transfer_limit: 50_000,
                loan_approval_limit: 500_000,
            },
            admin_thresholds: AdminThresholds {
                member_invite_limit: 5,
                organization_settings_change: true,
                chama_creation_limit: 2,
            },
            approval_requirements: ApprovalRequirements {
                minimum_approvers: 2,
                same_level_approval: true,
                timeout_hours: 24,
                allow_self_approval: false,
            },
        }
    }
}
