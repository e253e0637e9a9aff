//! Approval request state machine types
//!
//! `Pending → {Approved, Rejected, Expired}`; all three are terminal and a
//! terminal request accepts no further submissions.

use crate::scope::ScopeTarget;
use crate::types::{PermissionScope, Role};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// Lifecycle state of an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

/// Payload of the operation being gated
///
/// Only the financial amount participates in gating; `details` travels
/// opaquely with the request for the executing caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationPayload {
    /// Financial amount, for threshold comparison
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,

    /// Opaque operation data
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl OperationPayload {
    pub fn with_amount(amount: u64) -> Self {
        Self {
            amount: Some(amount),
            details: serde_json::Value::Null,
        }
    }
}

/// A pending (or settled) maker-checker request
///
/// Approver roles, quorum, and the self-approval flag are snapshotted from
/// the configuration in force when the request was created; a later config
/// reload never changes an in-flight request. `version` supports
/// compare-and-swap updates in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,

    pub operation_name: String,

    /// The maker: who initiated the gated operation
    pub initiator_id: String,

    /// Scope the operation was requested in
    pub target_scope: PermissionScope,

    /// Concrete group target, so approver roles can be checked in-scope
    pub target: ScopeTarget,

    /// Roles qualified to approve, snapshotted at creation
    pub required_approver_roles: HashSet<Role>,

    /// Quorum, snapshotted at creation
    pub minimum_approvers: usize,

    /// Whether the initiator may approve, snapshotted at creation
    pub allow_self_approval: bool,

    /// Distinct approver ids recorded so far
    #[serde(default)]
    pub approvals: BTreeSet<String>,

    pub status: ApprovalStatus,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Optimistic-concurrency version, bumped by the store on every update
    #[serde(default)]
    pub version: u64,
}

impl ApprovalRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        operation_name: impl Into<String>,
        initiator_id: impl Into<String>,
        target_scope: PermissionScope,
        target: ScopeTarget,
        required_approver_roles: HashSet<Role>,
        minimum_approvers: usize,
        allow_self_approval: bool,
        timeout_hours: i64,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            operation_name: operation_name.into(),
            initiator_id: initiator_id.into(),
            target_scope,
            target,
            required_approver_roles,
            minimum_approvers,
            allow_self_approval,
            approvals: BTreeSet::new(),
            status: ApprovalStatus::Pending,
            created_at,
            expires_at: created_at + Duration::hours(timeout_hours),
            version: 0,
        }
    }

    /// Whether the approval window has elapsed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the recorded approvals reach quorum
    pub fn quorum_reached(&self) -> bool {
        self.approvals.len() >= self.minimum_approvers
    }
}

/// Outcome of routing an operation through the risk gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    /// No approval required; the caller may execute immediately
    Executed,

    /// A pending approval request was created; execution is withheld
    Pending { request_id: Uuid },
}
