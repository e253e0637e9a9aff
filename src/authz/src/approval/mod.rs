//! Risk/approval gate (maker-checker)
//!
//! High-risk operations and financial operations above their configured
//! threshold do not execute immediately: the gate records a pending
//! approval request and releases execution only once quorum approvals from
//! qualified approvers arrive inside the timeout window. A single qualified
//! rejection vetoes the operation outright.
//!
//! All settlement paths go through the store's compare-and-swap, so exactly
//! one caller observes the transition out of `Pending`; racers re-read and
//! find the terminal state.

pub mod store;
pub mod types;

pub use store::{ApprovalStore, InMemoryApprovalStore};
pub use types::{ApprovalRequest, ApprovalStatus, GateOutcome, OperationPayload};

use crate::config::MakerCheckerConfig;
use crate::error::{AuthzError, Result};
use crate::registry::OperationDescriptor;
use crate::resolver::PermissionResolver;
use crate::scope::ScopeTarget;
use crate::types::{Actor, PermissionScope};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// The maker-checker enforcement point
pub struct ApprovalGate {
    resolver: PermissionResolver,
    store: Arc<dyn ApprovalStore>,
}

impl ApprovalGate {
    pub fn new(resolver: PermissionResolver, store: Arc<dyn ApprovalStore>) -> Self {
        Self { resolver, store }
    }

    /// Whether an operation must be routed through the approval workflow
    ///
    /// Either the descriptor demands approval unconditionally, or it is a
    /// financial operation whose amount exceeds the configured threshold
    /// for its kind.
    pub fn requires_gating(
        &self,
        operation: &OperationDescriptor,
        config: &MakerCheckerConfig,
        payload: &OperationPayload,
    ) -> bool {
        if operation.requires_approval {
            return true;
        }

        match (operation.financial_kind, payload.amount) {
            (Some(kind), Some(amount)) => amount > config.threshold_for(kind),
            _ => false,
        }
    }

    /// Route an already-authorized operation through the gate
    ///
    /// Returns `Executed` when no approval is needed; otherwise records a
    /// pending request snapshotting the approver roles, quorum, timeout and
    /// self-approval flag in force right now.
    pub async fn submit_if_required(
        &self,
        operation: &OperationDescriptor,
        actor: &Actor,
        scope: PermissionScope,
        target: &ScopeTarget,
        payload: &OperationPayload,
        config: &MakerCheckerConfig,
    ) -> Result<GateOutcome> {
        if !self.requires_gating(operation, config, payload) {
            return Ok(GateOutcome::Executed);
        }

        let request = ApprovalRequest::new(
            operation.name.clone(),
            actor.id.clone(),
            scope,
            target.clone(),
            operation.approver_roles(),
            config.approval_requirements.minimum_approvers,
            config.approval_requirements.allow_self_approval,
            config.approval_requirements.timeout_hours,
        );
        let request_id = request.id;

        self.store.insert(request).await?;

        info!(
            operation = %operation.name,
            initiator = %actor.id,
            request = %request_id,
            "operation withheld pending approval"
        );

        Ok(GateOutcome::Pending { request_id })
    }

    /// Record one approval; settles the request when quorum is reached
    ///
    /// The caller whose submission completes quorum receives `Approved`;
    /// that return value is the exactly-once release signal for executing
    /// the withheld operation. Everyone arriving later gets
    /// `ApprovalNotPending`.
    pub async fn submit_approval(
        &self,
        request_id: Uuid,
        approver: &Actor,
    ) -> Result<ApprovalStatus> {
        loop {
            let request = self.checked_pending(request_id).await?;

            if !self.approver_qualifies(approver, &request) {
                return Err(AuthzError::UnauthorizedApprover(approver.id.clone()));
            }
            if !request.allow_self_approval && approver.id == request.initiator_id {
                return Err(AuthzError::SelfApprovalForbidden(request_id));
            }
            if request.approvals.contains(&approver.id) {
                return Err(AuthzError::DuplicateApproval(approver.id.clone()));
            }

            let mut updated = request;
            updated.approvals.insert(approver.id.clone());
            if updated.quorum_reached() {
                updated.status = ApprovalStatus::Approved;
            }

            let settled = updated.status;
            if self.store.update(updated).await? {
                if settled == ApprovalStatus::Approved {
                    info!(
                        request = %request_id,
                        approver = %approver.id,
                        "quorum reached, operation released"
                    );
                } else {
                    debug!(
                        request = %request_id,
                        approver = %approver.id,
                        "approval recorded, quorum not yet reached"
                    );
                }
                return Ok(settled);
            }
            // Version conflict: another approver got there first, re-read
        }
    }

    /// Record a rejection; a single qualified veto settles the request
    pub async fn submit_rejection(
        &self,
        request_id: Uuid,
        approver: &Actor,
    ) -> Result<ApprovalStatus> {
        loop {
            let request = self.checked_pending(request_id).await?;

            if !self.approver_qualifies(approver, &request) {
                return Err(AuthzError::UnauthorizedApprover(approver.id.clone()));
            }
            // An initiator veto would amount to cancellation, which this
            // workflow does not have
            if !request.allow_self_approval && approver.id == request.initiator_id {
                return Err(AuthzError::SelfApprovalForbidden(request_id));
            }

            let mut updated = request;
            updated.status = ApprovalStatus::Rejected;

            if self.store.update(updated).await? {
                info!(
                    request = %request_id,
                    approver = %approver.id,
                    "request rejected by qualified approver"
                );
                return Ok(ApprovalStatus::Rejected);
            }
        }
    }

    /// Current status of a request, applying lazy expiry
    pub async fn status(&self, request_id: Uuid) -> Result<ApprovalStatus> {
        match self.checked_pending(request_id).await {
            Ok(request) => Ok(request.status),
            Err(AuthzError::ApprovalNotPending(_)) => {
                let request = self
                    .store
                    .get(request_id)
                    .await?
                    .ok_or(AuthzError::ApprovalNotFound(request_id))?;
                Ok(request.status)
            }
            Err(AuthzError::ApprovalExpired(_)) => Ok(ApprovalStatus::Expired),
            Err(other) => Err(other),
        }
    }

    /// Sweep all pending requests past their expiry; returns how many
    /// transitioned
    pub async fn expire_overdue(&self) -> Result<usize> {
        let now = Utc::now();
        let mut expired = 0usize;

        for request in self.store.list_pending().await? {
            if !request.is_expired_at(now) {
                continue;
            }
            let mut updated = request;
            updated.status = ApprovalStatus::Expired;
            if self.store.update(updated).await? {
                expired += 1;
            }
            // A conflicting writer either settled or expired it already
        }

        if expired > 0 {
            info!(count = expired, "expired overdue approval requests");
        }
        Ok(expired)
    }

    /// Fetch a request and enforce the pending/expiry preconditions
    ///
    /// A request past its window is transitioned to `Expired` on this read
    /// (lazy expiry) and reported as `ApprovalExpired`.
    async fn checked_pending(&self, request_id: Uuid) -> Result<ApprovalRequest> {
        loop {
            let request = self
                .store
                .get(request_id)
                .await?
                .ok_or(AuthzError::ApprovalNotFound(request_id))?;

            if request.status == ApprovalStatus::Expired {
                return Err(AuthzError::ApprovalExpired(request_id));
            }
            if request.status.is_terminal() {
                return Err(AuthzError::ApprovalNotPending(request_id));
            }

            if request.is_expired_at(Utc::now()) {
                let mut expired = request;
                expired.status = ApprovalStatus::Expired;
                if self.store.update(expired).await? {
                    return Err(AuthzError::ApprovalExpired(request_id));
                }
                // Lost a race while expiring, re-read
                continue;
            }

            return Ok(request);
        }
    }

    /// Whether the approver's resolved role (service or in-scope group
    /// role, including hierarchy) is in the request's snapshotted set
    fn approver_qualifies(&self, approver: &Actor, request: &ApprovalRequest) -> bool {
        let target_id = request.target.id_for(request.target_scope);
        request.required_approver_roles.iter().any(|role| {
            self.resolver
                .holds_role(approver, *role, request.target_scope, target_id)
        })
    }
}
