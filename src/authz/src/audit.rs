//! Advisory audit records for authorization decisions
//!
//! Auditing is a side effect of an allow/deny outcome, never part of the
//! decision itself. The default sink emits structured tracing events; a
//! durable backend can implement `AuditSink` instead.

use crate::guard::AuthDecision;
use crate::types::AuditLevel;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One audit record per authorization decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub decision: AuthDecision,
    pub audit_level: AuditLevel,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(decision: AuthDecision, audit_level: AuditLevel) -> Self {
        Self {
            decision,
            audit_level,
            recorded_at: Utc::now(),
        }
    }
}

/// Destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}

/// Default sink: structured tracing events, level chosen by audit level
/// and outcome
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) {
        let decision = &entry.decision;
        if !decision.allowed {
            warn!(
                operation = %decision.operation,
                actor = %decision.actor_id,
                scope = %decision.scope,
                reason = %decision.reason,
                "authorization denied"
            );
            return;
        }

        match entry.audit_level {
            AuditLevel::Basic => debug!(
                operation = %decision.operation,
                actor = %decision.actor_id,
                scope = %decision.scope,
                "authorization allowed"
            ),
            AuditLevel::Detailed | AuditLevel::Comprehensive => info!(
                operation = %decision.operation,
                actor = %decision.actor_id,
                scope = %decision.scope,
                permissions = decision.effective_permissions.len(),
                "authorization allowed"
            ),
        }
    }
}
