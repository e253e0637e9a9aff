//! Context-aware authorization for the SACCO platform
//!
//! Authorization decisions here depend on *where* an operation happens,
//! not just *who* performs it: an actor's effective permissions are the
//! union of their service-role baseline and whatever their active
//! memberships grant in the organization or chama the request targets.
//! High-risk operations additionally pass through a maker-checker gate
//! before execution.
//!
//! The pipeline, front to back:
//!
//! - [`scope`] resolves the active scope from the request target
//! - [`catalog`] holds the role→permission matrix and role hierarchy
//! - [`resolver`] computes effective permission sets per actor and scope
//! - [`registry`] declares per-operation authorization metadata
//! - [`guard`] runs the ordered, fail-closed checks
//! - [`approval`] withholds gated operations until quorum approval
//! - [`audit`] records every decision as a side effect
//! - [`engine`] ties it all together behind one facade
//!
//! ```no_run
//! use sacco_authz::{AuthzEngine, OperationRegistry, PermissionCatalog, ScopeTarget};
//! use sacco_authz::resolver::InMemoryMembershipProvider;
//! use sacco_authz::types::{Actor, ServiceRole};
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let engine = AuthzEngine::new(
//!     Arc::new(PermissionCatalog::sacco_default()),
//!     OperationRegistry::with_sacco_defaults(),
//!     Arc::new(InMemoryMembershipProvider::new()),
//! );
//!
//! let actor = Actor::new("member-001", ServiceRole::Member);
//! let decision = engine
//!     .authorize(&actor, "viewBalance", &ScopeTarget::organization("org1"))
//!     .await;
//! # }
//! ```

pub mod approval;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod types;

pub use approval::{
    ApprovalGate, ApprovalRequest, ApprovalStatus, ApprovalStore, GateOutcome,
    InMemoryApprovalStore, OperationPayload,
};
pub use audit::{AuditEntry, AuditSink, TracingAuditSink};
pub use catalog::{CatalogBuilder, PermissionCatalog};
pub use config::MakerCheckerConfig;
pub use engine::AuthzEngine;
pub use error::{AuthzError, Result};
pub use guard::{AuthDecision, AuthorizationGuard, DecisionReason};
pub use registry::{FinancialOperationKind, OperationDescriptor, OperationRegistry};
pub use resolver::{MembershipProvider, PermissionResolver};
pub use scope::{resolve_scope, ScopeTarget};
pub use types::{
    Actor, AuditLevel, GroupMembership, GroupRole, GroupType, Permission, PermissionScope,
    RiskLevel, Role, ServiceRole,
};
