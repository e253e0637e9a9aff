//! Error types for the authorization engine

use crate::types::{Permission, PermissionScope, Role};
use thiserror::Error;
use uuid::Uuid;

/// Authorization engine errors
///
/// All variants are terminal and reported; nothing is retried internally.
/// Misconfiguration (unknown roles, unknown operations) denies rather than
/// erroring so a missing table entry can never widen access.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// No authenticated actor on the request
    ///
    /// Never produced by the engine itself, which operates on an already
    /// authenticated [`Actor`](crate::types::Actor); the calling layer
    /// raises it when a request arrives without one, so the full
    /// authorization taxonomy lives in one type.
    #[error("Authentication required")]
    Unauthenticated,

    /// Operation not allowed in the resolved scope
    #[error("Scope {scope} not allowed for operation '{operation}'")]
    ScopeNotAllowed {
        operation: String,
        scope: PermissionScope,
    },

    /// A required permission is missing from the effective set
    #[error("Missing permission: {0}")]
    MissingPermission(Permission),

    /// Required role not held in the relevant scope
    #[error("Insufficient role: {role} required for {scope} scope")]
    InsufficientRole { role: Role, scope: PermissionScope },

    /// No descriptor registered under this operation name
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Approval request does not exist
    #[error("Approval request not found: {0}")]
    ApprovalNotFound(Uuid),

    /// Approval request already reached a terminal state
    #[error("Approval request {0} is not pending")]
    ApprovalNotPending(Uuid),

    /// Approver's resolved role is not in the required approver set
    #[error("Approver '{0}' is not authorized to approve this request")]
    UnauthorizedApprover(String),

    /// Initiator tried to approve their own request
    #[error("Self-approval is not permitted for request {0}")]
    SelfApprovalForbidden(Uuid),

    /// Approver already approved this request
    #[error("Approver '{0}' has already approved this request")]
    DuplicateApproval(String),

    /// Approval window elapsed before quorum
    #[error("Approval request {0} has expired")]
    ApprovalExpired(Uuid),

    /// Catalog failed DAG validation at load
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Opaque collaborator failure, passed through unchanged
    #[error("Store error: {0}")]
    Store(String),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
