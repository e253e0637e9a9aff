//! Approval request persistence seam
//!
//! Updates go through a versioned compare-and-swap so two approvers
//! settling the same request concurrently cannot lose an update or release
//! the gated operation twice. A real backend maps this onto its own
//! conditional-update primitive; the in-memory store serializes on a lock.

use super::types::ApprovalRequest;
use crate::error::{AuthzError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Persistence adapter for approval requests
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Fetch a request by id
    async fn get(&self, id: Uuid) -> Result<Option<ApprovalRequest>>;

    /// Store a new request
    ///
    /// Fails if a request with the same id already exists.
    async fn insert(&self, request: ApprovalRequest) -> Result<()>;

    /// Compare-and-swap update
    ///
    /// `request.version` must equal the stored version; on success the
    /// request is stored with the version bumped and `true` is returned.
    /// Returns `false` on a version conflict, in which case the caller
    /// re-reads and retries (or observes a terminal state).
    async fn update(&self, request: ApprovalRequest) -> Result<bool>;

    /// All requests currently in a pending state
    async fn list_pending(&self) -> Result<Vec<ApprovalRequest>>;
}

/// In-memory approval store for tests and embedded use
pub struct InMemoryApprovalStore {
    requests: Arc<RwLock<HashMap<Uuid, ApprovalRequest>>>,
}

impl InMemoryApprovalStore {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryApprovalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApprovalStore for InMemoryApprovalStore {
    async fn get(&self, id: Uuid) -> Result<Option<ApprovalRequest>> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id).cloned())
    }

    async fn insert(&self, request: ApprovalRequest) -> Result<()> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(AuthzError::Store(format!(
                "approval request {} already exists",
                request.id
            )));
        }
        requests.insert(request.id, request);
        Ok(())
    }

    async fn update(&self, mut request: ApprovalRequest) -> Result<bool> {
        let mut requests = self.requests.write().await;
        match requests.get(&request.id) {
            None => Err(AuthzError::ApprovalNotFound(request.id)),
            Some(stored) if stored.version != request.version => Ok(false),
            Some(_) => {
                request.version += 1;
                requests.insert(request.id, request);
                Ok(true)
            }
        }
    }

    async fn list_pending(&self) -> Result<Vec<ApprovalRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| !r.status.is_terminal())
            .cloned()
            .collect())
    }
}
