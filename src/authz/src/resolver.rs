//! Effective permission resolution
//!
//! Computes "what can this actor do, right now, in this scope" by unioning
//! the service-role baseline with the permissions of scope-relevant group
//! memberships: direct role grants, hierarchy-inherited grants, and custom
//! grants. Union semantics throughout; a permission reachable via any path
//! is present, and no source takes precedence over another.

use crate::catalog::PermissionCatalog;
use crate::error::Result;
use crate::types::{Actor, GroupMembership, Permission, PermissionScope, Role};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Resolves effective permission sets against an immutable catalog
///
/// Pure in-memory computation; never blocks. Share with `Arc`.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    catalog: Arc<PermissionCatalog>,
}

impl PermissionResolver {
    pub fn new(catalog: Arc<PermissionCatalog>) -> Self {
        Self { catalog }
    }

    /// The catalog this resolver reads from
    pub fn catalog(&self) -> &Arc<PermissionCatalog> {
        &self.catalog
    }

    /// Compute the effective permission set for an actor in a resolved scope
    ///
    /// The service role is a floor, not an override: its permissions are
    /// always included regardless of scope. Global and personal scopes never
    /// consult group memberships. Inactive memberships, mismatched group
    /// types, and memberships for other groups contribute nothing.
    pub fn resolve(
        &self,
        actor: &Actor,
        scope: PermissionScope,
        target_id: Option<&str>,
    ) -> HashSet<Permission> {
        let mut permissions = self
            .catalog
            .permissions_for(Role::Service(actor.service_role));

        if matches!(scope, PermissionScope::Global | PermissionScope::Personal) {
            return permissions;
        }

        let Some(target_id) = target_id else {
            // Group scope without a target group: baseline only
            return permissions;
        };

        for membership in &actor.group_memberships {
            if !membership.is_relevant(scope, target_id) {
                continue;
            }

            let role = Role::Group(membership.role);
            permissions.extend(self.catalog.permissions_for(role));
            for inherited in self.catalog.inherited_closure(role).iter() {
                permissions.extend(self.catalog.permissions_for(*inherited));
            }
            // Custom grants are additive only, never subtracted
            permissions.extend(membership.custom_permissions.iter().copied());
        }

        debug!(
            actor = %actor.id,
            %scope,
            target = %target_id,
            count = permissions.len(),
            "resolved effective permissions"
        );

        permissions
    }

    /// Whether the actor holds `required` (directly or via hierarchy) in a
    /// way that is relevant to the given scope
    ///
    /// Service-level requirements are checked against the actor's service
    /// role. Group-level requirements need an active membership in the
    /// target group; global scope can never satisfy them.
    pub fn holds_role(
        &self,
        actor: &Actor,
        required: Role,
        scope: PermissionScope,
        target_id: Option<&str>,
    ) -> bool {
        if required.is_service() {
            return self
                .catalog
                .role_satisfies(Role::Service(actor.service_role), required);
        }

        let Some(target_id) = target_id else {
            return false;
        };
        if matches!(scope, PermissionScope::Global | PermissionScope::Personal) {
            return false;
        }

        actor.group_memberships.iter().any(|membership| {
            membership.is_relevant(scope, target_id)
                && self
                    .catalog
                    .role_satisfies(Role::Group(membership.role), required)
        })
    }
}

/// External membership store seam
///
/// Must reflect membership state as of the start of the current request;
/// the engine reads one snapshot per authorization decision.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    /// Current memberships for an actor (active and inactive)
    async fn memberships_for(&self, actor_id: &str) -> Result<Vec<GroupMembership>>;
}

/// In-memory membership provider for tests and embedded use
pub struct InMemoryMembershipProvider {
    memberships: Arc<RwLock<HashMap<String, Vec<GroupMembership>>>>,
}

impl InMemoryMembershipProvider {
    pub fn new() -> Self {
        Self {
            memberships: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Record a membership for an actor
    pub async fn add(&self, actor_id: impl Into<String>, membership: GroupMembership) {
        let mut map = self.memberships.write().await;
        map.entry(actor_id.into()).or_default().push(membership);
    }

    /// Soft-delete: deactivate a membership, preserving history
    pub async fn deactivate(&self, actor_id: &str, group_id: &str) {
        let mut map = self.memberships.write().await;
        if let Some(list) = map.get_mut(actor_id) {
            for membership in list.iter_mut().filter(|m| m.group_id == group_id) {
                membership.is_active = false;
            }
        }
    }
}

impl Default for InMemoryMembershipProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipProvider for InMemoryMembershipProvider {
    async fn memberships_for(&self, actor_id: &str) -> Result<Vec<GroupMembership>> {
        let map = self.memberships.read().await;
        Ok(map.get(actor_id).cloned().unwrap_or_default())
    }
}
