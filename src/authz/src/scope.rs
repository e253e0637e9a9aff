//! Scope resolution for inbound requests
//!
//! A request targets at most one organization and/or chama. Resolution is a
//! pure function with fixed precedence: chama over organization over global.
//! Personal scope is never inferred; operations that are personal-only
//! declare it explicitly on their descriptor.

use crate::types::PermissionScope;
use serde::{Deserialize, Serialize};

/// The group identifiers present on an inbound request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chama_id: Option<String>,
}

impl ScopeTarget {
    /// A target with neither identifier (resolves to global scope)
    pub fn global() -> Self {
        Self::default()
    }

    /// A target addressing an organization
    pub fn organization(id: impl Into<String>) -> Self {
        Self {
            organization_id: Some(id.into()),
            chama_id: None,
        }
    }

    /// A target addressing a chama
    pub fn chama(id: impl Into<String>) -> Self {
        Self {
            organization_id: None,
            chama_id: Some(id.into()),
        }
    }

    /// The group id relevant for the given scope, if any
    ///
    /// Global and personal scopes have no target group.
    pub fn id_for(&self, scope: PermissionScope) -> Option<&str> {
        match scope {
            PermissionScope::Organization => self.organization_id.as_deref(),
            PermissionScope::Chama => self.chama_id.as_deref(),
            PermissionScope::Global | PermissionScope::Personal => None,
        }
    }
}

/// Determine the active scope for a request target
///
/// Precedence: chama identifier wins over organization identifier; neither
/// means global. Deterministic and idempotent for identical input.
pub fn resolve_scope(target: &ScopeTarget) -> PermissionScope {
    if target.chama_id.is_some() {
        PermissionScope::Chama
    } else if target.organization_id.is_some() {
        PermissionScope::Organization
    } else {
        PermissionScope::Global
    }
}
