//! Core authorization types
//!
//! Wire names match the platform's existing vocabulary: permissions are
//! `domain:action` strings (`"finance:withdraw"`), roles are snake_case
//! (`"group_admin"`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Granular permissions for fine-grained access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    // System administration
    #[serde(rename = "system:config")]
    SystemConfig,
    #[serde(rename = "system:monitor")]
    SystemMonitor,
    #[serde(rename = "system:backup")]
    SystemBackup,

    // Member management
    #[serde(rename = "member:create")]
    MemberCreate,
    #[serde(rename = "member:read")]
    MemberRead,
    #[serde(rename = "member:update")]
    MemberUpdate,
    #[serde(rename = "member:delete")]
    MemberDelete,
    #[serde(rename = "member:invite")]
    MemberInvite,

    // Organization management
    #[serde(rename = "org:create")]
    OrgCreate,
    #[serde(rename = "org:read")]
    OrgRead,
    #[serde(rename = "org:update")]
    OrgUpdate,
    #[serde(rename = "org:delete")]
    OrgDelete,
    #[serde(rename = "org:settings")]
    OrgSettings,

    // Chama management
    #[serde(rename = "chama:create")]
    ChamaCreate,
    #[serde(rename = "chama:read")]
    ChamaRead,
    #[serde(rename = "chama:update")]
    ChamaUpdate,
    #[serde(rename = "chama:delete")]
    ChamaDelete,
    #[serde(rename = "chama:invite")]
    ChamaInvite,

    // Financial operations
    #[serde(rename = "finance:read")]
    FinanceRead,
    #[serde(rename = "finance:deposit")]
    FinanceDeposit,
    #[serde(rename = "finance:withdraw")]
    FinanceWithdraw,
    #[serde(rename = "finance:transfer")]
    FinanceTransfer,
    #[serde(rename = "finance:approve")]
    FinanceApprove,

    // Shares management
    #[serde(rename = "shares:create")]
    SharesCreate,
    #[serde(rename = "shares:read")]
    SharesRead,
    #[serde(rename = "shares:trade")]
    SharesTrade,
    #[serde(rename = "shares:approve")]
    SharesApprove,

    // Loans management
    #[serde(rename = "loan:apply")]
    LoanApply,
    #[serde(rename = "loan:read")]
    LoanRead,
    #[serde(rename = "loan:approve")]
    LoanApprove,
    #[serde(rename = "loan:disburse")]
    LoanDisburse,

    // Reports and analytics
    #[serde(rename = "reports:read")]
    ReportsRead,
    #[serde(rename = "reports:export")]
    ReportsExport,

    // Governance
    #[serde(rename = "governance:vote")]
    GovernanceVote,
    #[serde(rename = "governance:propose")]
    GovernancePropose,
    #[serde(rename = "governance:moderate")]
    GovernanceModerate,
}

impl Permission {
    /// Returns the wire name of this permission (e.g. `"finance:withdraw"`)
    pub fn as_str(&self) -> &'static str {
        use Permission::*;
        match self {
            SystemConfig => "system:config",
            SystemMonitor => "system:monitor",
            SystemBackup => "system:backup",
            MemberCreate => "member:create",
            MemberRead => "member:read",
            MemberUpdate => "member:update",
            MemberDelete => "member:delete",
            MemberInvite => "member:invite",
            OrgCreate => "org:create",
            OrgRead => "org:read",
            OrgUpdate => "org:update",
            OrgDelete => "org:delete",
            OrgSettings => "org:settings",
            ChamaCreate => "chama:create",
            ChamaRead => "chama:read",
            ChamaUpdate => "chama:update",
            ChamaDelete => "chama:delete",
            ChamaInvite => "chama:invite",
            FinanceRead => "finance:read",
            FinanceDeposit => "finance:deposit",
            FinanceWithdraw => "finance:withdraw",
            FinanceTransfer => "finance:transfer",
            FinanceApprove => "finance:approve",
            SharesCreate => "shares:create",
            SharesRead => "shares:read",
            SharesTrade => "shares:trade",
            SharesApprove => "shares:approve",
            LoanApply => "loan:apply",
            LoanRead => "loan:read",
            LoanApprove => "loan:approve",
            LoanDisburse => "loan:disburse",
            ReportsRead => "reports:read",
            ReportsExport => "reports:export",
            GovernanceVote => "governance:vote",
            GovernancePropose => "governance:propose",
            GovernanceModerate => "governance:moderate",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service-level roles (system-wide, highest privilege first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRole {
    /// Full configuration access
    SystemAdmin,
    /// Member management, service configuration
    Admin,
    /// Basic service access
    Member,
}

/// Group-level roles (context-specific within organizations/chamas)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    /// Full group management with elevated privileges
    GroupAdmin,
    /// Basic group participation
    GroupMember,
    /// Read-only access to groups
    GroupViewer,
}

/// A role of either level, used wherever both may appear
/// (hierarchy tables, required-role checks, approver sets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Role {
    Service(ServiceRole),
    Group(GroupRole),
}

impl Role {
    /// Whether this is a service-level role
    pub fn is_service(&self) -> bool {
        matches!(self, Role::Service(_))
    }

    /// Whether this is a group-level role
    pub fn is_group(&self) -> bool {
        matches!(self, Role::Group(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Service(ServiceRole::SystemAdmin) => "system_admin",
            Role::Service(ServiceRole::Admin) => "admin",
            Role::Service(ServiceRole::Member) => "member",
            Role::Group(GroupRole::GroupAdmin) => "group_admin",
            Role::Group(GroupRole::GroupMember) => "group_member",
            Role::Group(GroupRole::GroupViewer) => "group_viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ServiceRole> for Role {
    fn from(role: ServiceRole) -> Self {
        Role::Service(role)
    }
}

impl From<GroupRole> for Role {
    fn from(role: GroupRole) -> Self {
        Role::Group(role)
    }
}

/// Permission scopes for context-aware access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    /// System-wide access
    Global,
    /// Organization-level access
    Organization,
    /// Chama-level access
    Chama,
    /// Individual access (actor-self operations only)
    Personal,
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionScope::Global => "global",
            PermissionScope::Organization => "organization",
            PermissionScope::Chama => "chama",
            PermissionScope::Personal => "personal",
        };
        f.write_str(s)
    }
}

/// Kind of group a membership belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Organization,
    Chama,
}

impl GroupType {
    /// The scope this group type is relevant in
    pub fn scope(&self) -> PermissionScope {
        match self {
            GroupType::Organization => PermissionScope::Organization,
            GroupType::Chama => PermissionScope::Chama,
        }
    }
}

/// Membership of an actor in a specific organization or chama
///
/// Memberships are soft-deleted: removal sets `is_active = false` and
/// never erases history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// The group this membership belongs to
    pub group_id: String,

    /// Organization or chama
    pub group_type: GroupType,

    /// Role held within the group
    pub role: GroupRole,

    /// Additional grants on top of the role (additive only, never subtracted)
    #[serde(default)]
    pub custom_permissions: HashSet<Permission>,

    /// Inactive memberships contribute no permissions
    pub is_active: bool,

    /// When the member joined the group
    pub joined_at: DateTime<Utc>,

    /// Who invited this member, if anyone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_by: Option<String>,
}

impl GroupMembership {
    /// Create a new active membership with no custom grants
    pub fn new(group_id: impl Into<String>, group_type: GroupType, role: GroupRole) -> Self {
        Self {
            group_id: group_id.into(),
            group_type,
            role,
            custom_permissions: HashSet::new(),
            is_active: true,
            joined_at: Utc::now(),
            invited_by: None,
        }
    }

    /// Add a custom permission grant
    pub fn with_custom_permission(mut self, permission: Permission) -> Self {
        self.custom_permissions.insert(permission);
        self
    }

    /// Record who invited this member
    pub fn with_invited_by(mut self, inviter: impl Into<String>) -> Self {
        self.invited_by = Some(inviter.into());
        self
    }

    /// Mark the membership inactive (soft delete)
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether this membership is relevant for the given scope and target group
    pub fn is_relevant(&self, scope: PermissionScope, target_id: &str) -> bool {
        self.is_active && self.group_type.scope() == scope && self.group_id == target_id
    }
}

/// An authenticated identity attempting an operation
///
/// Built per request by the identity provider; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identifier
    pub id: String,

    /// System-wide role, independent of any group
    pub service_role: ServiceRole,

    /// Memberships as of the start of the current request
    #[serde(default)]
    pub group_memberships: Vec<GroupMembership>,
}

impl Actor {
    /// Create an actor with no group memberships
    pub fn new(id: impl Into<String>, service_role: ServiceRole) -> Self {
        Self {
            id: id.into(),
            service_role,
            group_memberships: Vec::new(),
        }
    }

    /// Add a group membership
    pub fn with_membership(mut self, membership: GroupMembership) -> Self {
        self.group_memberships.push(membership);
        self
    }
}

/// Risk classification for registered operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// How much detail the audit record for an operation carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Basic,
    Detailed,
    Comprehensive,
}
