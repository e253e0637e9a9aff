//! Permission catalog: role→permission matrix and role hierarchy
//!
//! The catalog is an immutable value constructed once at process start and
//! passed by reference into the resolver components. The hierarchy graph is
//! validated as a DAG at build time (Kahn's algorithm, with DFS cycle
//! reporting for the error message), never at lookup time. Lookups for roles
//! absent from either table return empty sets: an unknown role must never
//! widen access through a missing-key error path.

use crate::error::{AuthzError, Result};
use crate::types::{GroupRole, Permission, Role, ServiceRole};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Immutable role→permission matrix with hierarchy inheritance
///
/// Thread-safe; share with `Arc`. The transitive hierarchy closure is
/// memoized per role in a lock-free map.
#[derive(Debug)]
pub struct PermissionCatalog {
    /// Direct permissions per role
    matrix: HashMap<Role, HashSet<Permission>>,

    /// Roles each role inherits from (one level; closure is computed)
    hierarchy: HashMap<Role, Vec<Role>>,

    /// Memoized transitive closure of inherited roles
    closure_cache: DashMap<Role, Arc<HashSet<Role>>>,
}

impl PermissionCatalog {
    /// Start building a catalog
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Direct permissions for a role; empty if the role is not in the matrix
    pub fn permissions_for(&self, role: Role) -> HashSet<Permission> {
        self.matrix.get(&role).cloned().unwrap_or_default()
    }

    /// Roles a role directly inherits from; empty if absent from the table
    pub fn inherited_roles(&self, role: Role) -> &[Role] {
        self.hierarchy.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transitive closure of roles inherited by `role` (excluding `role` itself)
    ///
    /// The hierarchy is a validated DAG, so a plain BFS terminates.
    pub fn inherited_closure(&self, role: Role) -> Arc<HashSet<Role>> {
        if let Some(closure) = self.closure_cache.get(&role) {
            return closure.clone();
        }

        let mut closure = HashSet::new();
        let mut queue: VecDeque<Role> = self.inherited_roles(role).iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if closure.insert(current) {
                queue.extend(self.inherited_roles(current).iter().copied());
            }
        }

        let closure = Arc::new(closure);
        self.closure_cache.insert(role, closure.clone());
        closure
    }

    /// Direct plus hierarchy-inherited permissions for a role
    pub fn effective_role_permissions(&self, role: Role) -> HashSet<Permission> {
        let mut permissions = self.permissions_for(role);
        for inherited in self.inherited_closure(role).iter() {
            permissions.extend(self.permissions_for(*inherited));
        }
        permissions
    }

    /// Whether holding `held` satisfies a requirement for `required`,
    /// directly or transitively through the hierarchy
    pub fn role_satisfies(&self, held: Role, required: Role) -> bool {
        held == required || self.inherited_closure(held).contains(&required)
    }

    /// The catalog used by the SACCO platform
    ///
    /// Service roles form one chain (system_admin → admin → member), group
    /// roles another (group_admin → group_member → group_viewer).
    pub fn sacco_default() -> Self {
        use GroupRole::*;
        use Permission::*;
        use ServiceRole::*;

        let builder = Self::builder()
            .grant(
                SystemAdmin,
                [
                    SystemConfig,
                    SystemMonitor,
                    SystemBackup,
                    MemberCreate,
                    MemberRead,
                    MemberUpdate,
                    MemberDelete,
                    OrgCreate,
                    OrgRead,
                    OrgUpdate,
                    OrgDelete,
                    ChamaCreate,
                    ChamaRead,
                    ChamaUpdate,
                    ChamaDelete,
                    ReportsRead,
                    ReportsExport,
                ],
            )
            .grant(
                Admin,
                [
                    MemberCreate,
                    MemberRead,
                    MemberUpdate,
                    MemberInvite,
                    OrgCreate,
                    OrgRead,
                    OrgUpdate,
                    OrgSettings,
                    OrgDelete,
                    ChamaCreate,
                    ChamaRead,
                    ChamaUpdate,
                    ChamaDelete,
                    ReportsRead,
                    ReportsExport,
                    SharesApprove,
                    SharesCreate,
                    SharesRead,
                    SharesTrade,
                ],
            )
            .grant(
                Member,
                [MemberRead, OrgRead, FinanceRead, SharesRead, SharesTrade, LoanRead],
            )
            // Group roles with elevated privileges (subject to maker-checker)
            .grant(
                GroupAdmin,
                [
                    OrgRead,
                    OrgUpdate,
                    OrgDelete,
                    OrgSettings,
                    MemberInvite,
                    MemberUpdate,
                    ChamaCreate,
                    ChamaRead,
                    ChamaUpdate,
                    ChamaDelete,
                    FinanceRead,
                    FinanceDeposit,
                    FinanceWithdraw,
                    FinanceTransfer,
                    FinanceApprove,
                    SharesRead,
                    SharesTrade,
                    SharesApprove,
                    LoanRead,
                    LoanApply,
                    LoanApprove,
                    LoanDisburse,
                    ReportsRead,
                    ReportsExport,
                    GovernanceVote,
                    GovernancePropose,
                    GovernanceModerate,
                ],
            )
            // Basic membership with safe operations
            .grant(
                GroupMember,
                [
                    OrgRead,
                    ChamaRead,
                    FinanceRead,
                    FinanceDeposit,
                    SharesRead,
                    SharesTrade,
                    LoanRead,
                    LoanApply,
                    ReportsRead,
                    GovernanceVote,
                ],
            )
            // Cross-group read-only access
            .grant(
                GroupViewer,
                [OrgRead, ChamaRead, FinanceRead, SharesRead, LoanRead, ReportsRead],
            )
            .inherits(SystemAdmin, [Role::from(Admin), Role::from(Member)])
            .inherits(Admin, [Role::from(Member)])
            .inherits(GroupAdmin, [Role::from(GroupMember), Role::from(GroupViewer)])
            .inherits(GroupMember, [Role::from(GroupViewer)]);

        // The default tables are acyclic by construction
        builder.build().expect("default catalog is a valid DAG")
    }
}

/// Builder that validates the hierarchy before freezing the catalog
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    matrix: HashMap<Role, HashSet<Permission>>,
    hierarchy: HashMap<Role, Vec<Role>>,
}

impl CatalogBuilder {
    /// Grant direct permissions to a role (merges with prior grants)
    pub fn grant<R, P>(mut self, role: R, permissions: P) -> Self
    where
        R: Into<Role>,
        P: IntoIterator<Item = Permission>,
    {
        self.matrix.entry(role.into()).or_default().extend(permissions);
        self
    }

    /// Declare the roles a role inherits from
    pub fn inherits<R, I>(mut self, role: R, inherited: I) -> Self
    where
        R: Into<Role>,
        I: IntoIterator<Item = Role>,
    {
        let entry = self.hierarchy.entry(role.into()).or_default();
        for inherited_role in inherited {
            if !entry.contains(&inherited_role) {
                entry.push(inherited_role);
            }
        }
        self
    }

    /// Validate the hierarchy and freeze the catalog
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::InvalidCatalog` if the hierarchy contains a
    /// cycle, including a role that inherits from itself.
    pub fn build(self) -> Result<PermissionCatalog> {
        for (role, inherited) in &self.hierarchy {
            if inherited.contains(role) {
                return Err(AuthzError::InvalidCatalog(format!(
                    "role '{}' inherits from itself",
                    role
                )));
            }
        }

        Self::validate_acyclic(&self.hierarchy)?;

        Ok(PermissionCatalog {
            matrix: self.matrix,
            hierarchy: self.hierarchy,
            closure_cache: DashMap::new(),
        })
    }

    /// Kahn's algorithm over the inheritance edges; on failure a DFS walk
    /// reconstructs one cycle for the error message
    fn validate_acyclic(hierarchy: &HashMap<Role, Vec<Role>>) -> Result<()> {
        let mut nodes: HashSet<Role> = hierarchy.keys().copied().collect();
        for inherited in hierarchy.values() {
            nodes.extend(inherited.iter().copied());
        }

        let mut in_degree: HashMap<Role, usize> = nodes.iter().map(|r| (*r, 0)).collect();
        for inherited in hierarchy.values() {
            for target in inherited {
                *in_degree.get_mut(target).expect("target collected above") += 1;
            }
        }

        let mut queue: VecDeque<Role> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(role, _)| *role)
            .collect();

        let mut visited = 0usize;
        while let Some(current) = queue.pop_front() {
            visited += 1;
            for target in hierarchy.get(&current).map(Vec::as_slice).unwrap_or(&[]) {
                let degree = in_degree.get_mut(target).expect("target collected above");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*target);
                }
            }
        }

        if visited == nodes.len() {
            return Ok(());
        }

        let cycle = Self::find_cycle(hierarchy, &nodes)
            .unwrap_or_else(|| "unknown cycle".to_string());
        Err(AuthzError::InvalidCatalog(format!(
            "role hierarchy contains a cycle: {}",
            cycle
        )))
    }

    /// Three-color DFS to name one cycle
    fn find_cycle(hierarchy: &HashMap<Role, Vec<Role>>, nodes: &HashSet<Role>) -> Option<String> {
        // 0 = unvisited, 1 = on stack, 2 = done
        let mut state: HashMap<Role, u8> = nodes.iter().map(|r| (*r, 0)).collect();
        let mut path = Vec::new();

        fn dfs(
            node: Role,
            hierarchy: &HashMap<Role, Vec<Role>>,
            state: &mut HashMap<Role, u8>,
            path: &mut Vec<Role>,
        ) -> Option<String> {
            match state.get(&node) {
                Some(1) => {
                    let start = path.iter().position(|r| *r == node)?;
                    let mut names: Vec<String> =
                        path[start..].iter().map(|r| r.to_string()).collect();
                    names.push(node.to_string());
                    return Some(names.join(" -> "));
                }
                Some(2) => return None,
                _ => {}
            }

            state.insert(node, 1);
            path.push(node);

            for next in hierarchy.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(cycle) = dfs(*next, hierarchy, state, path) {
                    return Some(cycle);
                }
            }

            state.insert(node, 2);
            path.pop();
            None
        }

        for start in nodes {
            if state.get(start) == Some(&0) {
                if let Some(cycle) = dfs(*start, hierarchy, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }
}
