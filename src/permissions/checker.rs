//! Role-based permission checker.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

/// A capability a route may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Create, update and delete catalog entities.
    ManageCatalog,
    /// Administer other user accounts.
    ManageUsers,
}

impl FromStr for Permission {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "catalog" => Ok(Self::ManageCatalog),
            "users" => Ok(Self::ManageUsers),
            other => anyhow::bail!("unknown permission '{other}'"),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManageCatalog => f.write_str("catalog"),
            Self::ManageUsers => f.write_str("users"),
        }
    }
}

/// Which permissions each role holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    roles: HashMap<String, HashSet<Permission>>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        let staff: HashSet<Permission> = [Permission::ManageCatalog, Permission::ManageUsers]
            .into_iter()
            .collect();

        let mut roles = HashMap::new();
        roles.insert("admin".to_string(), staff.clone());
        roles.insert("manager".to_string(), staff);
        roles.insert("user".to_string(), HashSet::new());
        Self { roles }
    }
}

impl FromStr for RolePolicy {
    type Err = anyhow::Error;

    /// Parse `admin=catalog,users;manager=catalog;user=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut roles = HashMap::new();
        for entry in s.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (role, perms) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("role policy entry '{entry}' has no '='"))?;
            let perms = perms
                .split(',')
                .filter(|p| !p.trim().is_empty())
                .map(str::parse)
                .collect::<Result<HashSet<Permission>, _>>()?;
            roles.insert(role.trim().to_string(), perms);
        }
        if roles.is_empty() {
            anyhow::bail!("role policy is empty");
        }
        Ok(Self { roles })
    }
}

/// Permission checker shared by all route guards.
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    policy: Arc<RolePolicy>,
}

impl Permissions {
    pub fn new(policy: RolePolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// Check whether a role holds a permission.
    pub fn allows(&self, role: &str, permission: Permission) -> bool {
        let allowed = self
            .policy
            .roles
            .get(role)
            .is_some_and(|perms| perms.contains(&permission));
        debug!("Permission {} for role {}: {}", permission, role, allowed);
        allowed
    }

    /// Whether the policy names this role at all.
    pub fn is_known_role(&self, role: &str) -> bool {
        self.policy.roles.contains_key(role)
    }

    /// Known roles, sorted.
    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.policy.roles.keys().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let perms = Permissions::default();
        assert!(perms.allows("admin", Permission::ManageCatalog));
        assert!(perms.allows("manager", Permission::ManageCatalog));
        assert!(perms.allows("manager", Permission::ManageUsers));
        assert!(!perms.allows("user", Permission::ManageCatalog));
        assert!(!perms.allows("guest", Permission::ManageCatalog));
        assert_eq!(perms.roles(), ["admin", "manager", "user"]);
    }

    #[test]
    fn test_parse_policy_adds_roles() {
        let policy: RolePolicy = "admin=catalog,users; editor=catalog; user="
            .parse()
            .unwrap();
        let perms = Permissions::new(policy);
        assert!(perms.allows("editor", Permission::ManageCatalog));
        assert!(!perms.allows("editor", Permission::ManageUsers));
        assert!(perms.is_known_role("user"));
        assert!(!perms.is_known_role("manager"));
    }

    #[test]
    fn test_parse_policy_errors() {
        assert!("admin".parse::<RolePolicy>().is_err());
        assert!("admin=everything".parse::<RolePolicy>().is_err());
        assert!("".parse::<RolePolicy>().is_err());
    }
}
