use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use thiserror::Error;

use crate::request::stage::Operation;

/// Marker admitting any caller, including anonymous ones
pub const PUBLIC: &str = "*";

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read access policy {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid access policy: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("operation {0:?} has an empty role list")]
    EmptyRoleSet(Operation),
}

/// Roles permitted to perform one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet {
    roles: BTreeSet<String>,
    public: bool,
}

impl RoleSet {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        let mut public = false;
        for role in roles {
            let role = role.into();
            if role == PUBLIC {
                public = true;
            } else {
                set.insert(role);
            }
        }
        Self { roles: set, public }
    }

    pub fn public() -> Self {
        Self::new([PUBLIC])
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Whether a caller with this role claim may proceed
    pub fn permits(&self, role: Option<&str>) -> bool {
        if self.public {
            return true;
        }
        match role {
            Some(role) => self.roles.contains(role),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.public && self.roles.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    operations: HashMap<Operation, Vec<String>>,
}

/// Per-operation role allow-lists
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: HashMap<Operation, RoleSet>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        let rules = Operation::ALL
            .iter()
            .map(|&op| {
                let roles = if op.is_account() {
                    RoleSet::public()
                } else if op.is_read() {
                    RoleSet::new(["admin", "user"])
                } else {
                    RoleSet::new(["admin"])
                };
                (op, roles)
            })
            .collect();
        Self { rules }
    }
}

impl AccessPolicy {
    /// Defaults overridden by the operations listed in a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        let file: PolicyFile = serde_yaml::from_str(yaml)?;
        let mut policy = Self::default();
        for (op, roles) in file.operations {
            let set = RoleSet::new(roles);
            if set.is_empty() {
                return Err(PolicyError::EmptyRoleSet(op));
            }
            tracing::info!("Access policy override: {:?} -> {:?}", op, set);
            policy.rules.insert(op, set);
        }
        Ok(policy)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn roles_for(&self, operation: Operation) -> &RoleSet {
        // Every operation is seeded in Default and overrides only replace entries
        &self.rules[&operation]
    }
}
