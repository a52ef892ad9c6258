//! Rust 🦀 domain-scoped access evaluator. Several sites ("domains") share one codebase; this library
//! answers which of them a principal may assign a content item or a user account to, and whether the
//! "send to all affiliates" option is on offer.
//!
//! Library intended to be lightweight and simple as possible. Rendering, routing and persistence stay
//! with the host; the evaluator only consumes three collaborators:
//!
//! * [DomainRegistry] - authoritative, ordered list of domains
//! * [AssignmentStore] - which domains each user account or content item is assigned to
//! * [PermissionResolver] - which [Capability] tokens a principal holds
//!
//! In-memory implementations of all three are provided. They keep immutable snapshots behind `arc-swap`,
//! so evaluations never block writers and always read one consistent view.
//!
//! Roles are serializable and deserializable, so library user may store them anywhere (config files, DB,
//! external service). When a role is created or deserialized its patterns compile into layered sets,
//! starting from the global wildcard.
//!
//! Example usage:
//!```
//! use domaincrab::*;
//!
//! fn demo() -> Result<(), AccessError> {
//!     let registry = InMemoryDomainRegistry::with_domains([
//!         Domain::new("example.com", "Example"),
//!         Domain::new("one.example.com", "One"),
//!         Domain::new("two.example.com", "Two"),
//!     ])?;
//!
//!     let assignments = InMemoryAssignmentStore::new();
//!     assignments.assign(&EntityRef::user("editor"), DomainId::from_hostname("two.example.com"));
//!
//!     let resolver = RoleResolver::builder()
//!         .add_role(Role::new("publisher", vec!["publish to any domain".to_string()]))
//!         .add_role(Role::new(
//!             "editor",
//!             vec!["DomainAccess::Publish::Assigned".to_string()],
//!         ))
//!         .add_principal("admin", vec!["publisher".to_string()])
//!         .add_principal("editor", vec!["editor".to_string()])
//!         .build();
//!
//!     let evaluator = AccessEvaluator::new(registry, assignments, resolver);
//!
//!     // Unscoped principal sees every domain and may send to all affiliates
//!     let admin = evaluator.compute_visible_domains(&"admin".into(), EditContext::Content)?;
//!     assert_eq!(admin.domains.len(), 3);
//!     assert!(admin.broadcast_available);
//!
//!     // Scoped principal sees only its own domains
//!     let editor = evaluator.compute_visible_domains(&"editor".into(), EditContext::Content)?;
//!     assert_eq!(editor.domain_ids(), vec![DomainId::from("two_example_com")]);
//!     assert!(!editor.broadcast_available);
//!
//!     // No editor powers over user accounts
//!     let accounts = evaluator.compute_visible_domains(&"editor".into(), EditContext::UserAccount)?;
//!     assert!(accounts.is_empty());
//!
//!     Ok(())
//! }
//!
//! demo().unwrap();
//!```
use std::{collections::HashSet, fmt};

mod assignment;
mod capability;
mod config;
mod evaluator;
#[cfg(test)]
mod example;
mod registry;
mod service;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use assignment::{AssignmentStore, InMemoryAssignmentStore};
pub use capability::{AccessScope, Capability, CapabilitySet, EditContext};
pub use config::{AccessConfig, AssignmentConfig, ConfigError, ConfiguredEvaluator, PrincipalConfig};
pub use evaluator::{AccessEvaluator, AssignmentOutcome, DomainVisibility};
pub use registry::{Domain, DomainRegistry, DomainStatus, InMemoryDomainRegistry};
pub use service::{PermissionResolver, RoleResolver, RoleResolverBuilder, RoleResolverUpdater};

/// Machine name of a domain (e.g. `one_example_com`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    /// Derives machine name from hostname: lowercased, every non alphanumeric char replaced with `_`.
    pub fn from_hostname(hostname: &str) -> Self {
        Self(
            hostname
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_lowercase()
                    } else {
                        '_'
                    }
                })
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DomainId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DomainId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of the acting user account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Anything that can be assigned to domains: a user account or a content item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    User(PrincipalId),
    Content(String),
}

impl EntityRef {
    pub fn user(id: impl Into<PrincipalId>) -> Self {
        Self::User(id.into())
    }

    pub fn content(id: impl Into<String>) -> Self {
        Self::Content(id.into())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Content(id) => write!(f, "content:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Domain not found: {0}")]
    NotFound(DomainId),
    #[error("Unknown principal: {0}")]
    InvalidPrincipal(PrincipalId),
    #[error("Capability denied: {0}")]
    CapabilityDenied(Capability),
    #[error("Principal {principal} may not assign domain {domain}")]
    DomainNotPermitted {
        principal: PrincipalId,
        domain: DomainId,
    },
    #[error("Domain is inactive: {0}")]
    DomainInactive(DomainId),
    #[error("Principal {0} may not send to all affiliates")]
    BroadcastNotPermitted(PrincipalId),
    #[error("Domain already exists: {0}")]
    DuplicateDomain(DomainId),
    #[error("Domain {domain} is still assigned to {references} entities")]
    DomainInUse { domain: DomainId, references: usize },
}

pub type Result<T, E = AccessError> = std::result::Result<T, E>;

/// Role definition with permission patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleS {
    pub name: String,
    pub permissions: Vec<String>,
}

impl From<Role> for RoleS {
    fn from(value: Role) -> Self {
        RoleS {
            name: value.name,
            permissions: value.permissions,
        }
    }
}

impl From<RoleS> for Role {
    fn from(value: RoleS) -> Self {
        Role::new(&value.name, value.permissions)
    }
}

/// Role definition with permission patterns, compiled on creation and deserialization.
///
/// Patterns: `*`, `DomainAccess::*`, `DomainAccess::Publish::*`, `DomainAccess::Publish::{Any,Assigned}`,
/// exact canonical names, or host permission names like `assign domain editors`.
/// Anything that names no [Capability] (e.g. `administer users`) is kept but grants nothing here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RoleS")]
#[serde(into = "RoleS")]
pub struct Role {
    pub name: String,
    pub permissions: Vec<String>,
    compiled_permissions: CompiledPermissions,
}

impl Role {
    pub fn new(name: &str, permissions: Vec<String>) -> Self {
        Role {
            name: name.to_string(),
            compiled_permissions: CompiledPermissions::compile(&permissions),
            permissions,
        }
    }

    pub fn grants(&self, capability: Capability) -> bool {
        self.compiled_permissions.matches(capability)
    }

    /// All capabilities this role grants
    pub fn capabilities(&self) -> CapabilitySet {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.grants(*cap))
            .collect()
    }
}

#[derive(Debug, Default, Clone)]
pub struct CompiledPermissions {
    global_permission: bool,
    domain_wildcards: HashSet<String>,
    // Domain::Object
    object_wildcards: HashSet<(String, String)>,
    exact_permissions: HashSet<Capability>,
}

impl CompiledPermissions {
    pub fn compile(permissions: &[String]) -> Self {
        let mut compiled = CompiledPermissions::default();

        for perm in permissions {
            let perm = perm.trim();
            if perm == "*" {
                // Global wildcard covers everything
                return CompiledPermissions {
                    global_permission: true,
                    ..Default::default()
                };
            }

            let parts: Vec<&str> = perm.split("::").collect();

            match parts.len() {
                2 if parts[1] == "*" => {
                    // Domain wildcard: "DomainAccess::*"
                    let domain = parts[0].to_string();
                    compiled.object_wildcards.retain(|(d, _)| d != &domain);
                    compiled.exact_permissions.retain(|cap| cap.domain() != domain);
                    compiled.domain_wildcards.insert(domain);
                }
                3 if parts[2] == "*" => {
                    // Object wildcard: "DomainAccess::Publish::*"
                    let domain = parts[0].to_string();
                    let object = parts[1].to_string();

                    if !compiled.domain_wildcards.contains(&domain) {
                        compiled
                            .exact_permissions
                            .retain(|cap| cap.domain() != domain || cap.object_type() != object);
                        compiled.object_wildcards.insert((domain, object));
                    }
                }
                3 if parts[2].starts_with('{') && parts[2].ends_with('}') => {
                    // Action set: "DomainAccess::Publish::{Any,Assigned}"
                    let domain = parts[0];
                    let object = parts[1];

                    if !compiled.covers_object(domain, object) {
                        let actions_str = &parts[2][1..parts[2].len() - 1];
                        for action in actions_str.split(',').map(|s| s.trim()) {
                            let exact = format!("{}::{}::{}", domain, object, action);
                            if let Some(cap) = Capability::from_string(&exact) {
                                compiled.exact_permissions.insert(cap);
                            }
                        }
                    }
                }
                _ => {
                    // Exact canonical name or host permission name
                    if let Some(cap) = Capability::from_string(perm) {
                        if !compiled.covers_object(cap.domain(), cap.object_type()) {
                            compiled.exact_permissions.insert(cap);
                        }
                    }
                }
            }
        }

        compiled
    }

    fn covers_object(&self, domain: &str, object_type: &str) -> bool {
        self.domain_wildcards.contains(domain)
            || self
                .object_wildcards
                .iter()
                .any(|(d, o)| d == domain && o == object_type)
    }

    /// Check if capability matches
    #[inline]
    pub fn matches(&self, capability: Capability) -> bool {
        // 1. Global wildcard check
        if self.global_permission {
            return true;
        }

        // 2. Domain and object wildcard lookup
        if self.covers_object(capability.domain(), capability.object_type()) {
            return true;
        }

        // 3. Exact match hash lookup
        self.exact_permissions.contains(&capability)
    }
}
