//! Serialized snapshot of domains, roles, principals and assignments.
//!
//! ```json
//! {
//!   "domains": [
//!     { "hostname": "example.com", "label": "Example" },
//!     { "hostname": "one.example.com", "label": "One", "status": "inactive" }
//!   ],
//!   "roles": [
//!     { "name": "editor", "permissions": ["publish to any assigned domain"] }
//!   ],
//!   "principals": [{ "id": "alice", "roles": ["editor"] }],
//!   "assignments": [{ "entity": { "user": "alice" }, "domains": ["example_com"] }]
//! }
//! ```
use std::{io::Read, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    AccessError, AccessEvaluator, AssignmentStore, Domain, DomainId, DomainRegistry, EntityRef,
    InMemoryAssignmentStore, InMemoryDomainRegistry, PrincipalId, Role, RoleResolver,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse access config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read access config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid access config: {0}")]
    Access(#[from] AccessError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalConfig {
    pub id: PrincipalId,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentConfig {
    pub entity: EntityRef,
    pub domains: Vec<DomainId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_roles: Option<Vec<String>>,
    #[serde(default)]
    pub principals: Vec<PrincipalConfig>,
    #[serde(default)]
    pub assignments: Vec<AssignmentConfig>,
}

pub type ConfiguredEvaluator =
    AccessEvaluator<Arc<InMemoryDomainRegistry>, Arc<InMemoryAssignmentStore>, Arc<RoleResolver>>;

impl AccessConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Builds in-memory collaborators and wires them into an evaluator.
    ///
    /// Fails on duplicate domain ids and on assignments naming unknown domains.
    pub fn build(self) -> Result<ConfiguredEvaluator, ConfigError> {
        let registry = InMemoryDomainRegistry::with_domains(self.domains)?;

        let assignments = InMemoryAssignmentStore::new();
        for assignment in &self.assignments {
            for domain in &assignment.domains {
                if !registry.exists(domain) {
                    return Err(AccessError::NotFound(domain.clone()).into());
                }
                assignments.assign(&assignment.entity, domain.clone());
            }
        }

        let mut builder = RoleResolver::builder();
        builder.load_roles(self.roles);
        if let Some(fallback_roles) = self.fallback_roles {
            builder.set_fallback_roles(fallback_roles);
        }
        for principal in self.principals {
            builder.add_principal(principal.id, principal.roles);
        }
        let resolver = builder.build();

        info!(
            domains = registry.len(),
            principals = resolver.principal_count(),
            "access config loaded"
        );

        Ok(AccessEvaluator::new(
            Arc::new(registry),
            Arc::new(assignments),
            Arc::new(resolver),
        ))
    }
}
