use std::{
    collections::HashMap,
    sync::Arc,
};

use arc_swap::ArcSwap;
use tracing::{info, trace};

use crate::{AccessError, Capability, CapabilitySet, PrincipalId, Result, Role};

/// Source of a principal's effective capabilities.
pub trait PermissionResolver {
    /// Fails with [AccessError::InvalidPrincipal] when principal is unknown.
    /// A known principal without domain powers resolves to an empty set.
    fn resolve(&self, principal: &PrincipalId) -> Result<CapabilitySet>;
}

impl<T: PermissionResolver + ?Sized> PermissionResolver for &T {
    fn resolve(&self, principal: &PrincipalId) -> Result<CapabilitySet> {
        (**self).resolve(principal)
    }
}

impl<T: PermissionResolver + ?Sized> PermissionResolver for Arc<T> {
    fn resolve(&self, principal: &PrincipalId) -> Result<CapabilitySet> {
        (**self).resolve(principal)
    }
}

/// Static lookup, handy when capabilities are resolved elsewhere
impl PermissionResolver for HashMap<PrincipalId, CapabilitySet> {
    fn resolve(&self, principal: &PrincipalId) -> Result<CapabilitySet> {
        self.get(principal)
            .cloned()
            .ok_or_else(|| AccessError::InvalidPrincipal(principal.clone()))
    }
}

const DEFAULT_FALLBACK_ROLE: &str = "authenticated";

/// RoleResolver - resolves principal capabilities from named roles. Roles, fallback roles and principals
/// may be replaced at runtime without blocking concurrent [.resolve()][PermissionResolver::resolve] calls.
pub struct RoleResolver {
    roles: ArcSwap<HashMap<String, Role>>,
    fallback_roles: ArcSwap<Vec<String>>,
    principals: ArcSwap<HashMap<PrincipalId, Vec<String>>>,
}

/// RoleResolverBuilder - used when you create [RoleResolver].
#[derive(Default)]
pub struct RoleResolverBuilder {
    roles: HashMap<String, Role>,
    fallback_roles: Option<Vec<String>>,
    principals: HashMap<PrincipalId, Vec<String>>,
}

impl RoleResolverBuilder {
    pub fn build(&self) -> RoleResolver {
        RoleResolver {
            roles: ArcSwap::from_pointee(self.roles.clone()),
            fallback_roles: ArcSwap::from_pointee(match &self.fallback_roles {
                Some(roles) => roles.clone(),
                None => vec![DEFAULT_FALLBACK_ROLE.to_string()],
            }),
            principals: ArcSwap::from_pointee(self.principals.clone()),
        }
    }

    pub fn add_role(&mut self, role: Role) -> &mut Self {
        self.roles.insert(role.name.clone(), role);
        self
    }

    pub fn load_roles(&mut self, roles: Vec<Role>) -> &mut Self {
        for role in roles {
            self.add_role(role);
        }
        self
    }

    /// Roles applied to principals that hold none
    pub fn set_fallback_roles(&mut self, fallback_roles: Vec<String>) -> &mut Self {
        self.fallback_roles = Some(fallback_roles);
        self
    }

    pub fn add_principal(&mut self, id: impl Into<PrincipalId>, roles: Vec<String>) -> &mut Self {
        self.principals.insert(id.into(), roles);
        self
    }
}

pub struct RoleResolverUpdater {
    roles: HashMap<String, Role>,
    fallback_roles: Option<Vec<String>>,
}

impl RoleResolverUpdater {
    /// Adds one Role to map
    pub fn add_role(&mut self, role: Role) -> &mut Self {
        self.roles.insert(role.name.clone(), role);
        self
    }

    pub fn remove_role(&mut self, role_name: &str) -> &mut Self {
        self.roles.remove(role_name);
        self
    }

    /// Loads multiple roles from `Vec<Role>`
    pub fn load_roles(&mut self, roles: Vec<Role>) -> &mut Self {
        for role in roles {
            self.add_role(role);
        }
        self
    }

    /// Sets new fallback roles. If never set, resolver keeps its old ones.
    pub fn set_fallback_roles(&mut self, fallback_roles: Vec<String>) -> &mut Self {
        self.fallback_roles = Some(fallback_roles);
        self
    }

    /// Swaps roles (and fallback roles, if set) inside resolver atomically
    pub fn update(&self, resolver: &RoleResolver) {
        resolver.roles.store(Arc::new(self.roles.clone()));
        if let Some(fallback_roles) = &self.fallback_roles {
            resolver.fallback_roles.store(Arc::new(fallback_roles.clone()));
        }
        info!(roles = self.roles.len(), "roles updated");
    }
}

impl RoleResolver {
    /// Creates builder ([RoleResolverBuilder]) for [RoleResolver]
    pub fn builder() -> RoleResolverBuilder {
        RoleResolverBuilder::default()
    }

    /// Creates clean updater ([RoleResolverUpdater]) for replacing roles at runtime.
    pub fn updater_clean(&self) -> RoleResolverUpdater {
        RoleResolverUpdater {
            roles: HashMap::new(),
            fallback_roles: None,
        }
    }

    /// Creates updater holding a copy of current roles, handy when few roles should be added/updated/removed
    pub fn updater_copy(&self) -> RoleResolverUpdater {
        RoleResolverUpdater {
            roles: self.roles.load().as_ref().clone(),
            fallback_roles: None,
        }
    }

    /// Registers principal or replaces its roles
    pub fn register_principal(&self, id: impl Into<PrincipalId>, roles: Vec<String>) {
        let id = id.into();
        self.principals.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(id.clone(), roles.clone());
            next
        });
        info!(principal = %id, "principal registered");
    }

    /// Forgets principal, returns whether it was known
    pub fn remove_principal(&self, id: &PrincipalId) -> bool {
        let previous = self.principals.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(id);
            next
        });
        let known = previous.contains_key(id);
        if known {
            info!(principal = %id, "principal removed");
        }
        known
    }

    pub fn principal_count(&self) -> usize {
        self.principals.load().len()
    }

    /// Check if principal holds a specific capability
    pub fn has_capability(&self, principal: &PrincipalId, capability: Capability) -> Result<()> {
        if self.resolve(principal)?.contains(capability) {
            Ok(())
        } else {
            Err(AccessError::CapabilityDenied(capability))
        }
    }
}

impl PermissionResolver for RoleResolver {
    fn resolve(&self, principal: &PrincipalId) -> Result<CapabilitySet> {
        let principals = self.principals.load();
        let principal_roles = principals
            .get(principal)
            .ok_or_else(|| AccessError::InvalidPrincipal(principal.clone()))?;

        let fallback_roles = self.fallback_roles.load();
        let principal_roles: &Vec<String> = if principal_roles.is_empty() {
            &fallback_roles
        } else {
            principal_roles
        };

        let inner_roles = self.roles.load();
        let mut capabilities = CapabilitySet::new();

        // Collect capabilities from all of principal's roles
        for role_name in principal_roles {
            let role = match inner_roles.get(role_name) {
                Some(role) => role,
                None => {
                    trace!(principal = %principal, role = %role_name, "role not defined, skipped");
                    continue;
                }
            };
            capabilities.extend(role.capabilities().iter());
        }

        Ok(capabilities)
    }
}
