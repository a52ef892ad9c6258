use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    AccessError, AccessScope, AssignmentStore, Domain, DomainId, DomainRegistry, EditContext,
    EntityRef, PermissionResolver, PrincipalId, Result,
};

/// Domains a principal may choose from in one edit context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainVisibility {
    /// In registry order
    pub domains: Vec<Domain>,
    /// Whether "send to all affiliates" is offered
    pub broadcast_available: bool,
    pub scope: AccessScope,
}

impl DomainVisibility {
    fn none() -> Self {
        DomainVisibility {
            domains: Vec::new(),
            broadcast_available: false,
            scope: AccessScope::None,
        }
    }

    pub fn domain_ids(&self) -> Vec<DomainId> {
        self.domains.iter().map(|d| d.id.clone()).collect()
    }

    pub fn contains(&self, id: &DomainId) -> bool {
        self.domains.iter().any(|d| &d.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Result of an accepted assignment. `all_affiliates` belongs to this submission only and is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentOutcome {
    pub entity: EntityRef,
    /// Newly requested domains, in registry order
    pub domains: Vec<DomainId>,
    pub all_affiliates: bool,
}

/// Combines registry, assignments and capabilities into domain decisions.
///
/// Holds no state of its own; every call reads the collaborators afresh, so callers simply
/// call again after changing them.
pub struct AccessEvaluator<R, A, P> {
    registry: R,
    assignments: A,
    resolver: P,
}

impl<R, A, P> AccessEvaluator<R, A, P>
where
    R: DomainRegistry,
    A: AssignmentStore,
    P: PermissionResolver,
{
    pub fn new(registry: R, assignments: A, resolver: P) -> Self {
        Self {
            registry,
            assignments,
            resolver,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn assignments(&self) -> &A {
        &self.assignments
    }

    pub fn resolver(&self) -> &P {
        &self.resolver
    }

    /// Domains `principal` may assign in `context`, and whether broadcast is offered.
    ///
    /// * unscoped - every registry domain, broadcast available
    /// * scoped - active registry domains the principal itself is assigned to
    /// * none - nothing
    ///
    /// Fails only when the resolver does not know the principal.
    pub fn compute_visible_domains(
        &self,
        principal: &PrincipalId,
        context: EditContext,
    ) -> Result<DomainVisibility> {
        let capabilities = self.resolver.resolve(principal)?;
        let scope = capabilities.scope_for(context);

        let visibility = match scope {
            AccessScope::Unscoped => DomainVisibility {
                domains: self.registry.list_domains(),
                broadcast_available: true,
                scope,
            },
            AccessScope::Scoped => {
                let own = EntityRef::User(principal.clone());
                DomainVisibility {
                    domains: self.active_assigned(&own),
                    broadcast_available: false,
                    scope,
                }
            }
            AccessScope::None => DomainVisibility::none(),
        };

        debug!(
            principal = %principal,
            %context,
            %scope,
            visible = visibility.domains.len(),
            broadcast = visibility.broadcast_available,
            "visible domains computed"
        );
        Ok(visibility)
    }

    /// Validates a submitted domain selection without changing anything.
    ///
    /// Unknown ids fail with [AccessError::NotFound], ids outside the visible set with
    /// [AccessError::DomainNotPermitted], inactive domains with [AccessError::DomainInactive],
    /// an unavailable broadcast with [AccessError::BroadcastNotPermitted].
    /// An empty selection is valid for every known principal.
    pub fn check_assignment(
        &self,
        principal: &PrincipalId,
        context: EditContext,
        requested: &BTreeSet<DomainId>,
        all_affiliates: bool,
    ) -> Result<DomainVisibility> {
        let visibility = self.compute_visible_domains(principal, context)?;

        for domain in requested {
            if !self.registry.exists(domain) {
                warn!(principal = %principal, domain = %domain, "submission names unknown domain");
                return Err(AccessError::NotFound(domain.clone()));
            }
            if !visibility.contains(domain) {
                warn!(principal = %principal, %context, domain = %domain, "domain not assignable");
                return Err(AccessError::DomainNotPermitted {
                    principal: principal.clone(),
                    domain: domain.clone(),
                });
            }
            if visibility.domains.iter().any(|d| &d.id == domain && !d.is_active()) {
                warn!(principal = %principal, domain = %domain, "domain inactive");
                return Err(AccessError::DomainInactive(domain.clone()));
            }
        }

        if all_affiliates && !visibility.broadcast_available {
            warn!(principal = %principal, %context, "all affiliates not available");
            return Err(AccessError::BroadcastNotPermitted(principal.clone()));
        }

        Ok(visibility)
    }

    /// Validates selection and assigns every requested domain to `entity`.
    ///
    /// Assignments only add, so domains the principal cannot see stay on the entity untouched.
    pub fn apply_assignment(
        &self,
        principal: &PrincipalId,
        context: EditContext,
        entity: &EntityRef,
        requested: &BTreeSet<DomainId>,
        all_affiliates: bool,
    ) -> Result<AssignmentOutcome> {
        let visibility = self.check_assignment(principal, context, requested, all_affiliates)?;

        let domains: Vec<DomainId> = visibility
            .domains
            .into_iter()
            .map(|d| d.id)
            .filter(|id| requested.contains(id))
            .collect();
        for domain in &domains {
            self.assignments.assign(entity, domain.clone());
        }

        Ok(AssignmentOutcome {
            entity: entity.clone(),
            domains,
            all_affiliates,
        })
    }

    /// Entity's assigned domains that are still present and active, in registry order
    pub fn entity_domains(&self, entity: &EntityRef) -> Vec<Domain> {
        self.active_assigned(entity)
    }

    fn active_assigned(&self, entity: &EntityRef) -> Vec<Domain> {
        let assigned = self.assignments.assigned_domains(entity);
        if assigned.is_empty() {
            return Vec::new();
        }

        let domains: Vec<Domain> = self
            .registry
            .list_domains()
            .into_iter()
            .filter(|d| d.is_active() && assigned.contains(&d.id))
            .collect();

        let stale = assigned.len() - domains.len();
        if stale > 0 {
            debug!(entity = %entity, stale, "ignoring stale or inactive domain assignments");
        }
        domains
    }
}
