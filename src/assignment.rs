use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use arc_swap::ArcSwap;
use tracing::info;

use crate::{DomainId, EntityRef};

/// Maps user accounts and content items to the domains they are assigned to.
pub trait AssignmentStore {
    /// Assigned domain ids, empty set for entities never assigned
    fn assigned_domains(&self, entity: &EntityRef) -> BTreeSet<DomainId>;

    /// Adds `domain` to entity's set. Idempotent.
    fn assign(&self, entity: &EntityRef, domain: DomainId);

    /// Number of entities currently assigned to `domain`
    fn references(&self, domain: &DomainId) -> usize;
}

impl<T: AssignmentStore + ?Sized> AssignmentStore for &T {
    fn assigned_domains(&self, entity: &EntityRef) -> BTreeSet<DomainId> {
        (**self).assigned_domains(entity)
    }

    fn assign(&self, entity: &EntityRef, domain: DomainId) {
        (**self).assign(entity, domain)
    }

    fn references(&self, domain: &DomainId) -> usize {
        (**self).references(domain)
    }
}

impl<T: AssignmentStore + ?Sized> AssignmentStore for Arc<T> {
    fn assigned_domains(&self, entity: &EntityRef) -> BTreeSet<DomainId> {
        (**self).assigned_domains(entity)
    }

    fn assign(&self, entity: &EntityRef, domain: DomainId) {
        (**self).assign(entity, domain)
    }

    fn references(&self, domain: &DomainId) -> usize {
        (**self).references(domain)
    }
}

/// In-memory [AssignmentStore] publishing copy-on-write snapshots.
#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    assignments: ArcSwap<HashMap<EntityRef, BTreeSet<DomainId>>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unassigns `domain` from every entity, returns number of entities affected.
    /// Entities left without domains keep an empty set.
    pub fn release_domain(&self, domain: &DomainId) -> usize {
        let previous = self.assignments.rcu(|current| {
            let mut next = HashMap::clone(current);
            for domains in next.values_mut() {
                domains.remove(domain);
            }
            next
        });
        let released = previous
            .values()
            .filter(|domains| domains.contains(domain))
            .count();
        info!(domain = %domain, released, "domain released from assignments");
        released
    }

    /// Entities known to the store, in no particular order
    pub fn entities(&self) -> Vec<EntityRef> {
        self.assignments.load().keys().cloned().collect()
    }
}

impl AssignmentStore for InMemoryAssignmentStore {
    fn assigned_domains(&self, entity: &EntityRef) -> BTreeSet<DomainId> {
        self.assignments
            .load()
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    fn assign(&self, entity: &EntityRef, domain: DomainId) {
        if self
            .assignments
            .load()
            .get(entity)
            .is_some_and(|domains| domains.contains(&domain))
        {
            return;
        }

        self.assignments.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.entry(entity.clone())
                .or_default()
                .insert(domain.clone());
            next
        });
        info!(entity = %entity, domain = %domain, "domain assigned");
    }

    fn references(&self, domain: &DomainId) -> usize {
        self.assignments
            .load()
            .values()
            .filter(|domains| domains.contains(domain))
            .count()
    }
}
