use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AccessError, AssignmentStore, DomainId, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    #[default]
    Active,
    Inactive,
}

/// Serialized form of [Domain], id is optional and derived from hostname when missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainS {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DomainId>,
    pub hostname: String,
    pub label: String,
    #[serde(default)]
    pub status: DomainStatus,
}

impl From<DomainS> for Domain {
    fn from(value: DomainS) -> Self {
        Domain {
            id: value
                .id
                .unwrap_or_else(|| DomainId::from_hostname(&value.hostname)),
            hostname: value.hostname,
            label: value.label,
            status: value.status,
        }
    }
}

impl From<Domain> for DomainS {
    fn from(value: Domain) -> Self {
        DomainS {
            id: Some(value.id),
            hostname: value.hostname,
            label: value.label,
            status: value.status,
        }
    }
}

/// One site sharing the codebase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DomainS")]
#[serde(into = "DomainS")]
pub struct Domain {
    pub id: DomainId,
    pub hostname: String,
    pub label: String,
    pub status: DomainStatus,
}

impl Domain {
    /// Creates active domain, id derived from hostname
    pub fn new(hostname: &str, label: &str) -> Self {
        Domain {
            id: DomainId::from_hostname(hostname),
            hostname: hostname.to_string(),
            label: label.to_string(),
            status: DomainStatus::Active,
        }
    }

    pub fn with_status(mut self, status: DomainStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == DomainStatus::Active
    }
}

/// Authoritative set of domains. Order of [list_domains][DomainRegistry::list_domains] is canonical
/// and every other listing in this crate follows it.
pub trait DomainRegistry {
    /// All domains in insertion order, never fails
    fn list_domains(&self) -> Vec<Domain>;

    fn exists(&self, id: &DomainId) -> bool;

    /// Direct lookup, fails with [AccessError::NotFound] on unknown id
    fn get(&self, id: &DomainId) -> Result<Domain>;
}

impl<T: DomainRegistry + ?Sized> DomainRegistry for &T {
    fn list_domains(&self) -> Vec<Domain> {
        (**self).list_domains()
    }

    fn exists(&self, id: &DomainId) -> bool {
        (**self).exists(id)
    }

    fn get(&self, id: &DomainId) -> Result<Domain> {
        (**self).get(id)
    }
}

impl<T: DomainRegistry + ?Sized> DomainRegistry for Arc<T> {
    fn list_domains(&self) -> Vec<Domain> {
        (**self).list_domains()
    }

    fn exists(&self, id: &DomainId) -> bool {
        (**self).exists(id)
    }

    fn get(&self, id: &DomainId) -> Result<Domain> {
        (**self).get(id)
    }
}

#[derive(Debug, Default, Clone)]
struct DomainSnapshot {
    domains: Vec<Domain>,
    index: HashMap<DomainId, usize>,
}

impl DomainSnapshot {
    fn lookup(&self, id: &DomainId) -> Option<&Domain> {
        self.index.get(id).map(|&pos| &self.domains[pos])
    }

    fn push(&mut self, domain: Domain) -> Result<()> {
        if self.index.contains_key(&domain.id) {
            return Err(AccessError::DuplicateDomain(domain.id));
        }
        self.index.insert(domain.id.clone(), self.domains.len());
        self.domains.push(domain);
        Ok(())
    }

    fn remove(&mut self, id: &DomainId) -> Option<Domain> {
        let pos = self.index.remove(id)?;
        let removed = self.domains.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(removed)
    }
}

/// In-memory [DomainRegistry]. Readers load the current snapshot without locking,
/// writers are serialized and publish a modified copy.
#[derive(Debug, Default)]
pub struct InMemoryDomainRegistry {
    snapshot: ArcSwap<DomainSnapshot>,
    writer: Mutex<()>,
}

impl InMemoryDomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates registry from domains, keeping given order
    pub fn with_domains(domains: impl IntoIterator<Item = Domain>) -> Result<Self> {
        let mut snapshot = DomainSnapshot::default();
        for domain in domains {
            snapshot.push(domain)?;
        }
        Ok(Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            writer: Mutex::new(()),
        })
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn modify<T>(&self, f: impl FnOnce(&mut DomainSnapshot) -> Result<T>) -> Result<T> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.snapshot.load().as_ref().clone();
        let out = f(&mut next)?;
        self.snapshot.store(Arc::new(next));
        Ok(out)
    }

    /// Appends new domain at the end of canonical order
    pub fn create(&self, domain: Domain) -> Result<()> {
        let id = domain.id.clone();
        self.modify(|snapshot| snapshot.push(domain))?;
        info!(domain = %id, "domain created");
        Ok(())
    }

    pub fn set_label(&self, id: &DomainId, label: &str) -> Result<()> {
        self.modify(|snapshot| {
            let pos = *snapshot
                .index
                .get(id)
                .ok_or_else(|| AccessError::NotFound(id.clone()))?;
            snapshot.domains[pos].label = label.to_string();
            Ok(())
        })?;
        info!(domain = %id, label, "domain relabeled");
        Ok(())
    }

    pub fn set_status(&self, id: &DomainId, status: DomainStatus) -> Result<()> {
        self.modify(|snapshot| {
            let pos = *snapshot
                .index
                .get(id)
                .ok_or_else(|| AccessError::NotFound(id.clone()))?;
            snapshot.domains[pos].status = status;
            Ok(())
        })?;
        info!(domain = %id, ?status, "domain status changed");
        Ok(())
    }

    /// Removes domain that no entity is assigned to anymore.
    ///
    /// Fails with [AccessError::DomainInUse] while `assignments` still reference it; release them first
    /// (e.g. [InMemoryAssignmentStore::release_domain][crate::InMemoryAssignmentStore::release_domain]).
    /// The check is best-effort: an `assign` racing with removal may leave a stale reference, which reads filter out.
    pub fn remove(&self, id: &DomainId, assignments: &impl AssignmentStore) -> Result<Domain> {
        let removed = self.modify(|snapshot| {
            if snapshot.lookup(id).is_none() {
                return Err(AccessError::NotFound(id.clone()));
            }
            let references = assignments.references(id);
            if references > 0 {
                return Err(AccessError::DomainInUse {
                    domain: id.clone(),
                    references,
                });
            }
            snapshot
                .remove(id)
                .ok_or_else(|| AccessError::NotFound(id.clone()))
        })?;
        info!(domain = %id, "domain removed");
        Ok(removed)
    }
}

impl DomainRegistry for InMemoryDomainRegistry {
    fn list_domains(&self) -> Vec<Domain> {
        self.snapshot.load().domains.clone()
    }

    fn exists(&self, id: &DomainId) -> bool {
        self.snapshot.load().index.contains_key(id)
    }

    fn get(&self, id: &DomainId) -> Result<Domain> {
        self.snapshot
            .load()
            .lookup(id)
            .cloned()
            .ok_or_else(|| AccessError::NotFound(id.clone()))
    }
}
