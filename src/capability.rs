use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

/// Closed vocabulary of domain powers a principal may hold.
///
/// Every capability has a canonical three level name (`Domain::Object::Action`, e.g.
/// `DomainAccess::Publish::Any`) and the permission name a host site shows to administrators
/// (e.g. `publish to any domain`). [Capability::from_string] accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Capability {
    PublishToAnyDomain,
    PublishToAssignedDomains,
    AssignEditorsToAnyDomain,
    AssignDomainEditors,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::PublishToAnyDomain,
        Capability::PublishToAssignedDomains,
        Capability::AssignEditorsToAnyDomain,
        Capability::AssignDomainEditors,
    ];

    /// Returns the domain name, shared by the whole vocabulary
    pub fn domain(&self) -> &'static str {
        "DomainAccess"
    }

    /// Returns the object type (e.g. "Publish", "Editors")
    pub fn object_type(&self) -> &'static str {
        match self {
            Self::PublishToAnyDomain | Self::PublishToAssignedDomains => "Publish",
            Self::AssignEditorsToAnyDomain | Self::AssignDomainEditors => "Editors",
        }
    }

    /// Returns the action name (e.g. "Any", "AssignAssigned")
    pub fn action(&self) -> &'static str {
        match self {
            Self::PublishToAnyDomain => "Any",
            Self::PublishToAssignedDomains => "Assigned",
            Self::AssignEditorsToAnyDomain => "AssignAny",
            Self::AssignDomainEditors => "AssignAssigned",
        }
    }

    /// Returns full permission string (e.g. "DomainAccess::Publish::Any")
    pub fn to_permission_string(&self) -> String {
        format!("{}::{}::{}", self.domain(), self.object_type(), self.action())
    }

    /// Permission name as host sites spell it
    pub fn permission_name(&self) -> &'static str {
        match self {
            Self::PublishToAnyDomain => "publish to any domain",
            Self::PublishToAssignedDomains => "publish to any assigned domain",
            Self::AssignEditorsToAnyDomain => "assign editors to any domain",
            Self::AssignDomainEditors => "assign domain editors",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::PublishToAnyDomain => "Publish content to every domain, including all affiliates",
            Self::PublishToAssignedDomains => "Publish content to the domains the account is assigned to",
            Self::AssignEditorsToAnyDomain => "Assign user accounts to every domain",
            Self::AssignDomainEditors => "Assign user accounts to the domains the account is assigned to",
        }
    }

    /// Parse from canonical string or permission name
    pub fn from_string(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cap| cap.permission_name() == s || cap.to_permission_string() == s)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}::{}", self.domain(), self.object_type(), self.action())
    }
}

impl TryFrom<String> for Capability {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Capability::from_string(&value).ok_or_else(|| format!("unknown capability: {value}"))
    }
}

impl From<Capability> for String {
    fn from(value: Capability) -> Self {
        value.to_permission_string()
    }
}

/// Kind of entity form the evaluation is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditContext {
    /// Content item (article, page, ...) being created or edited.
    Content,
    /// User account being created or edited.
    UserAccount,
}

impl EditContext {
    /// Capability that grants every domain in this context
    pub fn unscoped_capability(self) -> Capability {
        match self {
            Self::Content => Capability::PublishToAnyDomain,
            Self::UserAccount => Capability::AssignEditorsToAnyDomain,
        }
    }

    /// Capability that grants the principal's own domains in this context
    pub fn scoped_capability(self) -> Capability {
        match self {
            Self::Content => Capability::PublishToAssignedDomains,
            Self::UserAccount => Capability::AssignDomainEditors,
        }
    }
}

impl fmt::Display for EditContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Content => f.write_str("content"),
            Self::UserAccount => f.write_str("user_account"),
        }
    }
}

/// How far a principal's domain powers reach within one [EditContext].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessScope {
    Unscoped,
    Scoped,
    None,
}

impl fmt::Display for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unscoped => f.write_str("unscoped"),
            Self::Scoped => f.write_str("scoped"),
            Self::None => f.write_str("none"),
        }
    }
}

/// Effective capabilities of one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Scope granted in `context`. Unscoped wins over scoped, scoped wins over nothing.
    pub fn scope_for(&self, context: EditContext) -> AccessScope {
        if self.contains(context.unscoped_capability()) {
            AccessScope::Unscoped
        } else if self.contains(context.scoped_capability()) {
            AccessScope::Scoped
        } else {
            AccessScope::None
        }
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Capability> for CapabilitySet {
    fn extend<T: IntoIterator<Item = Capability>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(value: [Capability; N]) -> Self {
        value.into_iter().collect()
    }
}
