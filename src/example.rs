// ============================================================================
// Fixtures - five sites and the accounts that edit them
// ============================================================================
#[cfg(test)]
pub mod test {
    use std::sync::Arc;

    use crate::{
        AccessEvaluator, AssignmentStore, ConfiguredEvaluator, Domain, DomainId, EntityRef,
        InMemoryAssignmentStore, InMemoryDomainRegistry, PrincipalId, Role, RoleResolver,
    };

    pub const TEST_HOSTNAMES: [&str; 5] = [
        "example.com",
        "one.example.com",
        "two.example.com",
        "three.example.com",
        "four.example.com",
    ];

    pub const TEST_LABELS: [&str; 5] = ["Example", "One", "Two", "Three", "Four"];

    /// First `count` test domains, all active
    pub fn create_test_domains(count: usize) -> Vec<Domain> {
        TEST_HOSTNAMES
            .iter()
            .zip(TEST_LABELS)
            .take(count)
            .map(|(hostname, label)| Domain::new(hostname, label))
            .collect()
    }

    pub fn domain_id(index: usize) -> DomainId {
        DomainId::from_hostname(TEST_HOSTNAMES[index])
    }

    pub fn principal(id: &str) -> PrincipalId {
        PrincipalId::from(id)
    }

    pub fn setup_resolver() -> RoleResolver {
        // Setup roles (normally loaded from DB)
        let mut builder = RoleResolver::builder();

        builder.add_role(Role::new(
            "ContentAdmin",
            vec![
                "create article content".to_string(),
                "publish to any domain".to_string(),
            ],
        ));
        builder.add_role(Role::new(
            "ContentEditor",
            vec![
                "create article content".to_string(),
                "publish to any assigned domain".to_string(),
            ],
        ));
        builder.add_role(Role::new(
            "Writer",
            vec!["create article content".to_string()],
        ));
        builder.add_role(Role::new(
            "UserAdmin",
            vec![
                "administer users".to_string(),
                "assign editors to any domain".to_string(),
            ],
        ));
        builder.add_role(Role::new(
            "UserEditor",
            vec![
                "administer users".to_string(),
                "DomainAccess::Editors::{AssignAssigned}".to_string(),
            ],
        ));
        builder.add_role(Role::new(
            "AccountManager",
            vec!["administer users".to_string()],
        ));
        builder.add_role(Role::new(
            "Bypass",
            vec![
                "bypass node access".to_string(),
                "DomainAccess::Publish::Any".to_string(),
            ],
        ));
        builder.add_role(Role::new(
            "Authenticated",
            vec!["change own username".to_string()],
        ));
        builder.set_fallback_roles(vec!["Authenticated".to_string()]);

        builder
            .add_principal("user1", vec!["ContentAdmin".to_string()])
            .add_principal("user2", vec!["ContentEditor".to_string()])
            .add_principal("user3", vec!["Writer".to_string()])
            .add_principal("user4", vec!["UserAdmin".to_string()])
            .add_principal("user5", vec!["UserEditor".to_string()])
            .add_principal("user6", vec!["AccountManager".to_string()])
            .add_principal("user7", vec!["Bypass".to_string()])
            .add_principal("user8", vec![]);

        builder.build()
    }

    /// Five domains; user2 assigned to "three.example.com", user5 to "one.example.com"
    pub fn setup_evaluator() -> ConfiguredEvaluator {
        let registry = InMemoryDomainRegistry::with_domains(create_test_domains(5))
            .expect("test domains are unique");
        let assignments = InMemoryAssignmentStore::new();
        assignments.assign(&EntityRef::user("user2"), domain_id(3));
        assignments.assign(&EntityRef::user("user5"), domain_id(1));

        AccessEvaluator::new(
            Arc::new(registry),
            Arc::new(assignments),
            Arc::new(setup_resolver()),
        )
    }
}
