use super::{key, DependencyStore};
use crate::types::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, ServiceAccount,
    Subject,
};

/// Accumulates RBAC objects. Rules and subjects are unioned, never replaced.
pub struct RbacManager<'a> {
    store: &'a mut DependencyStore,
}

impl<'a> RbacManager<'a> {
    pub(crate) fn new(store: &'a mut DependencyStore) -> Self {
        Self { store }
    }

    pub fn add_service_account(&mut self, namespace: &str, name: &str) {
        self.store
            .service_accounts
            .entry(key(namespace, name))
            .or_insert_with(|| ServiceAccount::new(name));
    }

    /// Adds `rules` to the Role `role_name` and binds it to `sa_name` through a
    /// RoleBinding of the same name.
    pub fn add_policy_rules(
        &mut self,
        namespace: &str,
        role_name: &str,
        sa_name: &str,
        rules: Vec<PolicyRule>,
    ) {
        let role = self
            .store
            .roles
            .entry(key(namespace, role_name))
            .or_insert_with(|| Role::new(role_name));
        for rule in rules {
            role.add_rule(rule);
        }
        self.add_role_binding(namespace, role_name, namespace, sa_name, RoleRef::role(role_name));
    }

    pub fn add_role_binding(
        &mut self,
        namespace: &str,
        name: &str,
        sa_namespace: &str,
        sa_name: &str,
        role_ref: RoleRef,
    ) {
        let binding = self
            .store
            .role_bindings
            .entry(key(namespace, name))
            .or_insert_with(|| RoleBinding::new(name, role_ref.clone()));
        binding.role_ref = role_ref;
        binding.add_subject(Subject::service_account(sa_name, sa_namespace));
    }

    /// Adds `rules` to the ClusterRole `role_name` and binds it to `namespace/sa_name`
    /// through a ClusterRoleBinding of the same name.
    pub fn add_cluster_policy_rules(
        &mut self,
        namespace: &str,
        role_name: &str,
        sa_name: &str,
        rules: Vec<PolicyRule>,
    ) {
        let role = self
            .store
            .cluster_roles
            .entry(role_name.to_string())
            .or_insert_with(|| ClusterRole::new(role_name));
        for rule in rules {
            role.add_rule(rule);
        }
        self.add_cluster_role_binding(
            namespace,
            role_name,
            sa_name,
            RoleRef::cluster_role(role_name),
        );
    }

    pub fn add_cluster_role_binding(
        &mut self,
        namespace: &str,
        name: &str,
        sa_name: &str,
        role_ref: RoleRef,
    ) {
        let binding = self
            .store
            .cluster_role_bindings
            .entry(name.to_string())
            .or_insert_with(|| ClusterRoleBinding::new(name, role_ref.clone()));
        binding.role_ref = role_ref;
        binding.add_subject(Subject::service_account(sa_name, namespace));
    }
}
