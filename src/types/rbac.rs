use super::Labels;
use crate::types::{ChildResource, ClusterChildResource};
use k8s_openapi::api::rbac::v1 as k8s;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

pub const GET_VERB: &str = "get";
pub const LIST_VERB: &str = "list";
pub const WATCH_VERB: &str = "watch";
pub const CREATE_VERB: &str = "create";
pub const UPDATE_VERB: &str = "update";
pub const PATCH_VERB: &str = "patch";
pub const DELETE_VERB: &str = "delete";

fn rules_into_k8s(rules: Vec<PolicyRule>) -> Option<Vec<k8s::PolicyRule>> {
    if rules.is_empty() {
        None
    } else {
        Some(rules.into_iter().map(|r| r.into_k8s()).collect())
    }
}

fn subjects_into_k8s(subjects: Vec<Subject>) -> Option<Vec<k8s::Subject>> {
    if subjects.is_empty() {
        None
    } else {
        Some(subjects.into_iter().map(|s| s.into_k8s()).collect())
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub labels: Labels,
    pub rules: Vec<PolicyRule>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            rules: Vec::new(),
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Appends `rule` unless an identical rule is already present.
    pub fn add_rule(&mut self, rule: PolicyRule) {
        push_unique(&mut self.rules, rule);
    }
}

impl ChildResource for Role {
    type K8sType = k8s::Role;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: Option<OwnerReference>) -> Self::K8sType {
        k8s::Role {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(namespace.to_string()),
                labels: self.labels.into_option(),
                owner_references: owner_ref.map(|r| vec![r]),
                ..Default::default()
            },
            rules: rules_into_k8s(self.rules),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterRole {
    pub name: String,
    pub labels: Labels,
    pub rules: Vec<PolicyRule>,
}

impl ClusterRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            rules: Vec::new(),
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn add_rule(&mut self, rule: PolicyRule) {
        push_unique(&mut self.rules, rule);
    }

}

impl ClusterChildResource for ClusterRole {
    type K8sType = k8s::ClusterRole;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self) -> Self::K8sType {
        k8s::ClusterRole {
            metadata: ObjectMeta {
                name: Some(self.name),
                labels: self.labels.into_option(),
                ..Default::default()
            },
            rules: rules_into_k8s(self.rules),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleBinding {
    pub name: String,
    pub labels: Labels,
    pub role_ref: RoleRef,
    pub subjects: Vec<Subject>,
}

impl RoleBinding {
    pub fn new(name: impl Into<String>, role_ref: RoleRef) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            role_ref,
            subjects: Vec::new(),
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn add_subject(&mut self, subject: Subject) {
        push_unique(&mut self.subjects, subject);
    }
}

impl ChildResource for RoleBinding {
    type K8sType = k8s::RoleBinding;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: Option<OwnerReference>) -> Self::K8sType {
        k8s::RoleBinding {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(namespace.to_string()),
                labels: self.labels.into_option(),
                owner_references: owner_ref.map(|r| vec![r]),
                ..Default::default()
            },
            role_ref: self.role_ref.into_k8s(),
            subjects: subjects_into_k8s(self.subjects),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterRoleBinding {
    pub name: String,
    pub labels: Labels,
    pub role_ref: RoleRef,
    pub subjects: Vec<Subject>,
}

impl ClusterRoleBinding {
    pub fn new(name: impl Into<String>, role_ref: RoleRef) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            role_ref,
            subjects: Vec::new(),
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn add_subject(&mut self, subject: Subject) {
        push_unique(&mut self.subjects, subject);
    }

}

impl ClusterChildResource for ClusterRoleBinding {
    type K8sType = k8s::ClusterRoleBinding;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self) -> Self::K8sType {
        k8s::ClusterRoleBinding {
            metadata: ObjectMeta {
                name: Some(self.name),
                labels: self.labels.into_option(),
                ..Default::default()
            },
            role_ref: self.role_ref.into_k8s(),
            subjects: subjects_into_k8s(self.subjects),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyRule {
    pub api_groups: Vec<String>,
    pub resources: Vec<String>,
    pub resource_names: Vec<String>,
    pub non_resource_urls: Vec<String>,
    pub verbs: Vec<String>,
}

impl PolicyRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_groups(mut self, groups: &[&str]) -> Self {
        self.api_groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn core_api(self) -> Self {
        self.api_groups(&[""])
    }

    pub fn resources(mut self, resources: &[&str]) -> Self {
        self.resources = resources.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn resource_names(mut self, names: &[&str]) -> Self {
        self.resource_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn non_resource_urls(mut self, urls: &[&str]) -> Self {
        self.non_resource_urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn verbs(mut self, verbs: &[&str]) -> Self {
        self.verbs = verbs.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn read_only(self) -> Self {
        self.verbs(&[GET_VERB, LIST_VERB, WATCH_VERB])
    }

    pub fn into_k8s(self) -> k8s::PolicyRule {
        let non_empty = |v: Vec<String>| if v.is_empty() { None } else { Some(v) };
        k8s::PolicyRule {
            api_groups: non_empty(self.api_groups),
            resources: non_empty(self.resources),
            resource_names: non_empty(self.resource_names),
            non_resource_urls: non_empty(self.non_resource_urls),
            verbs: self.verbs,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleRef {
    pub kind: String,
    pub name: String,
    pub api_group: String,
}

impl RoleRef {
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            kind: "Role".to_string(),
            name: name.into(),
            api_group: RBAC_API_GROUP.to_string(),
        }
    }

    pub fn cluster_role(name: impl Into<String>) -> Self {
        Self {
            kind: "ClusterRole".to_string(),
            name: name.into(),
            api_group: RBAC_API_GROUP.to_string(),
        }
    }

    pub fn into_k8s(self) -> k8s::RoleRef {
        k8s::RoleRef {
            kind: self.kind,
            name: self.name,
            api_group: self.api_group,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

impl Subject {
    pub fn service_account(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: "ServiceAccount".to_string(),
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    pub fn into_k8s(self) -> k8s::Subject {
        k8s::Subject {
            kind: self.kind,
            name: self.name,
            namespace: self.namespace,
            api_group: None,
        }
    }
}
