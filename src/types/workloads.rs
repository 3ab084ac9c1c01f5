use super::{Annotations, Container, Labels, Selector, Volume};
use crate::types::ChildResource;
use k8s_openapi::api::apps::v1 as apps;
use k8s_openapi::api::core::v1 as core;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Pod template accumulated by features before it is wrapped in a workload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodTemplate {
    pub labels: Labels,
    pub annotations: Annotations,
    pub containers: Vec<Container>,
    pub init_containers: Vec<Container>,
    pub volumes: Vec<Volume>,
    pub service_account: Option<String>,
    pub host_pid: bool,
}

impl PodTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    pub fn init_container(mut self, container: Container) -> Self {
        self.init_containers.push(container);
        self
    }

    pub fn volume(mut self, volume: Volume) -> Self {
        self.volumes.push(volume);
        self
    }

    pub fn service_account(mut self, name: impl Into<String>) -> Self {
        self.service_account = Some(name.into());
        self
    }

    pub fn container_named(&self, name: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.name == name)
    }

    pub fn container_named_mut(&mut self, name: &str) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| c.name == name)
    }

    pub fn init_container_named(&self, name: &str) -> Option<&Container> {
        self.init_containers.iter().find(|c| c.name == name)
    }

    pub fn init_container_named_mut(&mut self, name: &str) -> Option<&mut Container> {
        self.init_containers.iter_mut().find(|c| c.name == name)
    }

    pub fn volume_named(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.name == name)
    }

    pub fn into_k8s(self) -> core::PodTemplateSpec {
        core::PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: self.labels.into_option(),
                annotations: self.annotations.into_option(),
                ..Default::default()
            }),
            spec: Some(core::PodSpec {
                containers: self.containers.into_iter().map(|c| c.into_k8s()).collect(),
                init_containers: if self.init_containers.is_empty() {
                    None
                } else {
                    Some(
                        self.init_containers
                            .into_iter()
                            .map(|c| c.into_k8s())
                            .collect(),
                    )
                },
                volumes: if self.volumes.is_empty() {
                    None
                } else {
                    Some(self.volumes.into_iter().map(|v| v.into_k8s()).collect())
                },
                service_account_name: self.service_account,
                host_pid: if self.host_pid { Some(true) } else { None },
                ..Default::default()
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Deployment {
    pub name: String,
    pub replicas: i32,
    pub labels: Labels,
    pub selector: Selector,
    pub template: PodTemplate,
}

impl Deployment {
    pub fn new(name: impl Into<String>, selector: Selector, template: PodTemplate) -> Self {
        Self {
            name: name.into(),
            replicas: 1,
            labels: Labels::new(),
            selector,
            template,
        }
    }

    pub fn replicas(mut self, n: i32) -> Self {
        self.replicas = n;
        self
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }
}

impl ChildResource for Deployment {
    type K8sType = apps::Deployment;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: Option<OwnerReference>) -> Self::K8sType {
        apps::Deployment {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(namespace.to_string()),
                labels: self.labels.into_option(),
                owner_references: owner_ref.map(|r| vec![r]),
                ..Default::default()
            },
            spec: Some(apps::DeploymentSpec {
                replicas: Some(self.replicas),
                selector: LabelSelector {
                    match_labels: Some(self.selector.into_inner()),
                    match_expressions: None,
                },
                template: self.template.into_k8s(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct DaemonSet {
    pub name: String,
    pub labels: Labels,
    pub selector: Selector,
    pub template: PodTemplate,
    pub max_unavailable: Option<String>,
}

impl DaemonSet {
    pub fn new(name: impl Into<String>, selector: Selector, template: PodTemplate) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            selector,
            template,
            max_unavailable: None,
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn max_unavailable(mut self, value: impl Into<String>) -> Self {
        self.max_unavailable = Some(value.into());
        self
    }
}

impl ChildResource for DaemonSet {
    type K8sType = apps::DaemonSet;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: Option<OwnerReference>) -> Self::K8sType {
        apps::DaemonSet {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(namespace.to_string()),
                labels: self.labels.into_option(),
                owner_references: owner_ref.map(|r| vec![r]),
                ..Default::default()
            },
            spec: Some(apps::DaemonSetSpec {
                selector: LabelSelector {
                    match_labels: Some(self.selector.into_inner()),
                    match_expressions: None,
                },
                template: self.template.into_k8s(),
                update_strategy: self.max_unavailable.map(|value| {
                    apps::DaemonSetUpdateStrategy {
                        type_: Some("RollingUpdate".to_string()),
                        rolling_update: Some(apps::RollingUpdateDaemonSet {
                            max_unavailable: Some(IntOrString::String(value)),
                            max_surge: None,
                        }),
                    }
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
