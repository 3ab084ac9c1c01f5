use super::{Annotations, Labels, Protocol, Selector};
use crate::types::ChildResource;
use k8s_openapi::api::core::v1 as k8s;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

fn object_meta(
    name: String,
    namespace: &str,
    labels: Labels,
    annotations: Annotations,
    owner_ref: Option<OwnerReference>,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(namespace.to_string()),
        labels: labels.into_option(),
        annotations: annotations.into_option(),
        owner_references: owner_ref.map(|r| vec![r]),
        ..Default::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigMap {
    pub name: String,
    pub labels: Labels,
    pub annotations: Annotations,
    pub data: BTreeMap<String, String>,
}

impl ConfigMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            annotations: Annotations::new(),
            data: BTreeMap::new(),
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl ChildResource for ConfigMap {
    type K8sType = k8s::ConfigMap;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: Option<OwnerReference>) -> Self::K8sType {
        k8s::ConfigMap {
            metadata: object_meta(self.name, namespace, self.labels, self.annotations, owner_ref),
            data: if self.data.is_empty() {
                None
            } else {
                Some(self.data)
            },
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Secret {
    pub name: String,
    pub labels: Labels,
    pub string_data: BTreeMap<String, String>,
}

impl Secret {
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            string_data: BTreeMap::new(),
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn string_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.string_data.insert(key.into(), value.into());
        self
    }
}

impl ChildResource for Secret {
    type K8sType = k8s::Secret;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: Option<OwnerReference>) -> Self::K8sType {
        k8s::Secret {
            metadata: object_meta(self.name, namespace, self.labels, Annotations::new(), owner_ref),
            type_: Some("Opaque".to_string()),
            string_data: if self.string_data.is_empty() {
                None
            } else {
                Some(self.string_data)
            },
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub labels: Labels,
    pub selector: Selector,
    pub ports: Vec<ServicePort>,
    pub internal_traffic_policy: Option<String>,
}

impl Service {
    pub fn new(name: impl Into<String>, selector: Selector) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            selector,
            ports: Vec::new(),
            internal_traffic_policy: None,
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn port(mut self, port: ServicePort) -> Self {
        self.ports.push(port);
        self
    }

    /// Routes traffic only to endpoints on the node it originates from.
    pub fn internal_traffic_local(mut self) -> Self {
        self.internal_traffic_policy = Some("Local".to_string());
        self
    }

    pub fn find_port(&self, name: &str) -> Option<&ServicePort> {
        self.ports.iter().find(|p| p.name == name)
    }
}

impl ChildResource for Service {
    type K8sType = k8s::Service;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: Option<OwnerReference>) -> Self::K8sType {
        k8s::Service {
            metadata: object_meta(self.name, namespace, self.labels, Annotations::new(), owner_ref),
            spec: Some(k8s::ServiceSpec {
                selector: Some(self.selector.into_inner()),
                ports: if self.ports.is_empty() {
                    None
                } else {
                    Some(self.ports.into_iter().map(|p| p.into_k8s()).collect())
                },
                internal_traffic_policy: self.internal_traffic_policy,
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServicePort {
    pub name: String,
    pub port: i32,
    pub target_port: IntOrString,
    pub protocol: Protocol,
}

impl ServicePort {
    pub fn tcp(name: impl Into<String>, port: i32, target_port: i32) -> Self {
        Self {
            name: name.into(),
            port,
            target_port: IntOrString::Int(target_port),
            protocol: Protocol::Tcp,
        }
    }

    pub fn udp(name: impl Into<String>, port: i32, target_port: i32) -> Self {
        Self {
            name: name.into(),
            port,
            target_port: IntOrString::Int(target_port),
            protocol: Protocol::Udp,
        }
    }

    pub fn into_k8s(self) -> k8s::ServicePort {
        k8s::ServicePort {
            name: Some(self.name),
            port: self.port,
            target_port: Some(self.target_port),
            protocol: Some(self.protocol.as_str().to_string()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceAccount {
    pub name: String,
    pub labels: Labels,
}

impl ServiceAccount {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }
}

impl ChildResource for ServiceAccount {
    type K8sType = k8s::ServiceAccount;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: Option<OwnerReference>) -> Self::K8sType {
        k8s::ServiceAccount {
            metadata: object_meta(self.name, namespace, self.labels, Annotations::new(), owner_ref),
            ..Default::default()
        }
    }
}
