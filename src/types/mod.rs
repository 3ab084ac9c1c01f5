pub mod apiservice;
pub mod container;
pub mod core;
pub mod metadata;
pub mod rbac;
pub mod volume;
pub mod workloads;

pub use apiservice::*;
pub use container::*;
pub use core::*;
pub use metadata::*;
pub use rbac::*;
pub use volume::*;
pub use workloads::*;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};

/// Object rendered into the agent namespace and owned by the agent resource.
pub trait ChildResource {
    type K8sType: kube::Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize;

    fn name(&self) -> &str;
    fn into_k8s(self, namespace: &str, owner_ref: Option<OwnerReference>) -> Self::K8sType;
}

/// Cluster-scoped object. A namespaced owner cannot be referenced from it, so it
/// renders without owner references.
pub trait ClusterChildResource {
    type K8sType: kube::Resource<DynamicType = (), Scope = ClusterResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize;

    fn name(&self) -> &str;
    fn into_k8s(self) -> Self::K8sType;
}
