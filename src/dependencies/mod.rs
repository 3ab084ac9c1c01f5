pub mod api_service;
pub mod config_map;
pub mod rbac;
pub mod secret;
pub mod service;
pub mod version;

pub use api_service::ApiServiceManager;
pub use config_map::ConfigMapManager;
pub use rbac::RbacManager;
pub use secret::SecretManager;
pub use service::ServiceManager;
pub use version::VersionInfo;

use k8s_openapi::api::core::v1 as core;
use k8s_openapi::api::rbac::v1 as rbac_k8s;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1 as apireg;
use std::collections::BTreeMap;

use crate::types::{
    ApiService, ChildResource, ClusterChildResource, ClusterRole, ClusterRoleBinding, ConfigMap,
    Labels, Role, RoleBinding, Secret, Service, ServiceAccount,
};

/// `(namespace, name)` of a namespaced object.
pub type ObjectKey = (String, String);

fn key(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

/// Auxiliary objects declared by features during one reconcile.
///
/// Every collection is an ordered map so rendering is independent of the order
/// in which features declared their objects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyStore {
    common_labels: Labels,
    pub(crate) services: BTreeMap<ObjectKey, Service>,
    pub(crate) secrets: BTreeMap<ObjectKey, Secret>,
    pub(crate) config_maps: BTreeMap<ObjectKey, ConfigMap>,
    pub(crate) service_accounts: BTreeMap<ObjectKey, ServiceAccount>,
    pub(crate) roles: BTreeMap<ObjectKey, Role>,
    pub(crate) role_bindings: BTreeMap<ObjectKey, RoleBinding>,
    pub(crate) cluster_roles: BTreeMap<String, ClusterRole>,
    pub(crate) cluster_role_bindings: BTreeMap<String, ClusterRoleBinding>,
    pub(crate) api_services: BTreeMap<String, ApiService>,
}

impl DependencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels stamped on every rendered object, below the object's own labels.
    pub fn common_labels(mut self, labels: Labels) -> Self {
        self.common_labels = labels;
        self
    }

    pub fn service(&self, namespace: &str, name: &str) -> Option<&Service> {
        self.services.get(&key(namespace, name))
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<&Secret> {
        self.secrets.get(&key(namespace, name))
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<&ConfigMap> {
        self.config_maps.get(&key(namespace, name))
    }

    pub fn service_account(&self, namespace: &str, name: &str) -> Option<&ServiceAccount> {
        self.service_accounts.get(&key(namespace, name))
    }

    pub fn role(&self, namespace: &str, name: &str) -> Option<&Role> {
        self.roles.get(&key(namespace, name))
    }

    pub fn role_binding(&self, namespace: &str, name: &str) -> Option<&RoleBinding> {
        self.role_bindings.get(&key(namespace, name))
    }

    pub fn cluster_role(&self, name: &str) -> Option<&ClusterRole> {
        self.cluster_roles.get(name)
    }

    pub fn cluster_role_binding(&self, name: &str) -> Option<&ClusterRoleBinding> {
        self.cluster_role_bindings.get(name)
    }

    pub fn api_service(&self, name: &str) -> Option<&ApiService> {
        self.api_services.get(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
            + self.secrets.len()
            + self.config_maps.len()
            + self.service_accounts.len()
            + self.roles.len()
            + self.role_bindings.len()
            + self.cluster_roles.len()
            + self.cluster_role_bindings.len()
            + self.api_services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders every object. Namespaced objects carry `owner_ref`; cluster-scoped
    /// objects cannot be owned by a namespaced resource and only get labels.
    pub fn render(self, owner_ref: Option<OwnerReference>) -> RenderedDependencies {
        let common = &self.common_labels;
        let mut out = RenderedDependencies::default();

        for ((ns, _), mut obj) in self.services {
            obj.labels = merge_labels(common, obj.labels);
            out.services.push(obj.into_k8s(&ns, owner_ref.clone()));
        }
        for ((ns, _), mut obj) in self.secrets {
            obj.labels = merge_labels(common, obj.labels);
            out.secrets.push(obj.into_k8s(&ns, owner_ref.clone()));
        }
        for ((ns, _), mut obj) in self.config_maps {
            obj.labels = merge_labels(common, obj.labels);
            out.config_maps.push(obj.into_k8s(&ns, owner_ref.clone()));
        }
        for ((ns, _), mut obj) in self.service_accounts {
            obj.labels = merge_labels(common, obj.labels);
            out.service_accounts.push(obj.into_k8s(&ns, owner_ref.clone()));
        }
        for ((ns, _), mut obj) in self.roles {
            obj.labels = merge_labels(common, obj.labels);
            out.roles.push(obj.into_k8s(&ns, owner_ref.clone()));
        }
        for ((ns, _), mut obj) in self.role_bindings {
            obj.labels = merge_labels(common, obj.labels);
            out.role_bindings.push(obj.into_k8s(&ns, owner_ref.clone()));
        }
        for (_, mut obj) in self.cluster_roles {
            obj.labels = merge_labels(common, obj.labels);
            out.cluster_roles.push(obj.into_k8s());
        }
        for (_, mut obj) in self.cluster_role_bindings {
            obj.labels = merge_labels(common, obj.labels);
            out.cluster_role_bindings.push(obj.into_k8s());
        }
        for (_, mut obj) in self.api_services {
            obj.labels = merge_labels(common, obj.labels);
            out.api_services.push(obj.into_k8s());
        }

        out
    }
}

fn merge_labels(common: &Labels, own: Labels) -> Labels {
    let mut labels = common.clone();
    labels.0.extend(own.0);
    labels
}

/// Kubernetes objects produced from a [`DependencyStore`].
#[derive(Clone, Debug, Default)]
pub struct RenderedDependencies {
    pub services: Vec<core::Service>,
    pub secrets: Vec<core::Secret>,
    pub config_maps: Vec<core::ConfigMap>,
    pub service_accounts: Vec<core::ServiceAccount>,
    pub roles: Vec<rbac_k8s::Role>,
    pub role_bindings: Vec<rbac_k8s::RoleBinding>,
    pub cluster_roles: Vec<rbac_k8s::ClusterRole>,
    pub cluster_role_bindings: Vec<rbac_k8s::ClusterRoleBinding>,
    pub api_services: Vec<apireg::APIService>,
}

impl RenderedDependencies {
    pub fn len(&self) -> usize {
        self.services.len()
            + self.secrets.len()
            + self.config_maps.len()
            + self.service_accounts.len()
            + self.roles.len()
            + self.role_bindings.len()
            + self.cluster_roles.len()
            + self.cluster_role_bindings.len()
            + self.api_services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builders for auxiliary objects plus read-only cluster facts.
#[derive(Clone, Debug, Default)]
pub struct ResourceManagers {
    store: DependencyStore,
    version: VersionInfo,
}

impl ResourceManagers {
    pub fn new(store: DependencyStore, version: VersionInfo) -> Self {
        Self { store, version }
    }

    pub fn store(&self) -> &DependencyStore {
        &self.store
    }

    pub fn into_store(self) -> DependencyStore {
        self.store
    }

    pub fn version_info(&self) -> &VersionInfo {
        &self.version
    }

    pub fn service(&mut self) -> ServiceManager<'_> {
        ServiceManager::new(&mut self.store)
    }

    pub fn rbac(&mut self) -> RbacManager<'_> {
        RbacManager::new(&mut self.store)
    }

    pub fn secret(&mut self) -> SecretManager<'_> {
        SecretManager::new(&mut self.store)
    }

    pub fn config_map(&mut self) -> ConfigMapManager<'_> {
        ConfigMapManager::new(&mut self.store)
    }

    pub fn api_service(&mut self) -> ApiServiceManager<'_> {
        ApiServiceManager::new(&mut self.store)
    }
}
