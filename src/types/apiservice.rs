use super::Labels;
use crate::types::ClusterChildResource;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1 as apireg;

/// Aggregated API registration pointing at an in-cluster Service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiService {
    pub name: String,
    pub labels: Labels,
    pub group: String,
    pub version: String,
    pub service_name: String,
    pub service_namespace: String,
    pub service_port: i32,
    pub group_priority_minimum: i32,
    pub version_priority: i32,
    pub insecure_skip_tls_verify: bool,
}

impl ApiService {
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        let group = group.into();
        let version = version.into();
        Self {
            name: format!("{version}.{group}"),
            labels: Labels::new(),
            group,
            version,
            service_name: String::new(),
            service_namespace: String::new(),
            service_port: 443,
            group_priority_minimum: 100,
            version_priority: 100,
            insecure_skip_tls_verify: false,
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn service(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        port: i32,
    ) -> Self {
        self.service_namespace = namespace.into();
        self.service_name = name.into();
        self.service_port = port;
        self
    }

    pub fn insecure_skip_tls_verify(mut self, value: bool) -> Self {
        self.insecure_skip_tls_verify = value;
        self
    }

}

impl ClusterChildResource for ApiService {
    type K8sType = apireg::APIService;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self) -> Self::K8sType {
        apireg::APIService {
            metadata: ObjectMeta {
                name: Some(self.name),
                labels: self.labels.into_option(),
                ..Default::default()
            },
            spec: Some(apireg::APIServiceSpec {
                group: Some(self.group),
                version: Some(self.version),
                group_priority_minimum: self.group_priority_minimum,
                version_priority: self.version_priority,
                insecure_skip_tls_verify: Some(self.insecure_skip_tls_verify),
                service: Some(apireg::ServiceReference {
                    name: Some(self.service_name),
                    namespace: Some(self.service_namespace),
                    port: Some(self.service_port),
                }),
                ca_bundle: None,
            }),
            status: None,
        }
    }
}
