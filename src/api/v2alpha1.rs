use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::component::ComponentKind;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "datadoghq.com",
    version = "v2alpha1",
    kind = "DatadogAgent",
    namespaced,
    status = "DatadogAgentStatus",
    shortname = "dd"
)]
#[serde(rename_all = "camelCase")]
pub struct DatadogAgentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<DatadogFeatures>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalConfig>,

    /// Per-component overrides keyed by `nodeAgent`, `clusterAgent` or `clusterChecksRunner`.
    #[serde(default, rename = "override", skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, ComponentOverride>,
}

impl DatadogAgentSpec {
    pub fn component_override(&self, kind: ComponentKind) -> Option<&ComponentOverride> {
        self.overrides.get(kind.override_key())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatadogFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apm: Option<ApmFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp: Option<OtlpFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_controller: Option<AdmissionControllerFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_metrics_server: Option<ExternalMetricsServerFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm: Option<NpmFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cws: Option<CwsFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_queue_length: Option<EnabledFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oom_kill: Option<EnabledFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_state_metrics_core: Option<KubeStateMetricsCoreFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_checks: Option<ClusterChecksFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dogstatsd: Option<DogstatsdFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_collection: Option<LogCollectionFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_process_collection: Option<LiveProcessFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_container_collection: Option<LiveContainerFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_explorer: Option<OrchestratorExplorerFeatureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus_scrape: Option<PrometheusScrapeFeatureConfig>,
}

/// Configuration for features that are a single on/off switch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnabledFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostPortConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnixDomainSocketConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApmFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port_config: Option<HostPortConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unix_domain_socket_config: Option<UnixDomainSocketConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_step_instrumentation: Option<SingleStepInstrumentation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SingleStepInstrumentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_namespaces: Vec<String>,
    /// Tracer library versions keyed by language.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lib_versions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtlpFeatureConfig {
    #[serde(default)]
    pub receiver: OtlpReceiverConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtlpReceiverConfig {
    #[serde(default)]
    pub protocols: OtlpProtocolsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtlpProtocolsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc: Option<OtlpEndpointConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<OtlpEndpointConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtlpEndpointConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// `host:port` the receiver listens on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionControllerFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutate_unlabelled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// One of `hostip`, `service` or `socket`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_communication_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetricsServerFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_api_service: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wpa_controller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_datadog_metrics: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<DatadogCredentials>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NpmFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_conntrack: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect_dns_stats: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CwsFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syscall_monitor_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_policies: Option<ConfigMapRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeStateMetricsCoreFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf: Option<CustomConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterChecksFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cluster_checks_runners: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DogstatsdFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_detection_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_cardinality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port_config: Option<HostPortConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unix_domain_socket_config: Option<UnixDomainSocketConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogCollectionFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_collect_all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_collect_using_files: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_log_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_log_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_symlinks_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_files_limit: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiveProcessFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrub_process_arguments: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_process_arguments: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiveContainerFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Collect from the core agent instead of the process agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_in_core_agent: Option<EnabledFeatureConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorExplorerFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf: Option<CustomConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrub_containers: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dd_url: Option<String>,
    /// Custom resources to collect, as `group/version/resource`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_resources: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusScrapeFeatureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_service_endpoints: Option<bool>,
    /// YAML list of additional openmetrics check configurations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_configs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapRef {
    pub name: String,
}

/// Inline configuration data or a reference to an existing ConfigMap.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub secret_name: String,
    pub key_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatadogCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<SecretRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerStrategy {
    #[default]
    Optimized,
    SingleProcess,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_enable_local_service: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<DatadogCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_agent_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_agent_token_secret: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_service: Option<LocalService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_strategy: Option<ContainerStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_non_resource_rules: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOverride {
    /// Removes the component even when a feature requires it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatadogAgentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_agent: Option<DeploymentStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_token: Option<String>,
}

impl DatadogAgent {
    pub fn features(&self) -> Option<&DatadogFeatures> {
        self.spec.features.as_ref()
    }

    pub fn global(&self) -> Option<&GlobalConfig> {
        self.spec.global.as_ref()
    }

    pub fn container_strategy(&self) -> ContainerStrategy {
        self.global()
            .and_then(|g| g.container_strategy)
            .unwrap_or_default()
    }

    pub fn registry(&self) -> Option<&str> {
        self.global().and_then(|g| g.registry.as_deref())
    }

    pub fn force_enable_local_service(&self) -> bool {
        self.global()
            .and_then(|g| g.local_service.as_ref())
            .and_then(|l| l.force_enable_local_service)
            .unwrap_or(false)
    }

    pub fn local_service_name_override(&self) -> Option<&str> {
        self.global()
            .and_then(|g| g.local_service.as_ref())
            .and_then(|l| l.name_override.as_deref())
    }

    /// Cluster agent token persisted by an earlier reconcile.
    pub fn generated_token(&self) -> Option<&String> {
        self.status
            .as_ref()?
            .cluster_agent
            .as_ref()?
            .generated_token
            .as_ref()
    }
}
