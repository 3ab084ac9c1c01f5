use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::v2alpha1::OtlpFeatureConfig;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "datadoghq.com",
    version = "v1alpha1",
    kind = "DatadogAgent",
    namespaced,
    status = "DatadogAgentStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DatadogAgentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<AgentCredentials>,
    #[serde(default)]
    pub agent: NodeAgentSpec,
    #[serde(default)]
    pub cluster_agent: ClusterAgentSpec,
    #[serde(default)]
    pub cluster_checks_runner: ClusterChecksRunnerSpec,
    #[serde(default)]
    pub features: DatadogFeatures,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnixDomainSocket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_filepath: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeAgentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apm: Option<ApmSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_probe: Option<SystemProbeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecuritySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<NodeAgentConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_service: Option<LocalService>,
    /// Receiver block shared with the current schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp: Option<OtlpFeatureConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApmSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unix_domain_socket: Option<UnixDomainSocket>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_collection_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemProbeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(
        default,
        rename = "enableTCPQueueLength",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_tcp_queue_length: Option<bool>,
    #[serde(
        default,
        rename = "enableOOMKill",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_oom_kill: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conntrack_enabled: Option<bool>,
    #[serde(
        default,
        rename = "collectDNSStats",
        skip_serializing_if = "Option::is_none"
    )]
    pub collect_dns_stats: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeSecuritySpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSecuritySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syscall_monitor: Option<SyscallMonitorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies_dir: Option<ConfigDirSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyscallMonitorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDirSpec {
    pub config_map_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeAgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dogstatsd: Option<DogstatsdConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DogstatsdConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dogstatsd_origin_detection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unix_domain_socket: Option<UnixDomainSocket>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_local_service_enable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAgentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ClusterAgentConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_checks_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_controller: Option<AdmissionControllerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_metrics: Option<ExternalMetricsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionControllerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutate_unlabelled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_communication_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetricsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterChecksRunnerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatadogFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_state_metrics_core: Option<KubeStateMetricsCore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_monitoring: Option<NetworkMonitoring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_collection: Option<LogCollectionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_explorer: Option<OrchestratorExplorerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus_scrape: Option<PrometheusScrapeConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeStateMetricsCore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_check: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMonitoring {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogCollectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_config_container_collect_all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_collect_using_files: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_logs_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_logs_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_symlinks_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_files_limit: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorExplorerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Run the check in the cluster checks runners when they are deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_check: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrubbing: Option<Scrubbing>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dd_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scrubbing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containers: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusScrapeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_endpoints: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_configs: Option<String>,
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
    pub fn generated_token(&self) -> Option<&String> {
        self.status
            .as_ref()?
            .cluster_agent
            .as_ref()?
            .generated_token
            .as_ref()
    }

    pub fn system_probe(&self) -> Option<&SystemProbeSpec> {
        self.spec.agent.system_probe.as_ref()
    }

    pub fn cluster_agent_config(&self) -> Option<&ClusterAgentConfig> {
        self.spec.cluster_agent.config.as_ref()
    }

    pub fn cluster_checks_enabled(&self) -> bool {
        self.cluster_agent_config()
            .and_then(|c| c.cluster_checks_enabled)
            .unwrap_or(false)
    }

    pub fn cluster_checks_runner_enabled(&self) -> bool {
        self.spec.cluster_checks_runner.enabled.unwrap_or(false)
    }

    pub fn force_enable_local_service(&self) -> bool {
        self.spec
            .agent
            .local_service
            .as_ref()
            .and_then(|l| l.force_local_service_enable)
            .unwrap_or(false)
    }

    pub fn local_service_name_override(&self) -> Option<&str> {
        self.spec
            .agent
            .local_service
            .as_ref()
            .and_then(|l| l.override_name.as_deref())
    }
}
