pub mod defaults;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use defaults::default_pod_template;

pub const LABEL_NAME: &str = "agent.datadoghq.com/name";
pub const LABEL_COMPONENT: &str = "agent.datadoghq.com/component";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

pub const DEFAULT_IMAGE_REGISTRY: &str = "gcr.io/datadoghq";
pub const AGENT_IMAGE_NAME: &str = "agent";
pub const CLUSTER_AGENT_IMAGE_NAME: &str = "cluster-agent";
pub const AGENT_LATEST_VERSION: &str = "7.62.2";
pub const CLUSTER_AGENT_LATEST_VERSION: &str = "7.62.2";

/// A deployable workload of an agent instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    NodeAgent,
    ClusterAgent,
    ClusterChecksRunner,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 3] = [
        ComponentKind::NodeAgent,
        ComponentKind::ClusterAgent,
        ComponentKind::ClusterChecksRunner,
    ];

    pub fn label_value(&self) -> &'static str {
        match self {
            ComponentKind::NodeAgent => "agent",
            ComponentKind::ClusterAgent => "cluster-agent",
            ComponentKind::ClusterChecksRunner => "cluster-checks-runner",
        }
    }

    /// Key under `spec.override` addressing this component.
    pub fn override_key(&self) -> &'static str {
        match self {
            ComponentKind::NodeAgent => "nodeAgent",
            ComponentKind::ClusterAgent => "clusterAgent",
            ComponentKind::ClusterChecksRunner => "clusterChecksRunner",
        }
    }

    pub fn resource_name(&self, owner_name: &str) -> String {
        format!("{owner_name}-{}", self.label_value())
    }

    pub fn service_account_name(&self, owner_name: &str) -> String {
        self.resource_name(owner_name)
    }

    pub fn rbac_resource_name(&self, owner_name: &str) -> String {
        self.resource_name(owner_name)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label_value())
    }
}

/// A named container inside one of the component pod templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContainerName {
    #[serde(rename = "agent")]
    CoreAgent,
    #[serde(rename = "trace-agent")]
    TraceAgent,
    #[serde(rename = "process-agent")]
    ProcessAgent,
    #[serde(rename = "system-probe")]
    SystemProbe,
    #[serde(rename = "security-agent")]
    SecurityAgent,
    #[serde(rename = "unprivileged-single-agent")]
    UnprivilegedSingleAgent,
    #[serde(rename = "cluster-agent")]
    ClusterAgent,
    #[serde(rename = "cluster-checks-runner")]
    ClusterChecksRunner,
    #[serde(rename = "init-volume")]
    InitVolume,
    #[serde(rename = "init-config")]
    InitConfig,
    #[serde(rename = "seccomp-setup")]
    SeccompSetup,
}

impl ContainerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerName::CoreAgent => "agent",
            ContainerName::TraceAgent => "trace-agent",
            ContainerName::ProcessAgent => "process-agent",
            ContainerName::SystemProbe => "system-probe",
            ContainerName::SecurityAgent => "security-agent",
            ContainerName::UnprivilegedSingleAgent => "unprivileged-single-agent",
            ContainerName::ClusterAgent => "cluster-agent",
            ContainerName::ClusterChecksRunner => "cluster-checks-runner",
            ContainerName::InitVolume => "init-volume",
            ContainerName::InitConfig => "init-config",
            ContainerName::SeccompSetup => "seccomp-setup",
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(
            self,
            ContainerName::InitVolume | ContainerName::InitConfig | ContainerName::SeccompSetup
        )
    }

    /// Containers that need elevated privileges on the host.
    pub fn is_privileged(&self) -> bool {
        matches!(self, ContainerName::SystemProbe | ContainerName::SecurityAgent)
    }

    /// Containers whose processes can run inside the single unprivileged agent container.
    pub fn fits_single_container(&self) -> bool {
        matches!(
            self,
            ContainerName::CoreAgent
                | ContainerName::TraceAgent
                | ContainerName::ProcessAgent
                | ContainerName::UnprivilegedSingleAgent
        )
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn image(registry: &str, name: &str, tag: &str) -> String {
    format!("{}/{name}:{tag}", registry.trim_end_matches('/'))
}

pub fn cluster_agent_service_name(owner_name: &str) -> String {
    ComponentKind::ClusterAgent.resource_name(owner_name)
}

/// Node-local service fronting the node agent ports.
pub fn agent_local_service_name(owner_name: &str) -> String {
    format!("{owner_name}-agent")
}

pub fn credentials_secret_name(owner_name: &str) -> String {
    owner_name.to_string()
}

pub fn cluster_agent_token_secret_name(owner_name: &str) -> String {
    format!("{owner_name}-token")
}

pub fn install_info_config_map_name(owner_name: &str) -> String {
    format!("{owner_name}-install-info")
}

pub fn seccomp_config_map_name(owner_name: &str) -> String {
    format!("{owner_name}-system-probe-seccomp")
}

