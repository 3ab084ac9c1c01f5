pub mod options;
pub mod registry;
pub mod sysprobe;

pub mod admissioncontroller;
pub mod apm;
pub mod clusterchecks;
pub mod cws;
pub mod dogstatsd;
pub mod enabledefault;
pub mod externalmetrics;
pub mod kubernetesstatecore;
pub mod livecontainer;
pub mod liveprocess;
pub mod logcollection;
pub mod npm;
pub mod oomkill;
pub mod orchestratorexplorer;
pub mod otlp;
pub mod prometheusscrape;
pub mod tcpqueuelength;

use std::collections::BTreeSet;
use std::fmt;

use crate::api::{v1alpha1, v2alpha1};
use crate::component::{agent_local_service_name, ComponentKind, ContainerName};
use crate::dependencies::ResourceManagers;
use crate::error::Result;
use crate::merger::PodTemplateManagers;
use crate::types::{Labels, Selector, Service, ServicePort};

pub use options::FeatureOptions;
pub use registry::{BuildFn, FeatureRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureId {
    Default,
    Apm,
    Otlp,
    AdmissionController,
    ExternalMetrics,
    Npm,
    Cws,
    TcpQueueLength,
    OomKill,
    KubernetesStateCore,
    ClusterChecks,
    Dogstatsd,
    LogCollection,
    LiveProcess,
    LiveContainer,
    OrchestratorExplorer,
    PrometheusScrape,
}

impl FeatureId {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureId::Default => "default",
            FeatureId::Apm => "apm",
            FeatureId::Otlp => "otlp",
            FeatureId::AdmissionController => "admission_controller",
            FeatureId::ExternalMetrics => "external_metrics",
            FeatureId::Npm => "npm",
            FeatureId::Cws => "cws",
            FeatureId::TcpQueueLength => "tcp_queue_length",
            FeatureId::OomKill => "oom_kill",
            FeatureId::KubernetesStateCore => "kubernetes_state_core",
            FeatureId::ClusterChecks => "cluster_checks",
            FeatureId::Dogstatsd => "dogstatsd",
            FeatureId::LogCollection => "log_collection",
            FeatureId::LiveProcess => "live_process",
            FeatureId::LiveContainer => "live_container",
            FeatureId::OrchestratorExplorer => "orchestrator_explorer",
            FeatureId::PrometheusScrape => "prometheus_scrape",
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feature's vote on whether a component must be deployed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Requirement {
    #[default]
    Unset,
    Required,
    NotRequired,
}

impl Requirement {
    pub fn from_bool(required: bool) -> Self {
        if required {
            Requirement::Required
        } else {
            Requirement::NotRequired
        }
    }

    /// `Required` dominates `NotRequired`, which dominates `Unset`.
    pub fn merge(self, other: Requirement) -> Requirement {
        match (self, other) {
            (Requirement::Required, _) | (_, Requirement::Required) => Requirement::Required,
            (Requirement::NotRequired, _) | (_, Requirement::NotRequired) => {
                Requirement::NotRequired
            }
            _ => Requirement::Unset,
        }
    }

    pub fn is_required(&self) -> bool {
        *self == Requirement::Required
    }

    pub fn is_set(&self) -> bool {
        *self != Requirement::Unset
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredComponent {
    pub requirement: Requirement,
    pub containers: BTreeSet<ContainerName>,
}

impl RequiredComponent {
    pub fn required(containers: impl IntoIterator<Item = ContainerName>) -> Self {
        Self {
            requirement: Requirement::Required,
            containers: containers.into_iter().collect(),
        }
    }

    pub fn not_required() -> Self {
        Self {
            requirement: Requirement::NotRequired,
            containers: BTreeSet::new(),
        }
    }

    pub fn from_bool(required: bool) -> Self {
        Self {
            requirement: Requirement::from_bool(required),
            containers: BTreeSet::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.requirement.is_required()
    }

    pub fn is_configured(&self) -> bool {
        self.requirement.is_set() || !self.containers.is_empty()
    }

    pub fn has_container(&self, name: ContainerName) -> bool {
        self.containers.contains(&name)
    }

    pub fn is_privileged(&self) -> bool {
        self.containers.iter().any(ContainerName::is_privileged)
    }

    pub fn single_container_strategy_enabled(&self) -> bool {
        self.containers.len() == 1 && self.has_container(ContainerName::UnprivilegedSingleAgent)
    }

    pub fn merge(&mut self, other: &RequiredComponent) -> &mut Self {
        self.requirement = self.requirement.merge(other.requirement);
        self.containers.extend(other.containers.iter().copied());
        self
    }
}

/// Components and containers a feature needs, or the aggregate over all features.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredComponents {
    pub node_agent: RequiredComponent,
    pub cluster_agent: RequiredComponent,
    pub cluster_checks_runner: RequiredComponent,
}

impl RequiredComponents {
    pub fn with(mut self, kind: ComponentKind, component: RequiredComponent) -> Self {
        *self.get_mut(kind) = component;
        self
    }

    pub fn get(&self, kind: ComponentKind) -> &RequiredComponent {
        match kind {
            ComponentKind::NodeAgent => &self.node_agent,
            ComponentKind::ClusterAgent => &self.cluster_agent,
            ComponentKind::ClusterChecksRunner => &self.cluster_checks_runner,
        }
    }

    pub fn get_mut(&mut self, kind: ComponentKind) -> &mut RequiredComponent {
        match kind {
            ComponentKind::NodeAgent => &mut self.node_agent,
            ComponentKind::ClusterAgent => &mut self.cluster_agent,
            ComponentKind::ClusterChecksRunner => &mut self.cluster_checks_runner,
        }
    }

    pub fn is_enabled(&self) -> bool {
        ComponentKind::ALL.iter().any(|k| self.get(*k).is_enabled())
    }

    /// False for the zero value a disabled feature returns.
    pub fn is_configured(&self) -> bool {
        ComponentKind::ALL.iter().any(|k| self.get(*k).is_configured())
    }

    pub fn merge(&mut self, other: &RequiredComponents) -> &mut Self {
        for kind in ComponentKind::ALL {
            self.get_mut(kind).merge(other.get(kind));
        }
        self
    }

    pub fn enabled_components(&self) -> Vec<ComponentKind> {
        ComponentKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_enabled())
            .collect()
    }
}

/// One unit of optional agent functionality.
///
/// A feature is built fresh for every reconcile. `configure` (or `configure_v1` for the
/// legacy schema) records what the feature derived from the resource and returns the components
/// it needs. The `manage_*` methods are only called when `configure` returned a configured
/// value, and only for components that are part of the final aggregate.
pub trait Feature {
    fn id(&self) -> FeatureId;

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents;

    fn configure_v1(&mut self, _dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        RequiredComponents::default()
    }

    fn manage_dependencies(
        &self,
        _managers: &mut ResourceManagers,
        _components: &RequiredComponents,
    ) -> Result<()> {
        Ok(())
    }

    fn manage_node_agent(&self, _managers: &mut PodTemplateManagers) -> Result<()> {
        Ok(())
    }

    fn manage_single_container_node_agent(
        &self,
        _managers: &mut PodTemplateManagers,
    ) -> Result<()> {
        Ok(())
    }

    fn manage_cluster_agent(&self, _managers: &mut PodTemplateManagers) -> Result<()> {
        Ok(())
    }

    fn manage_cluster_checks_runner(&self, _managers: &mut PodTemplateManagers) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn enabled(flag: Option<bool>) -> bool {
    flag.unwrap_or(false)
}

/// Owner identity captured during configure, shared by every feature.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub namespace: String,
}

impl Owner {
    pub fn from_resource<K: kube::ResourceExt>(resource: &K) -> Self {
        Self {
            name: resource.name_any(),
            namespace: resource.namespace().unwrap_or_default(),
        }
    }
}

/// Node-local Service settings shared by the features exposing node agent ports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LocalServiceConfig {
    pub name_override: Option<String>,
    pub force_enable: bool,
}

impl LocalServiceConfig {
    pub fn from_v2(dda: &v2alpha1::DatadogAgent) -> Self {
        Self {
            name_override: dda.local_service_name_override().map(str::to_string),
            force_enable: dda.force_enable_local_service(),
        }
    }

    pub fn from_v1(dda: &v1alpha1::DatadogAgent) -> Self {
        Self {
            name_override: dda.local_service_name_override().map(str::to_string),
            force_enable: dda.force_enable_local_service(),
        }
    }

    pub fn name(&self, owner: &Owner) -> String {
        self.name_override
            .clone()
            .unwrap_or_else(|| agent_local_service_name(&owner.name))
    }
}

/// Exposes `ports` of the node agent through the node-local Service.
///
/// The Service needs `internalTrafficPolicy: Local`, so it is only declared on servers
/// that support it unless the resource forces it.
pub(crate) fn add_agent_local_service(
    managers: &mut ResourceManagers,
    owner: &Owner,
    config: &LocalServiceConfig,
    ports: Vec<ServicePort>,
) -> Result<()> {
    if !config.force_enable && !managers.version_info().supports_internal_traffic_policy() {
        tracing::debug!(
            owner = %owner.name,
            "Server does not support internal traffic policy, local service skipped"
        );
        return Ok(());
    }

    let kind = ComponentKind::NodeAgent;
    let mut service = Service::new(config.name(owner), Selector::for_component(&owner.name, kind))
        .labels(Labels::for_component(&owner.name, kind))
        .internal_traffic_local();
    service.ports = ports;
    managers.service().add_service(&owner.namespace, service)
}
