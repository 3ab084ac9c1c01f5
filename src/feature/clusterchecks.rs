use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::error::Result;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, RequiredComponent, RequiredComponents,
};
use crate::merger::{MergeStrategy, PodTemplateManagers};
use crate::types::EnvVar;

pub const DD_CLUSTER_CHECKS_ENABLED: &str = "DD_CLUSTER_CHECKS_ENABLED";
pub const DD_EXTRA_CONFIG_PROVIDERS: &str = "DD_EXTRA_CONFIG_PROVIDERS";
pub const DD_EXTRA_LISTENERS: &str = "DD_EXTRA_LISTENERS";

pub const KUBE_SERVICES_AND_ENDPOINTS: &str = "kube_endpoints kube_services";
pub const CLUSTER_AND_ENDPOINTS_CHECKS: &str = "clusterchecks endpointschecks";
pub const ENDPOINTS_CHECKS: &str = "endpointschecks";
pub const CLUSTER_CHECKS: &str = "clusterchecks";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(ClusterChecksFeature::default())
}

/// Cluster level checks dispatched by the cluster agent to node agents or runners.
#[derive(Debug, Default)]
pub struct ClusterChecksFeature {
    use_runners: bool,
}

impl ClusterChecksFeature {
    fn required(&mut self, enabled: bool, use_runners: bool) -> RequiredComponents {
        if !enabled {
            return RequiredComponents::default();
        }
        self.use_runners = use_runners;

        let runner = if self.use_runners {
            RequiredComponent::required([ContainerName::ClusterChecksRunner])
        } else {
            RequiredComponent::not_required()
        };
        RequiredComponents::default()
            .with(
                ComponentKind::ClusterAgent,
                RequiredComponent::required([ContainerName::ClusterAgent]),
            )
            .with(ComponentKind::ClusterChecksRunner, runner)
    }

    fn manage_agent(&self, managers: &mut PodTemplateManagers, agent: ContainerName) -> Result<()> {
        let providers = if self.use_runners {
            ENDPOINTS_CHECKS
        } else {
            CLUSTER_AND_ENDPOINTS_CHECKS
        };
        managers.env_var().add_env_var_to_container_with_merge(
            agent,
            EnvVar::value(DD_EXTRA_CONFIG_PROVIDERS, providers),
            MergeStrategy::AppendToValue,
        )
    }
}

impl Feature for ClusterChecksFeature {
    fn id(&self) -> FeatureId {
        FeatureId::ClusterChecks
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let config = dda.features().and_then(|f| f.cluster_checks.as_ref());
        let on = config.map(|c| enabled(c.enabled)).unwrap_or(false);
        let use_runners = config
            .map(|c| enabled(c.use_cluster_checks_runners))
            .unwrap_or(false);
        self.required(on, use_runners)
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        self.required(
            dda.cluster_checks_enabled(),
            dda.cluster_checks_runner_enabled(),
        )
    }

    fn manage_cluster_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        let dca = ContainerName::ClusterAgent;
        let mut env = managers.env_var();
        env.add_env_var_to_container(dca, EnvVar::from_bool(DD_CLUSTER_CHECKS_ENABLED, true));
        env.add_env_var_to_container_with_merge(
            dca,
            EnvVar::value(DD_EXTRA_CONFIG_PROVIDERS, KUBE_SERVICES_AND_ENDPOINTS),
            MergeStrategy::AppendToValue,
        )?;
        env.add_env_var_to_container_with_merge(
            dca,
            EnvVar::value(DD_EXTRA_LISTENERS, KUBE_SERVICES_AND_ENDPOINTS),
            MergeStrategy::AppendToValue,
        )
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::CoreAgent)
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::UnprivilegedSingleAgent)
    }

    fn manage_cluster_checks_runner(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        if !self.use_runners {
            return Ok(());
        }
        let runner = ContainerName::ClusterChecksRunner;
        let mut env = managers.env_var();
        env.add_env_var_to_container(runner, EnvVar::from_bool(DD_CLUSTER_CHECKS_ENABLED, true));
        env.add_env_var_to_container_with_merge(
            runner,
            EnvVar::value(DD_EXTRA_CONFIG_PROVIDERS, CLUSTER_CHECKS),
            MergeStrategy::AppendToValue,
        )
    }
}
