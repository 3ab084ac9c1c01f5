use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::error::Result;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::EnvVar;

pub const DD_PROMETHEUS_SCRAPE_ENABLED: &str = "DD_PROMETHEUS_SCRAPE_ENABLED";
pub const DD_PROMETHEUS_SCRAPE_SERVICE_ENDPOINTS: &str = "DD_PROMETHEUS_SCRAPE_SERVICE_ENDPOINTS";
pub const DD_PROMETHEUS_SCRAPE_CHECKS: &str = "DD_PROMETHEUS_SCRAPE_CHECKS";
pub const DD_PROMETHEUS_SCRAPE_VERSION: &str = "DD_PROMETHEUS_SCRAPE_VERSION";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(PrometheusScrapeFeature::default())
}

/// Autodiscovery of Prometheus endpoints from pod and service annotations.
#[derive(Debug, Default)]
pub struct PrometheusScrapeFeature {
    service_endpoints: bool,
    additional_configs: Option<String>,
    openmetrics_version: Option<i32>,
}

impl PrometheusScrapeFeature {
    fn required() -> RequiredComponents {
        RequiredComponents::default()
            .with(
                ComponentKind::NodeAgent,
                RequiredComponent::required([ContainerName::CoreAgent]),
            )
            .with(
                ComponentKind::ClusterAgent,
                RequiredComponent::required([ContainerName::ClusterAgent]),
            )
    }

    /// Scrape settings for `target`. Additional configs are YAML in the resource
    /// and JSON in the agent environment.
    fn manage_container(
        &self,
        managers: &mut PodTemplateManagers,
        target: ContainerName,
    ) -> Result<()> {
        let mut env = managers.env_var();
        env.add_env_var_to_container(
            target,
            EnvVar::from_bool(DD_PROMETHEUS_SCRAPE_ENABLED, true),
        );
        env.add_env_var_to_container(
            target,
            EnvVar::from_bool(DD_PROMETHEUS_SCRAPE_SERVICE_ENDPOINTS, self.service_endpoints),
        );
        if let Some(configs) = &self.additional_configs {
            let value: serde_json::Value = serde_yaml::from_str(configs).inspect_err(|e| {
                tracing::error!(error = %e, "Invalid prometheusScrape.additionalConfigs");
            })?;
            env.add_env_var_to_container(
                target,
                EnvVar::value(DD_PROMETHEUS_SCRAPE_CHECKS, serde_json::to_string(&value)?),
            );
        }
        if let Some(version) = self.openmetrics_version {
            env.add_env_var_to_container(
                target,
                EnvVar::value(DD_PROMETHEUS_SCRAPE_VERSION, version.to_string()),
            );
        }
        Ok(())
    }
}

impl Feature for PrometheusScrapeFeature {
    fn id(&self) -> FeatureId {
        FeatureId::PrometheusScrape
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(scrape) = dda.features().and_then(|f| f.prometheus_scrape.as_ref()) else {
            return RequiredComponents::default();
        };
        if !enabled(scrape.enabled) {
            return RequiredComponents::default();
        }

        self.service_endpoints = enabled(scrape.enable_service_endpoints);
        self.additional_configs = scrape.additional_configs.clone().filter(|c| !c.is_empty());
        self.openmetrics_version = scrape.version.filter(|v| *v != 0);
        Self::required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(scrape) = dda.spec.features.prometheus_scrape.as_ref() else {
            return RequiredComponents::default();
        };
        if !enabled(scrape.enabled) {
            return RequiredComponents::default();
        }

        self.service_endpoints = enabled(scrape.service_endpoints);
        self.additional_configs = scrape.additional_configs.clone().filter(|c| !c.is_empty());
        Self::required()
    }

    fn manage_cluster_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_container(managers, ContainerName::ClusterAgent)
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_container(managers, ContainerName::CoreAgent)
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_container(managers, ContainerName::UnprivilegedSingleAgent)
    }
}
