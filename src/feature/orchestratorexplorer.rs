use serde::Serialize;

use crate::api::{v1alpha1, v2alpha1};
use crate::checksum;
use crate::component::{ComponentKind, ContainerName};
use crate::dependencies::ResourceManagers;
use crate::error::Result;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, Owner, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{
    Annotations, ConfigMap, EnvVar, Labels, PolicyRule, Volume, VolumeMount, CREATE_VERB,
    GET_VERB, LIST_VERB, UPDATE_VERB, WATCH_VERB,
};

pub const CONFIG_KEY: &str = "orchestrator.yaml";
pub const CONFIG_VOLUME_NAME: &str = "orchestrator-explorer-config";
pub const CONFIG_MOUNT_PATH: &str = "/etc/datadog-agent/conf.d/orchestrator.d";
pub const CLUSTER_ID_CONFIG_MAP: &str = "datadog-cluster-id";

pub const DD_ORCHESTRATOR_EXPLORER_ENABLED: &str = "DD_ORCHESTRATOR_EXPLORER_ENABLED";
pub const DD_ORCHESTRATOR_EXPLORER_CONTAINER_SCRUBBING_ENABLED: &str =
    "DD_ORCHESTRATOR_EXPLORER_CONTAINER_SCRUBBING_ENABLED";
pub const DD_ORCHESTRATOR_EXPLORER_EXTRA_TAGS: &str = "DD_ORCHESTRATOR_EXPLORER_EXTRA_TAGS";
pub const DD_ORCHESTRATOR_EXPLORER_ORCHESTRATOR_DD_URL: &str =
    "DD_ORCHESTRATOR_EXPLORER_ORCHESTRATOR_DD_URL";

pub fn build(options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(OrchestratorExplorerFeature {
        process_agent_not_required: options.process_checks_in_core_agent,
        ..Default::default()
    })
}

pub fn default_config_map_name(owner_name: &str) -> String {
    format!("{owner_name}-orchestrator-explorer-config")
}

#[derive(Serialize)]
struct CheckConfig {
    cluster_check: bool,
    ad_identifiers: [&'static str; 1],
    init_config: Option<()>,
    instances: Vec<CheckInstance>,
}

#[derive(Serialize)]
struct CheckInstance {
    skip_leader_election: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    crd_collectors: Vec<String>,
}

/// Default check configuration. Custom resources land in `crd_collectors`.
pub fn default_config(cluster_check: bool, custom_resources: &[String]) -> Result<String> {
    let config = CheckConfig {
        cluster_check,
        ad_identifiers: ["_kube_orchestrator"],
        init_config: None,
        instances: vec![CheckInstance {
            skip_leader_election: cluster_check,
            crd_collectors: custom_resources.to_vec(),
        }],
    };
    Ok(serde_yaml::to_string(&config)?)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum ConfigSource {
    #[default]
    Default,
    Inline(String),
    External(String),
}

/// Orchestrator explorer, collecting cluster resources from the cluster agent or a runner.
#[derive(Debug, Default)]
pub struct OrchestratorExplorerFeature {
    owner: Owner,
    run_in_runner: bool,
    process_agent_not_required: bool,
    scrub_containers: bool,
    extra_tags: Vec<String>,
    dd_url: Option<String>,
    custom_resources: Vec<String>,
    config: ConfigSource,
}

impl OrchestratorExplorerFeature {
    fn required(&self) -> RequiredComponents {
        let mut agent = vec![ContainerName::CoreAgent];
        if !self.process_agent_not_required {
            agent.push(ContainerName::ProcessAgent);
        }
        let mut components = RequiredComponents::default()
            .with(
                ComponentKind::ClusterAgent,
                RequiredComponent::required([ContainerName::ClusterAgent]),
            )
            .with(ComponentKind::NodeAgent, RequiredComponent::required(agent));
        if self.run_in_runner {
            components = components.with(
                ComponentKind::ClusterChecksRunner,
                RequiredComponent::required([ContainerName::ClusterChecksRunner]),
            );
        }
        components
    }

    fn config_map_name(&self) -> String {
        match &self.config {
            ConfigSource::External(name) => name.clone(),
            _ => default_config_map_name(&self.owner.name),
        }
    }

    fn owned_data(&self) -> Result<Option<String>> {
        match &self.config {
            ConfigSource::External(_) => Ok(None),
            ConfigSource::Inline(data) => Ok(Some(data.clone())),
            ConfigSource::Default => {
                default_config(self.run_in_runner, &self.custom_resources).map(Some)
            }
        }
    }

    fn config_checksum(&self) -> Result<String> {
        match (&self.config, self.owned_data()?) {
            (ConfigSource::External(name), _) => checksum::digest(name),
            (_, data) => checksum::digest(&data),
        }
    }

    fn env_vars(&self) -> Result<Vec<EnvVar>> {
        let mut vars = vec![
            EnvVar::from_bool(DD_ORCHESTRATOR_EXPLORER_ENABLED, true),
            EnvVar::from_bool(
                DD_ORCHESTRATOR_EXPLORER_CONTAINER_SCRUBBING_ENABLED,
                self.scrub_containers,
            ),
        ];
        if !self.extra_tags.is_empty() {
            vars.push(EnvVar::value(
                DD_ORCHESTRATOR_EXPLORER_EXTRA_TAGS,
                serde_json::to_string(&self.extra_tags)?,
            ));
        }
        if let Some(url) = &self.dd_url {
            vars.push(EnvVar::value(DD_ORCHESTRATOR_EXPLORER_ORCHESTRATOR_DD_URL, url));
        }
        Ok(vars)
    }

    fn rbac_kind(&self, components: &RequiredComponents) -> ComponentKind {
        if self.run_in_runner && components.cluster_checks_runner.is_enabled() {
            ComponentKind::ClusterChecksRunner
        } else {
            ComponentKind::ClusterAgent
        }
    }
}

fn config_source(conf: Option<&v2alpha1::CustomConfig>) -> ConfigSource {
    match conf {
        Some(v2alpha1::CustomConfig {
            config_map: Some(cm),
            ..
        }) => ConfigSource::External(cm.name.clone()),
        Some(v2alpha1::CustomConfig {
            config_data: Some(data),
            ..
        }) => ConfigSource::Inline(data.clone()),
        _ => ConfigSource::Default,
    }
}

/// Read rules for `group/version/resource` entries. Malformed entries are skipped.
fn custom_resource_rules(custom_resources: &[String]) -> Vec<PolicyRule> {
    custom_resources
        .iter()
        .filter_map(|cr| {
            let mut parts = cr.split('/');
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(group), Some(_version), Some(resource), None) => Some(
                    PolicyRule::new()
                        .api_groups(&[group])
                        .resources(&[resource])
                        .verbs(&[LIST_VERB, WATCH_VERB]),
                ),
                _ => {
                    tracing::warn!(resource = %cr, "Ignoring malformed custom resource");
                    None
                }
            }
        })
        .collect()
}

impl Feature for OrchestratorExplorerFeature {
    fn id(&self) -> FeatureId {
        FeatureId::OrchestratorExplorer
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(features) = dda.features() else {
            return RequiredComponents::default();
        };
        let Some(explorer) = features.orchestrator_explorer.as_ref() else {
            return RequiredComponents::default();
        };
        if !enabled(explorer.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.run_in_runner = features
            .cluster_checks
            .as_ref()
            .map(|c| enabled(c.enabled) && enabled(c.use_cluster_checks_runners))
            .unwrap_or(false);
        self.scrub_containers = enabled(explorer.scrub_containers);
        self.extra_tags = explorer.extra_tags.clone();
        self.dd_url = explorer.dd_url.clone();
        self.custom_resources = explorer.custom_resources.clone();
        self.config = config_source(explorer.conf.as_ref());
        self.required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(explorer) = dda.spec.features.orchestrator_explorer.as_ref() else {
            return RequiredComponents::default();
        };
        if !enabled(explorer.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.process_agent_not_required = false;
        self.run_in_runner = dda.cluster_checks_enabled()
            && enabled(explorer.cluster_check)
            && dda.cluster_checks_runner_enabled();
        self.scrub_containers = explorer
            .scrubbing
            .as_ref()
            .is_some_and(|s| enabled(s.containers));
        self.extra_tags = explorer.extra_tags.clone();
        self.dd_url = explorer.dd_url.clone();
        self.config = ConfigSource::Default;
        self.required()
    }

    fn manage_dependencies(
        &self,
        managers: &mut ResourceManagers,
        components: &RequiredComponents,
    ) -> Result<()> {
        if !components.cluster_agent.is_enabled() {
            return Ok(());
        }
        let ns = self.owner.namespace.as_str();

        if let Some(data) = self.owned_data()? {
            let annotations = Annotations::new().insert(
                checksum::annotation_key(FeatureId::OrchestratorExplorer),
                self.config_checksum()?,
            );
            managers.config_map().add_config_map(
                ns,
                ConfigMap::new(self.config_map_name())
                    .labels(Labels::for_component(&self.owner.name, ComponentKind::ClusterAgent))
                    .annotations(annotations)
                    .data(CONFIG_KEY, data),
            );
        }

        let kind = self.rbac_kind(components);
        let role_name = format!(
            "{}-orchestrator-explorer",
            kind.rbac_resource_name(&self.owner.name)
        );
        let read = [LIST_VERB, WATCH_VERB];
        let mut rules = vec![
            PolicyRule::new()
                .core_api()
                .resources(&["namespaces"])
                .resource_names(&["kube-system"])
                .verbs(&[GET_VERB]),
            PolicyRule::new()
                .core_api()
                .resources(&["configmaps"])
                .resource_names(&[CLUSTER_ID_CONFIG_MAP])
                .verbs(&[GET_VERB, CREATE_VERB, UPDATE_VERB]),
            PolicyRule::new()
                .core_api()
                .resources(&["pods", "services", "nodes"])
                .verbs(&read),
            PolicyRule::new()
                .api_groups(&["apps"])
                .resources(&["deployments", "replicasets", "daemonsets", "statefulsets"])
                .verbs(&read),
            PolicyRule::new()
                .api_groups(&["batch"])
                .resources(&["jobs", "cronjobs"])
                .verbs(&read),
            PolicyRule::new()
                .core_api()
                .resources(&["persistentvolumes", "persistentvolumeclaims"])
                .verbs(&read),
        ];
        rules.extend(custom_resource_rules(&self.custom_resources));
        managers.rbac().add_cluster_policy_rules(
            ns,
            &role_name,
            &kind.service_account_name(&self.owner.name),
            rules,
        );
        Ok(())
    }

    fn manage_cluster_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        let volume = match &self.config {
            ConfigSource::External(name) => Volume::configmap(CONFIG_VOLUME_NAME, name),
            _ => Volume::configmap(CONFIG_VOLUME_NAME, self.config_map_name())
                .item(CONFIG_KEY, CONFIG_KEY),
        };
        managers.volume().add_volume_to_container(
            volume,
            VolumeMount::new(CONFIG_VOLUME_NAME, CONFIG_MOUNT_PATH, true),
            ContainerName::ClusterAgent,
        );

        let mut env = managers.env_var();
        for var in self.env_vars()? {
            env.add_env_var(var);
        }

        if self.config != ConfigSource::Default {
            managers.annotation().add_annotation(
                checksum::annotation_key(FeatureId::OrchestratorExplorer),
                self.config_checksum()?,
            );
        }
        Ok(())
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        let mut env = managers.env_var();
        for var in self.env_vars()? {
            if !self.process_agent_not_required {
                env.add_env_var_to_container(ContainerName::ProcessAgent, var.clone());
            }
            env.add_env_var_to_container(ContainerName::CoreAgent, var);
        }
        Ok(())
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        let mut env = managers.env_var();
        for var in self.env_vars()? {
            env.add_env_var_to_container(ContainerName::UnprivilegedSingleAgent, var);
        }
        Ok(())
    }

    fn manage_cluster_checks_runner(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        if !self.run_in_runner {
            return Ok(());
        }
        let mut env = managers.env_var();
        for var in self.env_vars()? {
            env.add_env_var_to_container(ContainerName::ClusterChecksRunner, var);
        }
        Ok(())
    }
}
