use serde::Serialize;

use crate::api::{v1alpha1, v2alpha1};
use crate::checksum;
use crate::component::{ComponentKind, ContainerName};
use crate::dependencies::ResourceManagers;
use crate::error::Result;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, Owner, RequiredComponent, RequiredComponents,
};
use crate::merger::{MergeStrategy, PodTemplateManagers};
use crate::types::{
    Annotations, ConfigMap, EnvVar, Labels, PolicyRule, Volume, VolumeMount, LIST_VERB,
    WATCH_VERB,
};

pub const CONFIG_KEY: &str = "kubernetes_state_core.yaml.default";
pub const CONFIG_VOLUME_NAME: &str = "ksm-core-config";
pub const CONFIG_MOUNT_PATH: &str = "/etc/datadog-agent/conf.d/kubernetes_state_core.d";
pub const IGNORED_AUTOCONF_CHECK: &str = "kubernetes_state";

pub const DD_KUBE_STATE_METRICS_CORE_ENABLED: &str = "DD_KUBE_STATE_METRICS_CORE_ENABLED";
pub const DD_KUBE_STATE_METRICS_CORE_CONFIGMAP_NAME: &str =
    "DD_KUBE_STATE_METRICS_CORE_CONFIGMAP_NAME";
pub const DD_IGNORE_AUTOCONF: &str = "DD_IGNORE_AUTOCONF";

const COLLECTORS: [&str; 28] = [
    "pods",
    "replicationcontrollers",
    "statefulsets",
    "nodes",
    "cronjobs",
    "jobs",
    "replicasets",
    "deployments",
    "configmaps",
    "services",
    "endpoints",
    "daemonsets",
    "horizontalpodautoscalers",
    "limitranges",
    "resourcequotas",
    "secrets",
    "namespaces",
    "persistentvolumeclaims",
    "persistentvolumes",
    "poddisruptionbudgets",
    "storageclasses",
    "volumeattachments",
    "ingresses",
    "networkpolicies",
    "leases",
    "certificatesigningrequests",
    "mutatingwebhookconfigurations",
    "validatingwebhookconfigurations",
];

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(KubernetesStateCoreFeature::default())
}

pub fn default_config_map_name(owner_name: &str) -> String {
    format!("{owner_name}-kube-state-metrics-core-config")
}

#[derive(Serialize)]
struct CheckConfig {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    cluster_check: bool,
    init_config: Option<()>,
    instances: Vec<CheckInstance>,
}

#[derive(Serialize)]
struct CheckInstance {
    collectors: &'static [&'static str],
    skip_leader_election: bool,
}

/// Default check configuration. `cluster_check` dispatches the check to a runner.
pub fn default_config(cluster_check: bool) -> Result<String> {
    let config = CheckConfig {
        cluster_check,
        init_config: None,
        instances: vec![CheckInstance {
            collectors: &COLLECTORS,
            skip_leader_election: cluster_check,
        }],
    };
    Ok(serde_yaml::to_string(&config)?)
}

/// Where the check configuration comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ConfigSource {
    /// Default configuration written to a ConfigMap owned by the agent.
    Default { cluster_check: bool },
    /// Inline data written to a ConfigMap owned by the agent.
    Inline(String),
    /// ConfigMap managed outside the operator.
    External(String),
}

impl Default for ConfigSource {
    fn default() -> Self {
        ConfigSource::Default {
            cluster_check: false,
        }
    }
}

/// kube-state-metrics core check, run by the cluster agent or a cluster checks runner.
#[derive(Debug, Default)]
pub struct KubernetesStateCoreFeature {
    owner: Owner,
    run_in_runner: bool,
    config: ConfigSource,
}

impl KubernetesStateCoreFeature {
    fn required(&self) -> RequiredComponents {
        let mut components = RequiredComponents::default().with(
            ComponentKind::ClusterAgent,
            RequiredComponent::required([ContainerName::ClusterAgent]),
        );
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

    /// Data of the owned ConfigMap, `None` when the configuration is external.
    fn owned_data(&self) -> Result<Option<String>> {
        match &self.config {
            ConfigSource::Default { cluster_check } => default_config(*cluster_check).map(Some),
            ConfigSource::Inline(data) => Ok(Some(data.clone())),
            ConfigSource::External(_) => Ok(None),
        }
    }

    fn config_checksum(&self) -> Result<String> {
        match (&self.config, self.owned_data()?) {
            (ConfigSource::External(name), _) => checksum::digest(name),
            (_, data) => checksum::digest(&data),
        }
    }

    fn ignore_autoconf(
        &self,
        managers: &mut PodTemplateManagers,
        agent: ContainerName,
    ) -> Result<()> {
        managers.env_var().add_env_var_to_container_with_merge(
            agent,
            EnvVar::value(DD_IGNORE_AUTOCONF, IGNORED_AUTOCONF_CHECK),
            MergeStrategy::AppendToValue,
        )
    }
}

fn config_source(conf: Option<&v2alpha1::CustomConfig>, run_in_runner: bool) -> ConfigSource {
    match conf {
        Some(v2alpha1::CustomConfig {
            config_map: Some(cm),
            ..
        }) => ConfigSource::External(cm.name.clone()),
        Some(v2alpha1::CustomConfig {
            config_data: Some(data),
            ..
        }) => ConfigSource::Inline(data.clone()),
        _ => ConfigSource::Default {
            cluster_check: run_in_runner,
        },
    }
}

impl Feature for KubernetesStateCoreFeature {
    fn id(&self) -> FeatureId {
        FeatureId::KubernetesStateCore
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(features) = dda.features() else {
            return RequiredComponents::default();
        };
        let Some(ksm) = features.kube_state_metrics_core.as_ref() else {
            return RequiredComponents::default();
        };
        if !enabled(ksm.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.run_in_runner = features
            .cluster_checks
            .as_ref()
            .map(|c| enabled(c.enabled) && enabled(c.use_cluster_checks_runners))
            .unwrap_or(false);
        self.config = config_source(ksm.conf.as_ref(), self.run_in_runner);
        self.required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(ksm) = dda.spec.features.kube_state_metrics_core.as_ref() else {
            return RequiredComponents::default();
        };
        if !enabled(ksm.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.run_in_runner = enabled(ksm.cluster_check) && dda.cluster_checks_runner_enabled();
        self.config = config_source(None, self.run_in_runner);
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
                checksum::annotation_key(FeatureId::KubernetesStateCore),
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

        let runner_enabled = components.cluster_checks_runner.is_enabled();
        let kind = if self.run_in_runner && runner_enabled {
            ComponentKind::ClusterChecksRunner
        } else {
            ComponentKind::ClusterAgent
        };
        let role_name = format!("{}-ksm-core", kind.rbac_resource_name(&self.owner.name));
        let read = [LIST_VERB, WATCH_VERB];
        managers.rbac().add_cluster_policy_rules(
            ns,
            &role_name,
            &kind.service_account_name(&self.owner.name),
            vec![
                PolicyRule::new()
                    .core_api()
                    .resources(&[
                        "configmaps",
                        "endpoints",
                        "events",
                        "limitranges",
                        "namespaces",
                        "nodes",
                        "persistentvolumeclaims",
                        "persistentvolumes",
                        "pods",
                        "replicationcontrollers",
                        "resourcequotas",
                        "secrets",
                        "services",
                    ])
                    .verbs(&read),
                PolicyRule::new()
                    .api_groups(&["apps"])
                    .resources(&["daemonsets", "deployments", "replicasets", "statefulsets"])
                    .verbs(&read),
                PolicyRule::new()
                    .api_groups(&["batch"])
                    .resources(&["cronjobs", "jobs"])
                    .verbs(&read),
                PolicyRule::new()
                    .api_groups(&["autoscaling"])
                    .resources(&["horizontalpodautoscalers"])
                    .verbs(&read),
                PolicyRule::new()
                    .api_groups(&["policy"])
                    .resources(&["poddisruptionbudgets"])
                    .verbs(&read),
                PolicyRule::new()
                    .api_groups(&["certificates.k8s.io"])
                    .resources(&["certificatesigningrequests"])
                    .verbs(&read),
                PolicyRule::new()
                    .api_groups(&["storage.k8s.io"])
                    .resources(&["storageclasses", "volumeattachments"])
                    .verbs(&read),
                PolicyRule::new()
                    .api_groups(&["admissionregistration.k8s.io"])
                    .resources(&[
                        "mutatingwebhookconfigurations",
                        "validatingwebhookconfigurations",
                    ])
                    .verbs(&read),
                PolicyRule::new()
                    .api_groups(&["networking.k8s.io"])
                    .resources(&["ingresses", "networkpolicies"])
                    .verbs(&read),
                PolicyRule::new()
                    .api_groups(&["coordination.k8s.io"])
                    .resources(&["leases"])
                    .verbs(&read),
            ],
        );
        Ok(())
    }

    fn manage_cluster_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        let dca = ContainerName::ClusterAgent;
        let config_map = self.config_map_name();
        let volume = match &self.config {
            ConfigSource::External(_) => Volume::configmap(CONFIG_VOLUME_NAME, &config_map),
            _ => Volume::configmap(CONFIG_VOLUME_NAME, &config_map).item(CONFIG_KEY, CONFIG_KEY),
        };
        managers.volume().add_volume_to_container(
            volume,
            VolumeMount::new(CONFIG_VOLUME_NAME, CONFIG_MOUNT_PATH, true),
            dca,
        );

        let mut env = managers.env_var();
        env.add_env_var_to_container(
            dca,
            EnvVar::from_bool(DD_KUBE_STATE_METRICS_CORE_ENABLED, true),
        );
        env.add_env_var_to_container(
            dca,
            EnvVar::value(DD_KUBE_STATE_METRICS_CORE_CONFIGMAP_NAME, config_map),
        );

        managers.annotation().add_annotation(
            checksum::annotation_key(FeatureId::KubernetesStateCore),
            self.config_checksum()?,
        );
        Ok(())
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.ignore_autoconf(managers, ContainerName::CoreAgent)
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.ignore_autoconf(managers, ContainerName::UnprivilegedSingleAgent)
    }
}
