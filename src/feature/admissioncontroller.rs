use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::dependencies::ResourceManagers;
use crate::error::Result;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, LocalServiceConfig, Owner, RequiredComponent,
    RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{
    EnvVar, Labels, PolicyRule, Selector, Service, ServicePort, CREATE_VERB, DELETE_VERB,
    GET_VERB, LIST_VERB, UPDATE_VERB, WATCH_VERB,
};

pub const DEFAULT_SERVICE_NAME: &str = "datadog-admission-controller";
pub const DEFAULT_WEBHOOK_NAME: &str = "datadog-webhook";
pub const DEFAULT_FAILURE_POLICY: &str = "Ignore";
pub const WEBHOOK_PORT_NAME: &str = "admissioncontrollerport";
pub const WEBHOOK_SERVICE_PORT: i32 = 443;
pub const WEBHOOK_TARGET_PORT: i32 = 8000;
/// Communication mode routing injected clients through the node-local Service.
pub const SERVICE_MODE: &str = "service";

pub const DD_ADMISSION_CONTROLLER_ENABLED: &str = "DD_ADMISSION_CONTROLLER_ENABLED";
pub const DD_ADMISSION_CONTROLLER_MUTATE_UNLABELLED: &str =
    "DD_ADMISSION_CONTROLLER_MUTATE_UNLABELLED";
pub const DD_ADMISSION_CONTROLLER_SERVICE_NAME: &str = "DD_ADMISSION_CONTROLLER_SERVICE_NAME";
pub const DD_ADMISSION_CONTROLLER_INJECT_CONFIG_MODE: &str =
    "DD_ADMISSION_CONTROLLER_INJECT_CONFIG_MODE";
pub const DD_ADMISSION_CONTROLLER_INJECT_CONFIG_LOCAL_SERVICE_NAME: &str =
    "DD_ADMISSION_CONTROLLER_INJECT_CONFIG_LOCAL_SERVICE_NAME";
pub const DD_ADMISSION_CONTROLLER_FAILURE_POLICY: &str = "DD_ADMISSION_CONTROLLER_FAILURE_POLICY";
pub const DD_ADMISSION_CONTROLLER_WEBHOOK_NAME: &str = "DD_ADMISSION_CONTROLLER_WEBHOOK_NAME";
pub const DD_ADMISSION_CONTROLLER_CONTAINER_REGISTRY: &str =
    "DD_ADMISSION_CONTROLLER_CONTAINER_REGISTRY";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(AdmissionControllerFeature::default())
}

/// Mutating webhook served by the cluster agent.
#[derive(Debug, Default)]
pub struct AdmissionControllerFeature {
    owner: Owner,
    mutate_unlabelled: bool,
    service_name: String,
    agent_communication_mode: Option<String>,
    local_service: LocalServiceConfig,
    failure_policy: String,
    webhook_name: String,
    registry: Option<String>,
}

impl AdmissionControllerFeature {
    fn required() -> RequiredComponents {
        RequiredComponents::default().with(
            ComponentKind::ClusterAgent,
            RequiredComponent::required([ContainerName::ClusterAgent]),
        )
    }

    fn rbac_name(&self) -> String {
        format!(
            "{}-admission-controller",
            ComponentKind::ClusterAgent.rbac_resource_name(&self.owner.name)
        )
    }
}

fn or_default(value: Option<&String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

impl Feature for AdmissionControllerFeature {
    fn id(&self) -> FeatureId {
        FeatureId::AdmissionController
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(ac) = dda.features().and_then(|f| f.admission_controller.as_ref()) else {
            return RequiredComponents::default();
        };
        if !enabled(ac.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.local_service = LocalServiceConfig::from_v2(dda);
        self.mutate_unlabelled = enabled(ac.mutate_unlabelled);
        self.service_name = or_default(ac.service_name.as_ref(), DEFAULT_SERVICE_NAME);
        self.agent_communication_mode = ac.agent_communication_mode.clone();
        self.failure_policy = or_default(ac.failure_policy.as_ref(), DEFAULT_FAILURE_POLICY);
        self.webhook_name = or_default(ac.webhook_name.as_ref(), DEFAULT_WEBHOOK_NAME);
        self.registry = ac.registry.clone();

        Self::required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(ac) = dda
            .cluster_agent_config()
            .and_then(|c| c.admission_controller.as_ref())
        else {
            return RequiredComponents::default();
        };
        if !enabled(ac.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.local_service = LocalServiceConfig::from_v1(dda);
        self.mutate_unlabelled = enabled(ac.mutate_unlabelled);
        self.service_name = or_default(ac.service_name.as_ref(), DEFAULT_SERVICE_NAME);
        self.agent_communication_mode = ac.agent_communication_mode.clone();
        self.failure_policy = DEFAULT_FAILURE_POLICY.to_string();
        self.webhook_name = DEFAULT_WEBHOOK_NAME.to_string();

        Self::required()
    }

    fn manage_dependencies(
        &self,
        managers: &mut ResourceManagers,
        components: &RequiredComponents,
    ) -> Result<()> {
        if !components.cluster_agent.is_enabled() {
            return Ok(());
        }
        let kind = ComponentKind::ClusterAgent;
        let ns = self.owner.namespace.as_str();

        let selector = Selector::for_component(&self.owner.name, kind);
        let service = Service::new(&self.service_name, selector)
            .labels(Labels::for_component(&self.owner.name, kind))
            .port(ServicePort::tcp(
                WEBHOOK_PORT_NAME,
                WEBHOOK_SERVICE_PORT,
                WEBHOOK_TARGET_PORT,
            ));
        managers.service().add_service(ns, service)?;

        let sa_name = kind.service_account_name(&self.owner.name);
        managers.rbac().add_cluster_policy_rules(
            ns,
            &self.rbac_name(),
            &sa_name,
            vec![
                PolicyRule::new()
                    .api_groups(&["admissionregistration.k8s.io"])
                    .resources(&[
                        "mutatingwebhookconfigurations",
                        "validatingwebhookconfigurations",
                    ])
                    .verbs(&[
                        GET_VERB,
                        LIST_VERB,
                        WATCH_VERB,
                        UPDATE_VERB,
                        CREATE_VERB,
                        DELETE_VERB,
                    ]),
                PolicyRule::new()
                    .api_groups(&["batch"])
                    .resources(&["jobs", "cronjobs"])
                    .verbs(&[GET_VERB]),
                PolicyRule::new()
                    .api_groups(&["apps"])
                    .resources(&["statefulsets", "replicasets", "deployments"])
                    .verbs(&[GET_VERB]),
            ],
        );
        managers.rbac().add_policy_rules(
            ns,
            &self.rbac_name(),
            &sa_name,
            vec![PolicyRule::new()
                .core_api()
                .resources(&["secrets"])
                .verbs(&[GET_VERB, LIST_VERB, WATCH_VERB, UPDATE_VERB, CREATE_VERB])],
        );
        Ok(())
    }

    fn manage_cluster_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        let dca = ContainerName::ClusterAgent;
        let mut env = managers.env_var();
        env.add_env_var_to_container(dca, EnvVar::from_bool(DD_ADMISSION_CONTROLLER_ENABLED, true));
        env.add_env_var_to_container(
            dca,
            EnvVar::from_bool(DD_ADMISSION_CONTROLLER_MUTATE_UNLABELLED, self.mutate_unlabelled),
        );
        env.add_env_var_to_container(
            dca,
            EnvVar::value(DD_ADMISSION_CONTROLLER_SERVICE_NAME, &self.service_name),
        );
        if let Some(mode) = &self.agent_communication_mode {
            env.add_env_var_to_container(
                dca,
                EnvVar::value(DD_ADMISSION_CONTROLLER_INJECT_CONFIG_MODE, mode),
            );
            if mode == SERVICE_MODE {
                env.add_env_var_to_container(
                    dca,
                    EnvVar::value(
                        DD_ADMISSION_CONTROLLER_INJECT_CONFIG_LOCAL_SERVICE_NAME,
                        self.local_service.name(&self.owner),
                    ),
                );
            }
        }
        env.add_env_var_to_container(
            dca,
            EnvVar::value(DD_ADMISSION_CONTROLLER_FAILURE_POLICY, &self.failure_policy),
        );
        env.add_env_var_to_container(
            dca,
            EnvVar::value(DD_ADMISSION_CONTROLLER_WEBHOOK_NAME, &self.webhook_name),
        );
        if let Some(registry) = &self.registry {
            env.add_env_var_to_container(
                dca,
                EnvVar::value(DD_ADMISSION_CONTROLLER_CONTAINER_REGISTRY, registry),
            );
        }
        Ok(())
    }
}
