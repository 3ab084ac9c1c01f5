use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::dependencies::ResourceManagers;
use crate::error::Result;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, Owner, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{
    ApiService, ContainerPort, EnvVar, Labels, PolicyRule, RoleRef, Selector, Service,
    ServicePort, CREATE_VERB, DELETE_VERB, GET_VERB, LIST_VERB, UPDATE_VERB, WATCH_VERB,
};

pub const DEFAULT_METRICS_PORT: i32 = 8443;
pub const METRICS_PORT_NAME: &str = "metricsapi";
pub const EXTERNAL_METRICS_GROUP: &str = "external.metrics.k8s.io";
pub const EXTERNAL_METRICS_VERSION: &str = "v1beta1";
pub const HPA_SERVICE_ACCOUNT: &str = "horizontal-pod-autoscaler";
pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";
pub const AUTH_DELEGATOR_CLUSTER_ROLE: &str = "system:auth-delegator";
pub const EXTENSION_APISERVER_AUTH_ROLE: &str = "extension-apiserver-authentication-reader";

pub const API_KEY_SECRET_KEY: &str = "api_key";
pub const APP_KEY_SECRET_KEY: &str = "app_key";

pub const DD_EXTERNAL_METRICS_PROVIDER_ENABLED: &str = "DD_EXTERNAL_METRICS_PROVIDER_ENABLED";
pub const DD_EXTERNAL_METRICS_PROVIDER_PORT: &str = "DD_EXTERNAL_METRICS_PROVIDER_PORT";
pub const DD_EXTERNAL_METRICS_PROVIDER_USE_DATADOGMETRIC_CRD: &str =
    "DD_EXTERNAL_METRICS_PROVIDER_USE_DATADOGMETRIC_CRD";
pub const DD_EXTERNAL_METRICS_PROVIDER_WPA_CONTROLLER: &str =
    "DD_EXTERNAL_METRICS_PROVIDER_WPA_CONTROLLER";
pub const DD_EXTERNAL_METRICS_PROVIDER_ENDPOINT: &str = "DD_EXTERNAL_METRICS_PROVIDER_ENDPOINT";
pub const DD_EXTERNAL_METRICS_PROVIDER_API_KEY: &str = "DD_EXTERNAL_METRICS_PROVIDER_API_KEY";
pub const DD_EXTERNAL_METRICS_PROVIDER_APP_KEY: &str = "DD_EXTERNAL_METRICS_PROVIDER_APP_KEY";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(ExternalMetricsFeature::default())
}

pub fn metrics_server_service_name(owner_name: &str) -> String {
    format!("{owner_name}-cluster-agent-metrics-server")
}

pub fn endpoint_credentials_secret_name(owner_name: &str) -> String {
    format!("{owner_name}-metrics-server")
}

/// Key read from the owned endpoint Secret or from a Secret managed elsewhere.
#[derive(Clone, Debug, PartialEq, Eq)]
enum KeySource {
    Owned(String),
    External { secret_name: String, key: String },
}

/// Serves `external.metrics.k8s.io` from the cluster agent for HPAs.
#[derive(Debug, Default)]
pub struct ExternalMetricsFeature {
    owner: Owner,
    port: i32,
    register_api_service: bool,
    use_datadog_metrics: bool,
    wpa_controller: bool,
    endpoint_url: Option<String>,
    api_key: Option<KeySource>,
    app_key: Option<KeySource>,
}

impl ExternalMetricsFeature {
    fn required() -> RequiredComponents {
        RequiredComponents::default().with(
            ComponentKind::ClusterAgent,
            RequiredComponent::required([ContainerName::ClusterAgent]),
        )
    }

    fn rbac_name(&self, suffix: &str) -> String {
        format!(
            "{}-{suffix}",
            ComponentKind::ClusterAgent.rbac_resource_name(&self.owner.name)
        )
    }

    fn key_env(&self, name: &str, source: Option<&KeySource>, owned_key: &str) -> Option<EnvVar> {
        match source? {
            KeySource::Owned(_) => Some(EnvVar::from_secret(
                name,
                endpoint_credentials_secret_name(&self.owner.name),
                owned_key,
            )),
            KeySource::External { secret_name, key } => {
                Some(EnvVar::from_secret(name, secret_name, key))
            }
        }
    }
}

fn key_source(literal: Option<&String>, secret: Option<&v2alpha1::SecretRef>) -> Option<KeySource> {
    if let Some(secret) = secret {
        return Some(KeySource::External {
            secret_name: secret.secret_name.clone(),
            key: secret.key_name.clone(),
        });
    }
    literal
        .filter(|v| !v.is_empty())
        .map(|v| KeySource::Owned(v.clone()))
}

impl Feature for ExternalMetricsFeature {
    fn id(&self) -> FeatureId {
        FeatureId::ExternalMetrics
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(em) = dda.features().and_then(|f| f.external_metrics_server.as_ref()) else {
            return RequiredComponents::default();
        };
        if !enabled(em.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.port = em.port.unwrap_or(DEFAULT_METRICS_PORT);
        self.register_api_service = em.register_api_service.unwrap_or(true);
        self.use_datadog_metrics = enabled(em.use_datadog_metrics);
        self.wpa_controller = enabled(em.wpa_controller);
        if let Some(endpoint) = &em.endpoint {
            self.endpoint_url = endpoint.url.clone();
            if let Some(creds) = &endpoint.credentials {
                self.api_key = key_source(creds.api_key.as_ref(), creds.api_secret.as_ref());
                self.app_key = key_source(creds.app_key.as_ref(), creds.app_secret.as_ref());
            }
        }

        Self::required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(em) = dda
            .cluster_agent_config()
            .and_then(|c| c.external_metrics.as_ref())
        else {
            return RequiredComponents::default();
        };
        if !enabled(em.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.port = em.port.unwrap_or(DEFAULT_METRICS_PORT);
        self.register_api_service = true;

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
        let service_name = metrics_server_service_name(&self.owner.name);

        let service = Service::new(&service_name, Selector::for_component(&self.owner.name, kind))
            .labels(Labels::for_component(&self.owner.name, kind))
            .port(ServicePort::tcp(METRICS_PORT_NAME, self.port, self.port));
        managers.service().add_service(ns, service)?;

        if self.register_api_service {
            managers.api_service().add_api_service(
                ApiService::new(EXTERNAL_METRICS_GROUP, EXTERNAL_METRICS_VERSION)
                    .labels(Labels::for_component(&self.owner.name, kind))
                    .service(ns, &service_name, self.port)
                    .insecure_skip_tls_verify(true),
            );
        }

        let sa_name = kind.service_account_name(&self.owner.name);
        let mut rbac = managers.rbac();
        rbac.add_cluster_role_binding(
            ns,
            &self.rbac_name("auth-delegator"),
            &sa_name,
            RoleRef::cluster_role(AUTH_DELEGATOR_CLUSTER_ROLE),
        );
        rbac.add_role_binding(
            KUBE_SYSTEM_NAMESPACE,
            &self.rbac_name("apiserver-auth"),
            ns,
            &sa_name,
            RoleRef::role(EXTENSION_APISERVER_AUTH_ROLE),
        );

        let mut provider_rules = vec![
            PolicyRule::new()
                .api_groups(&[EXTERNAL_METRICS_GROUP])
                .resources(&["*"])
                .verbs(&[GET_VERB, LIST_VERB, WATCH_VERB]),
            PolicyRule::new()
                .core_api()
                .resources(&["configmaps"])
                .verbs(&[GET_VERB, LIST_VERB, WATCH_VERB, CREATE_VERB, UPDATE_VERB, DELETE_VERB]),
            PolicyRule::new()
                .api_groups(&["autoscaling"])
                .resources(&["horizontalpodautoscalers"])
                .verbs(&[LIST_VERB, WATCH_VERB]),
        ];
        if self.use_datadog_metrics {
            provider_rules.push(
                PolicyRule::new()
                    .api_groups(&["datadoghq.com"])
                    .resources(&["datadogmetrics", "datadogmetrics/status"])
                    .verbs(&[
                        GET_VERB,
                        LIST_VERB,
                        WATCH_VERB,
                        CREATE_VERB,
                        UPDATE_VERB,
                        DELETE_VERB,
                    ]),
            );
        }
        if self.wpa_controller {
            provider_rules.push(
                PolicyRule::new()
                    .api_groups(&["datadoghq.com"])
                    .resources(&["watermarkpodautoscalers", "watermarkpodautoscalers/status"])
                    .verbs(&[GET_VERB, LIST_VERB, WATCH_VERB, UPDATE_VERB]),
            );
        }
        let provider = self.rbac_name("metrics-provider");
        rbac.add_cluster_policy_rules(ns, &provider, &sa_name, provider_rules);

        let reader = self.rbac_name("external-metrics-reader");
        rbac.add_cluster_policy_rules(
            KUBE_SYSTEM_NAMESPACE,
            &reader,
            HPA_SERVICE_ACCOUNT,
            vec![PolicyRule::new()
                .api_groups(&[EXTERNAL_METRICS_GROUP])
                .resources(&["*"])
                .verbs(&[GET_VERB, LIST_VERB, WATCH_VERB])],
        );

        let secret_name = endpoint_credentials_secret_name(&self.owner.name);
        if let Some(KeySource::Owned(value)) = &self.api_key {
            managers
                .secret()
                .add_secret(ns, &secret_name, API_KEY_SECRET_KEY, value);
        }
        if let Some(KeySource::Owned(value)) = &self.app_key {
            managers
                .secret()
                .add_secret(ns, &secret_name, APP_KEY_SECRET_KEY, value);
        }
        Ok(())
    }

    fn manage_cluster_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        let dca = ContainerName::ClusterAgent;
        let mut env = managers.env_var();
        env.add_env_var_to_container(
            dca,
            EnvVar::from_bool(DD_EXTERNAL_METRICS_PROVIDER_ENABLED, true),
        );
        env.add_env_var_to_container(
            dca,
            EnvVar::value(DD_EXTERNAL_METRICS_PROVIDER_PORT, self.port.to_string()),
        );
        env.add_env_var_to_container(
            dca,
            EnvVar::from_bool(
                DD_EXTERNAL_METRICS_PROVIDER_USE_DATADOGMETRIC_CRD,
                self.use_datadog_metrics,
            ),
        );
        env.add_env_var_to_container(
            dca,
            EnvVar::from_bool(DD_EXTERNAL_METRICS_PROVIDER_WPA_CONTROLLER, self.wpa_controller),
        );
        if let Some(url) = &self.endpoint_url {
            env.add_env_var_to_container(
                dca,
                EnvVar::value(DD_EXTERNAL_METRICS_PROVIDER_ENDPOINT, url),
            );
        }
        let keys = [
            self.key_env(
                DD_EXTERNAL_METRICS_PROVIDER_API_KEY,
                self.api_key.as_ref(),
                API_KEY_SECRET_KEY,
            ),
            self.key_env(
                DD_EXTERNAL_METRICS_PROVIDER_APP_KEY,
                self.app_key.as_ref(),
                APP_KEY_SECRET_KEY,
            ),
        ];
        for var in keys.into_iter().flatten() {
            env.add_env_var_to_container(dca, var);
        }

        managers
            .port()
            .add_port_to_container(dca, ContainerPort::tcp(METRICS_PORT_NAME, self.port));
        Ok(())
    }
}
