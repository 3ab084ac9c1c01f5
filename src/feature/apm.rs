use std::path::Path;

use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::dependencies::ResourceManagers;
use crate::error::{Error, Result};
use crate::feature::{
    add_agent_local_service, enabled, Feature, FeatureId, FeatureOptions, LocalServiceConfig,
    Owner, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{ContainerPort, EnvVar, ServicePort, Volume, VolumeMount};

pub const DEFAULT_APM_PORT: i32 = 8126;
pub const DEFAULT_APM_SOCKET_PATH: &str = "/var/run/datadog/apm.socket";
pub const APM_PORT_NAME: &str = "traceport";
pub const APM_SOCKET_VOLUME_NAME: &str = "apmsocket";

pub const DD_APM_ENABLED: &str = "DD_APM_ENABLED";
pub const DD_APM_RECEIVER_PORT: &str = "DD_APM_RECEIVER_PORT";
pub const DD_APM_NON_LOCAL_TRAFFIC: &str = "DD_APM_NON_LOCAL_TRAFFIC";
pub const DD_APM_RECEIVER_SOCKET: &str = "DD_APM_RECEIVER_SOCKET";
pub const DD_APM_INSTRUMENTATION_ENABLED: &str = "DD_APM_INSTRUMENTATION_ENABLED";
pub const DD_APM_INSTRUMENTATION_ENABLED_NAMESPACES: &str =
    "DD_APM_INSTRUMENTATION_ENABLED_NAMESPACES";
pub const DD_APM_INSTRUMENTATION_DISABLED_NAMESPACES: &str =
    "DD_APM_INSTRUMENTATION_DISABLED_NAMESPACES";
pub const DD_APM_INSTRUMENTATION_LIB_VERSIONS: &str = "DD_APM_INSTRUMENTATION_LIB_VERSIONS";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(ApmFeature::default())
}

#[derive(Debug, Default)]
pub struct ApmFeature {
    owner: Owner,
    host_port: Option<i32>,
    socket_path: Option<String>,
    single_step: Option<v2alpha1::SingleStepInstrumentation>,
    local_service: LocalServiceConfig,
}

impl ApmFeature {
    fn required(&self) -> RequiredComponents {
        let mut components = RequiredComponents::default().with(
            ComponentKind::NodeAgent,
            RequiredComponent::required([ContainerName::CoreAgent, ContainerName::TraceAgent]),
        );
        if self.single_step.is_some() {
            components = components.with(
                ComponentKind::ClusterAgent,
                RequiredComponent::required([ContainerName::ClusterAgent]),
            );
        }
        components
    }

    fn manage_agent(&self, managers: &mut PodTemplateManagers, trace: ContainerName) {
        let mut env = managers.env_var();
        env.add_env_var_to_container(trace, EnvVar::from_bool(DD_APM_ENABLED, true));
        env.add_env_var_to_container(
            trace,
            EnvVar::value(DD_APM_RECEIVER_PORT, DEFAULT_APM_PORT.to_string()),
        );

        let mut port = ContainerPort::tcp(APM_PORT_NAME, DEFAULT_APM_PORT);
        if let Some(host_port) = self.host_port {
            port = port.host_port(host_port);
            managers
                .env_var()
                .add_env_var_to_container(trace, EnvVar::from_bool(DD_APM_NON_LOCAL_TRAFFIC, true));
        }
        managers.port().add_port_to_container(trace, port);

        if let Some(path) = &self.socket_path {
            let dir = socket_dir(path);
            managers.volume().add_volume_to_container(
                Volume::host_path_typed(APM_SOCKET_VOLUME_NAME, &dir, "DirectoryOrCreate"),
                VolumeMount::new(APM_SOCKET_VOLUME_NAME, &dir, false),
                trace,
            );
            managers
                .env_var()
                .add_env_var_to_container(trace, EnvVar::value(DD_APM_RECEIVER_SOCKET, path));
        }
    }
}

fn socket_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "/".to_string())
}

impl Feature for ApmFeature {
    fn id(&self) -> FeatureId {
        FeatureId::Apm
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(apm) = dda.features().and_then(|f| f.apm.as_ref()) else {
            return RequiredComponents::default();
        };
        if !enabled(apm.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.local_service = LocalServiceConfig::from_v2(dda);
        self.host_port = apm
            .host_port_config
            .as_ref()
            .filter(|h| enabled(h.enabled))
            .map(|h| h.host_port.unwrap_or(DEFAULT_APM_PORT));
        self.socket_path = apm
            .unix_domain_socket_config
            .as_ref()
            .filter(|u| enabled(u.enabled))
            .map(|u| {
                u.path
                    .clone()
                    .unwrap_or_else(|| DEFAULT_APM_SOCKET_PATH.to_string())
            });
        self.single_step = apm
            .single_step_instrumentation
            .as_ref()
            .filter(|s| enabled(s.enabled))
            .cloned();

        self.required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(apm) = dda.spec.agent.apm.as_ref() else {
            return RequiredComponents::default();
        };
        if !enabled(apm.enabled) {
            return RequiredComponents::default();
        }

        self.owner = Owner::from_resource(dda);
        self.local_service = LocalServiceConfig::from_v1(dda);
        self.host_port = apm.host_port;
        self.socket_path = apm
            .unix_domain_socket
            .as_ref()
            .filter(|u| enabled(u.enabled))
            .map(|u| {
                u.host_filepath
                    .clone()
                    .unwrap_or_else(|| DEFAULT_APM_SOCKET_PATH.to_string())
            });

        self.required()
    }

    fn manage_dependencies(
        &self,
        managers: &mut ResourceManagers,
        components: &RequiredComponents,
    ) -> Result<()> {
        if !components.node_agent.is_enabled() {
            return Ok(());
        }
        add_agent_local_service(
            managers,
            &self.owner,
            &self.local_service,
            vec![ServicePort::tcp(APM_PORT_NAME, DEFAULT_APM_PORT, DEFAULT_APM_PORT)],
        )
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::TraceAgent);
        Ok(())
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::UnprivilegedSingleAgent);
        Ok(())
    }

    fn manage_cluster_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        let Some(ssi) = &self.single_step else {
            return Ok(());
        };
        if !ssi.enabled_namespaces.is_empty() && !ssi.disabled_namespaces.is_empty() {
            tracing::error!(
                owner = %self.owner.name,
                "Single step instrumentation sets both enabled and disabled namespaces"
            );
            return Err(Error::InvalidConfig(
                "apm.singleStepInstrumentation.enabledNamespaces and \
                 disabledNamespaces are mutually exclusive"
                    .to_string(),
            ));
        }

        let mut env = managers.env_var();
        let dca = ContainerName::ClusterAgent;
        env.add_env_var_to_container(dca, EnvVar::from_bool(DD_APM_INSTRUMENTATION_ENABLED, true));
        if !ssi.enabled_namespaces.is_empty() {
            env.add_env_var_to_container(
                dca,
                EnvVar::value(
                    DD_APM_INSTRUMENTATION_ENABLED_NAMESPACES,
                    serde_json::to_string(&ssi.enabled_namespaces)?,
                ),
            );
        }
        if !ssi.disabled_namespaces.is_empty() {
            env.add_env_var_to_container(
                dca,
                EnvVar::value(
                    DD_APM_INSTRUMENTATION_DISABLED_NAMESPACES,
                    serde_json::to_string(&ssi.disabled_namespaces)?,
                ),
            );
        }
        if !ssi.lib_versions.is_empty() {
            env.add_env_var_to_container(
                dca,
                EnvVar::value(
                    DD_APM_INSTRUMENTATION_LIB_VERSIONS,
                    serde_json::to_string(&ssi.lib_versions)?,
                ),
            );
        }
        Ok(())
    }
}
