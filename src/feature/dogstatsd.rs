use std::path::Path;

use crate::api::{v1alpha1, v2alpha1};
use crate::component::defaults::{DOGSTATSD_SOCKET_HOST_PATH, DOGSTATSD_SOCKET_VOLUME_NAME};
use crate::component::{ComponentKind, ContainerName};
use crate::dependencies::ResourceManagers;
use crate::error::Result;
use crate::feature::{
    add_agent_local_service, enabled, Feature, FeatureId, FeatureOptions, LocalServiceConfig,
    Owner, RequiredComponent, RequiredComponents,
};
use crate::merger::{MergeStrategy, PodTemplateManagers};
use crate::types::{ContainerPort, EnvVar, ServicePort, Volume, VolumeMount};

pub const DEFAULT_DOGSTATSD_PORT: i32 = 8125;
pub const DEFAULT_DOGSTATSD_SOCKET_PATH: &str = "/var/run/datadog/dsd.socket";
pub const DOGSTATSD_PORT_NAME: &str = "dogstatsdport";

pub const DD_DOGSTATSD_PORT: &str = "DD_DOGSTATSD_PORT";
pub const DD_DOGSTATSD_NON_LOCAL_TRAFFIC: &str = "DD_DOGSTATSD_NON_LOCAL_TRAFFIC";
pub const DD_DOGSTATSD_SOCKET: &str = "DD_DOGSTATSD_SOCKET";
pub const DD_DOGSTATSD_ORIGIN_DETECTION: &str = "DD_DOGSTATSD_ORIGIN_DETECTION";
pub const DD_DOGSTATSD_ORIGIN_DETECTION_CLIENT: &str = "DD_DOGSTATSD_ORIGIN_DETECTION_CLIENT";
pub const DD_DOGSTATSD_TAG_CARDINALITY: &str = "DD_DOGSTATSD_TAG_CARDINALITY";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(DogstatsdFeature::default())
}

/// StatsD intake of the core agent over UDP and a unix socket.
#[derive(Debug, Default)]
pub struct DogstatsdFeature {
    owner: Owner,
    host_port: Option<i32>,
    socket_path: Option<String>,
    origin_detection: bool,
    tag_cardinality: Option<String>,
    local_service: LocalServiceConfig,
}

fn required() -> RequiredComponents {
    RequiredComponents::default().with(
        ComponentKind::NodeAgent,
        RequiredComponent::required([ContainerName::CoreAgent]),
    )
}

impl DogstatsdFeature {
    fn manage_agent(&self, managers: &mut PodTemplateManagers, agent: ContainerName) -> Result<()> {
        let mut port = ContainerPort::udp(DOGSTATSD_PORT_NAME, DEFAULT_DOGSTATSD_PORT);
        if let Some(host_port) = self.host_port {
            port = port.host_port(host_port);
            managers.env_var().add_env_var_to_container(
                agent,
                EnvVar::from_bool(DD_DOGSTATSD_NON_LOCAL_TRAFFIC, true),
            );
        }
        managers.port().add_port_to_container(agent, port);
        managers.env_var().add_env_var_to_container(
            agent,
            EnvVar::value(DD_DOGSTATSD_PORT, DEFAULT_DOGSTATSD_PORT.to_string()),
        );

        if let Some(path) = &self.socket_path {
            let dir = Path::new(path)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DOGSTATSD_SOCKET_HOST_PATH.to_string());
            managers.volume().add_volume_with_merge(
                Volume::host_path_typed(DOGSTATSD_SOCKET_VOLUME_NAME, &dir, "DirectoryOrCreate"),
                MergeStrategy::Override,
            )?;
            managers.volume_mount().add_volume_mount_to_container_with_merge(
                VolumeMount::new(DOGSTATSD_SOCKET_VOLUME_NAME, &dir, false),
                agent,
                MergeStrategy::Override,
            )?;
            managers
                .env_var()
                .add_env_var_to_container(agent, EnvVar::value(DD_DOGSTATSD_SOCKET, path));
        }

        if self.origin_detection {
            managers.env_var().add_env_var_to_container(
                agent,
                EnvVar::from_bool(DD_DOGSTATSD_ORIGIN_DETECTION, true),
            );
            managers.env_var().add_env_var_to_container(
                agent,
                EnvVar::from_bool(DD_DOGSTATSD_ORIGIN_DETECTION_CLIENT, true),
            );
            if self.socket_path.is_some() {
                managers.pod_template_mut().host_pid = true;
            }
        }
        if let Some(cardinality) = &self.tag_cardinality {
            managers.env_var().add_env_var_to_container(
                agent,
                EnvVar::value(DD_DOGSTATSD_TAG_CARDINALITY, cardinality),
            );
        }
        Ok(())
    }
}

impl Feature for DogstatsdFeature {
    fn id(&self) -> FeatureId {
        FeatureId::Dogstatsd
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        self.owner = Owner::from_resource(dda);
        self.local_service = LocalServiceConfig::from_v2(dda);
        self.socket_path = Some(DEFAULT_DOGSTATSD_SOCKET_PATH.to_string());

        let Some(dsd) = dda.features().and_then(|f| f.dogstatsd.as_ref()) else {
            return required();
        };
        self.host_port = dsd
            .host_port_config
            .as_ref()
            .filter(|h| enabled(h.enabled))
            .map(|h| h.host_port.unwrap_or(DEFAULT_DOGSTATSD_PORT));
        self.socket_path = match &dsd.unix_domain_socket_config {
            Some(uds) if uds.enabled == Some(false) => None,
            Some(uds) => Some(
                uds.path
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DOGSTATSD_SOCKET_PATH.to_string()),
            ),
            None => Some(DEFAULT_DOGSTATSD_SOCKET_PATH.to_string()),
        };
        self.origin_detection = enabled(dsd.origin_detection_enabled);
        self.tag_cardinality = dsd.tag_cardinality.clone();
        required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        self.owner = Owner::from_resource(dda);
        self.local_service = LocalServiceConfig::from_v1(dda);

        let config = dda.spec.agent.config.as_ref();
        self.host_port = config.and_then(|c| c.host_port);
        let dsd = config.and_then(|c| c.dogstatsd.as_ref());
        self.origin_detection = enabled(dsd.and_then(|d| d.dogstatsd_origin_detection));
        self.socket_path = dsd
            .and_then(|d| d.unix_domain_socket.as_ref())
            .filter(|u| enabled(u.enabled))
            .map(|u| {
                u.host_filepath
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DOGSTATSD_SOCKET_PATH.to_string())
            });
        required()
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
            vec![ServicePort::udp(
                DOGSTATSD_PORT_NAME,
                DEFAULT_DOGSTATSD_PORT,
                DEFAULT_DOGSTATSD_PORT,
            )],
        )
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::CoreAgent)
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::UnprivilegedSingleAgent)
    }
}
