use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::error::Result;
use crate::feature::sysprobe;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::EnvVar;

pub const DD_SYSTEM_PROBE_CONFIG_ENABLE_TCP_QUEUE_LENGTH: &str =
    "DD_SYSTEM_PROBE_CONFIG_ENABLE_TCP_QUEUE_LENGTH";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(TcpQueueLengthFeature)
}

/// eBPF check reporting TCP receive and send queue usage.
#[derive(Debug, Default)]
pub struct TcpQueueLengthFeature;

fn required() -> RequiredComponents {
    RequiredComponents::default().with(
        ComponentKind::NodeAgent,
        RequiredComponent::required([ContainerName::CoreAgent, ContainerName::SystemProbe]),
    )
}

impl Feature for TcpQueueLengthFeature {
    fn id(&self) -> FeatureId {
        FeatureId::TcpQueueLength
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        match dda.features().and_then(|f| f.tcp_queue_length.as_ref()) {
            Some(tcpq) if enabled(tcpq.enabled) => required(),
            _ => RequiredComponents::default(),
        }
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        match dda.system_probe().and_then(|p| p.enable_tcp_queue_length) {
            Some(true) => required(),
            _ => RequiredComponents::default(),
        }
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        sysprobe::add_privileges(managers);
        sysprobe::add_kernel_headers(managers);
        sysprobe::add_socket(managers, &[ContainerName::CoreAgent]);
        managers.env_var().add_env_var_to_container(
            ContainerName::SystemProbe,
            EnvVar::from_bool(DD_SYSTEM_PROBE_CONFIG_ENABLE_TCP_QUEUE_LENGTH, true),
        );
        Ok(())
    }
}
