use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::error::Result;
use crate::feature::sysprobe;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::EnvVar;

pub const DD_SYSTEM_PROBE_CONFIG_ENABLE_OOM_KILL: &str = "DD_SYSTEM_PROBE_CONFIG_ENABLE_OOM_KILL";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(OomKillFeature)
}

#[derive(Debug, Default)]
pub struct OomKillFeature;

impl Feature for OomKillFeature {
    fn id(&self) -> FeatureId {
        FeatureId::OomKill
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let on = dda
            .features()
            .and_then(|f| f.oom_kill.as_ref())
            .map(|o| enabled(o.enabled))
            .unwrap_or(false);
        if !on {
            return RequiredComponents::default();
        }
        RequiredComponents::default().with(
            ComponentKind::NodeAgent,
            RequiredComponent::required([ContainerName::CoreAgent, ContainerName::SystemProbe]),
        )
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        if !enabled(dda.system_probe().and_then(|p| p.enable_oom_kill)) {
            return RequiredComponents::default();
        }
        RequiredComponents::default().with(
            ComponentKind::NodeAgent,
            RequiredComponent::required([ContainerName::CoreAgent, ContainerName::SystemProbe]),
        )
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        sysprobe::add_privileges(managers);
        sysprobe::add_kernel_headers(managers);
        sysprobe::add_socket(managers, &[ContainerName::CoreAgent]);
        managers.env_var().add_env_var_to_container(
            ContainerName::SystemProbe,
            EnvVar::from_bool(DD_SYSTEM_PROBE_CONFIG_ENABLE_OOM_KILL, true),
        );
        Ok(())
    }
}
