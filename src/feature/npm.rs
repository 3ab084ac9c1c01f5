use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::error::Result;
use crate::feature::sysprobe;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::EnvVar;

pub const DD_SYSTEM_PROBE_NETWORK_ENABLED: &str = "DD_SYSTEM_PROBE_NETWORK_ENABLED";
pub const DD_SYSTEM_PROBE_EXTERNAL: &str = "DD_SYSTEM_PROBE_EXTERNAL";
pub const DD_SYSTEM_PROBE_CONNTRACK_ENABLED: &str = "DD_SYSTEM_PROBE_CONNTRACK_ENABLED";
pub const DD_SYSTEM_PROBE_COLLECT_DNS_STATS_ENABLED: &str =
    "DD_SYSTEM_PROBE_COLLECT_DNS_STATS_ENABLED";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(NpmFeature::default())
}

/// Network performance monitoring through system-probe.
#[derive(Debug, Default)]
pub struct NpmFeature {
    enable_conntrack: bool,
    collect_dns_stats: bool,
}

impl NpmFeature {
    fn required() -> RequiredComponents {
        RequiredComponents::default().with(
            ComponentKind::NodeAgent,
            RequiredComponent::required([
                ContainerName::CoreAgent,
                ContainerName::ProcessAgent,
                ContainerName::SystemProbe,
            ]),
        )
    }
}

impl Feature for NpmFeature {
    fn id(&self) -> FeatureId {
        FeatureId::Npm
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(npm) = dda.features().and_then(|f| f.npm.as_ref()) else {
            return RequiredComponents::default();
        };
        if !enabled(npm.enabled) {
            return RequiredComponents::default();
        }

        self.enable_conntrack = npm.enable_conntrack.unwrap_or(true);
        self.collect_dns_stats = npm.collect_dns_stats.unwrap_or(true);
        Self::required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let npm_enabled = dda
            .spec
            .features
            .network_monitoring
            .as_ref()
            .map(|n| enabled(n.enabled))
            .unwrap_or(false);
        if !npm_enabled {
            return RequiredComponents::default();
        }

        let probe = dda.system_probe();
        self.enable_conntrack = probe.and_then(|p| p.conntrack_enabled).unwrap_or(true);
        self.collect_dns_stats = probe.and_then(|p| p.collect_dns_stats).unwrap_or(true);
        Self::required()
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        sysprobe::add_privileges(managers);
        sysprobe::add_socket(
            managers,
            &[ContainerName::CoreAgent, ContainerName::ProcessAgent],
        );

        let mut env = managers.env_var();
        env.add_env_var_to_containers(
            &[ContainerName::ProcessAgent, ContainerName::SystemProbe],
            EnvVar::from_bool(DD_SYSTEM_PROBE_NETWORK_ENABLED, true),
        );
        env.add_env_var_to_container(
            ContainerName::SystemProbe,
            EnvVar::from_bool(DD_SYSTEM_PROBE_EXTERNAL, true),
        );
        env.add_env_var_to_container(
            ContainerName::SystemProbe,
            EnvVar::from_bool(DD_SYSTEM_PROBE_CONNTRACK_ENABLED, self.enable_conntrack),
        );
        env.add_env_var_to_container(
            ContainerName::SystemProbe,
            EnvVar::from_bool(DD_SYSTEM_PROBE_COLLECT_DNS_STATS_ENABLED, self.collect_dns_stats),
        );
        Ok(())
    }
}
