use crate::api::{v1alpha1, v2alpha1};
use crate::component::defaults::{cgroups_volume, procdir_volume};
use crate::component::{ComponentKind, ContainerName};
use crate::error::Result;
use crate::feature::liveprocess::DD_PROCESS_CONFIG_RUN_IN_CORE_AGENT_ENABLED;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::EnvVar;

pub const DD_CONTAINER_COLLECTION_ENABLED: &str = "DD_CONTAINER_COLLECTION_ENABLED";

pub fn build(options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(LiveContainerFeature {
        run_in_core_agent: options.process_checks_in_core_agent,
    })
}

/// Live container collection. Skipped when live process collection is on, which
/// already collects containers.
#[derive(Debug, Default)]
pub struct LiveContainerFeature {
    run_in_core_agent: bool,
}

impl LiveContainerFeature {
    fn required(&self) -> RequiredComponents {
        let mut containers = vec![ContainerName::CoreAgent];
        if !self.run_in_core_agent {
            containers.push(ContainerName::ProcessAgent);
        }
        RequiredComponents::default()
            .with(ComponentKind::NodeAgent, RequiredComponent::required(containers))
    }

    fn manage_agent(&self, managers: &mut PodTemplateManagers, target: ContainerName) {
        let mut volumes = managers.volume();
        let (cgroups, cgroups_mount) = cgroups_volume();
        volumes.add_volume_to_container(cgroups, cgroups_mount, target);
        let (procdir, procdir_mount) = procdir_volume();
        volumes.add_volume_to_container(procdir, procdir_mount, target);

        managers.env_var().add_env_var_to_container(
            target,
            EnvVar::from_bool(DD_CONTAINER_COLLECTION_ENABLED, true),
        );
    }

    fn run_in_core_agent_env(&self) -> EnvVar {
        EnvVar::from_bool(DD_PROCESS_CONFIG_RUN_IN_CORE_AGENT_ENABLED, self.run_in_core_agent)
    }
}

impl Feature for LiveContainerFeature {
    fn id(&self) -> FeatureId {
        FeatureId::LiveContainer
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(features) = dda.features() else {
            return RequiredComponents::default();
        };
        let live_process = features
            .live_process_collection
            .as_ref()
            .is_some_and(|p| enabled(p.enabled));
        let Some(container) = features.live_container_collection.as_ref() else {
            return RequiredComponents::default();
        };
        if live_process || !enabled(container.enabled) {
            return RequiredComponents::default();
        }

        if let Some(core) = container.run_in_core_agent.as_ref() {
            self.run_in_core_agent = enabled(core.enabled);
        }
        self.required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(process) = dda.spec.agent.process.as_ref() else {
            return RequiredComponents::default();
        };
        if !enabled(process.enabled) {
            return RequiredComponents::default();
        }
        self.run_in_core_agent = false;
        self.required()
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        managers.env_var().add_env_var_to_containers(
            &[ContainerName::ProcessAgent, ContainerName::CoreAgent],
            self.run_in_core_agent_env(),
        );
        let target = if self.run_in_core_agent {
            ContainerName::CoreAgent
        } else {
            ContainerName::ProcessAgent
        };
        self.manage_agent(managers, target);
        Ok(())
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        let target = ContainerName::UnprivilegedSingleAgent;
        managers
            .env_var()
            .add_env_var_to_container(target, self.run_in_core_agent_env());
        self.manage_agent(managers, target);
        Ok(())
    }
}
