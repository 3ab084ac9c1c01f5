use crate::api::{v1alpha1, v2alpha1};
use crate::component::defaults::{cgroups_volume, procdir_volume};
use crate::component::{ComponentKind, ContainerName};
use crate::error::Result;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{EnvVar, Volume, VolumeMount};

pub const PASSWD_VOLUME_NAME: &str = "passwd";
pub const PASSWD_HOST_PATH: &str = "/etc/passwd";
pub const PASSWD_MOUNT_PATH: &str = "/etc/passwd";

pub const DD_PROCESS_CONFIG_PROCESS_COLLECTION_ENABLED: &str =
    "DD_PROCESS_CONFIG_PROCESS_COLLECTION_ENABLED";
pub const DD_PROCESS_CONFIG_RUN_IN_CORE_AGENT_ENABLED: &str =
    "DD_PROCESS_CONFIG_RUN_IN_CORE_AGENT_ENABLED";
pub const DD_PROCESS_CONFIG_SCRUB_ARGS: &str = "DD_PROCESS_CONFIG_SCRUB_ARGS";
pub const DD_PROCESS_CONFIG_STRIP_PROC_ARGUMENTS: &str = "DD_PROCESS_CONFIG_STRIP_PROC_ARGUMENTS";

pub fn build(options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(LiveProcessFeature {
        run_in_core_agent: options.process_checks_in_core_agent,
        ..Default::default()
    })
}

/// Live process collection, in the process agent or in the core agent.
#[derive(Debug, Default)]
pub struct LiveProcessFeature {
    run_in_core_agent: bool,
    scrub_args: Option<bool>,
    strip_args: Option<bool>,
}

impl LiveProcessFeature {
    fn required(&self) -> RequiredComponents {
        let mut containers = vec![ContainerName::CoreAgent];
        if !self.run_in_core_agent {
            containers.push(ContainerName::ProcessAgent);
        }
        RequiredComponents::default()
            .with(ComponentKind::NodeAgent, RequiredComponent::required(containers))
    }

    fn target(&self) -> ContainerName {
        if self.run_in_core_agent {
            ContainerName::CoreAgent
        } else {
            ContainerName::ProcessAgent
        }
    }

    fn manage_agent(&self, managers: &mut PodTemplateManagers, target: ContainerName) {
        let mut env = managers.env_var();
        env.add_env_var_to_container(
            target,
            EnvVar::from_bool(DD_PROCESS_CONFIG_PROCESS_COLLECTION_ENABLED, true),
        );
        env.add_env_var_to_container(
            target,
            EnvVar::from_bool(DD_PROCESS_CONFIG_RUN_IN_CORE_AGENT_ENABLED, self.run_in_core_agent),
        );
        if let Some(scrub) = self.scrub_args {
            env.add_env_var_to_container(
                target,
                EnvVar::from_bool(DD_PROCESS_CONFIG_SCRUB_ARGS, scrub),
            );
        }
        if let Some(strip) = self.strip_args {
            env.add_env_var_to_container(
                target,
                EnvVar::from_bool(DD_PROCESS_CONFIG_STRIP_PROC_ARGUMENTS, strip),
            );
        }

        let mut volumes = managers.volume();
        volumes.add_volume_to_container(
            Volume::host_path(PASSWD_VOLUME_NAME, PASSWD_HOST_PATH),
            VolumeMount::new(PASSWD_VOLUME_NAME, PASSWD_MOUNT_PATH, true),
            target,
        );
        let (cgroups, cgroups_mount) = cgroups_volume();
        volumes.add_volume_to_container(cgroups, cgroups_mount, target);
        let (procdir, procdir_mount) = procdir_volume();
        volumes.add_volume_to_container(procdir, procdir_mount, target);
    }
}

impl Feature for LiveProcessFeature {
    fn id(&self) -> FeatureId {
        FeatureId::LiveProcess
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(process) = dda.features().and_then(|f| f.live_process_collection.as_ref()) else {
            return RequiredComponents::default();
        };
        if !enabled(process.enabled) {
            return RequiredComponents::default();
        }

        self.scrub_args = process.scrub_process_arguments;
        self.strip_args = process.strip_process_arguments;
        self.required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(process) = dda.spec.agent.process.as_ref() else {
            return RequiredComponents::default();
        };
        if !(enabled(process.enabled) && enabled(process.process_collection_enabled)) {
            return RequiredComponents::default();
        }
        self.required()
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, self.target());
        Ok(())
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::UnprivilegedSingleAgent);
        Ok(())
    }
}
