use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::error::Result;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{EnvVar, Volume, VolumeMount};

pub const DEFAULT_OPEN_FILES_LIMIT: i32 = 100;
pub const DEFAULT_TEMP_STORAGE_PATH: &str = "/var/lib/datadog-agent/logs";
pub const DEFAULT_POD_LOG_PATH: &str = "/var/log/pods";
pub const DEFAULT_CONTAINER_LOG_PATH: &str = "/var/lib/docker/containers";
pub const DEFAULT_SYMLINK_PATH: &str = "/var/log/containers";

pub const POINTER_VOLUME_NAME: &str = "pointerdir";
pub const POINTER_MOUNT_PATH: &str = "/opt/datadog-agent/run";
pub const POD_LOG_VOLUME_NAME: &str = "logpodpath";
pub const CONTAINER_LOG_VOLUME_NAME: &str = "logcontainerpath";
pub const SYMLINK_VOLUME_NAME: &str = "symlinkcontainerpath";

pub const DD_LOGS_ENABLED: &str = "DD_LOGS_ENABLED";
pub const DD_LOGS_CONFIG_CONTAINER_COLLECT_ALL: &str = "DD_LOGS_CONFIG_CONTAINER_COLLECT_ALL";
pub const DD_LOGS_CONFIG_K8S_CONTAINER_USE_FILE: &str = "DD_LOGS_CONFIG_K8S_CONTAINER_USE_FILE";
pub const DD_LOGS_CONFIG_OPEN_FILES_LIMIT: &str = "DD_LOGS_CONFIG_OPEN_FILES_LIMIT";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(LogCollectionFeature::default())
}

#[derive(Debug, Default)]
pub struct LogCollectionFeature {
    container_collect_all: bool,
    collect_using_files: bool,
    open_files_limit: i32,
    temp_storage: String,
    pod_log_path: String,
    container_log_path: String,
    symlink_path: String,
}

fn required() -> RequiredComponents {
    RequiredComponents::default().with(
        ComponentKind::NodeAgent,
        RequiredComponent::required([ContainerName::CoreAgent]),
    )
}

fn path_or(value: Option<&String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

impl LogCollectionFeature {
    fn manage_agent(&self, managers: &mut PodTemplateManagers, agent: ContainerName) {
        let mut env = managers.env_var();
        env.add_env_var_to_container(agent, EnvVar::from_bool(DD_LOGS_ENABLED, true));
        env.add_env_var_to_container(
            agent,
            EnvVar::from_bool(DD_LOGS_CONFIG_CONTAINER_COLLECT_ALL, self.container_collect_all),
        );
        env.add_env_var_to_container(
            agent,
            EnvVar::from_bool(DD_LOGS_CONFIG_K8S_CONTAINER_USE_FILE, self.collect_using_files),
        );
        env.add_env_var_to_container(
            agent,
            EnvVar::value(DD_LOGS_CONFIG_OPEN_FILES_LIMIT, self.open_files_limit.to_string()),
        );

        let mut volumes = managers.volume();
        volumes.add_volume_to_container(
            Volume::host_path(POINTER_VOLUME_NAME, &self.temp_storage),
            VolumeMount::new(POINTER_VOLUME_NAME, POINTER_MOUNT_PATH, false),
            agent,
        );
        for (name, path) in [
            (POD_LOG_VOLUME_NAME, &self.pod_log_path),
            (CONTAINER_LOG_VOLUME_NAME, &self.container_log_path),
            (SYMLINK_VOLUME_NAME, &self.symlink_path),
        ] {
            volumes.add_volume_to_container(
                Volume::host_path(name, path),
                VolumeMount::new(name, path, true),
                agent,
            );
        }
    }
}

impl Feature for LogCollectionFeature {
    fn id(&self) -> FeatureId {
        FeatureId::LogCollection
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(logs) = dda.features().and_then(|f| f.log_collection.as_ref()) else {
            return RequiredComponents::default();
        };
        if !enabled(logs.enabled) {
            return RequiredComponents::default();
        }

        self.container_collect_all = enabled(logs.container_collect_all);
        self.collect_using_files = logs.container_collect_using_files.unwrap_or(true);
        self.open_files_limit = logs.open_files_limit.unwrap_or(DEFAULT_OPEN_FILES_LIMIT);
        self.temp_storage = path_or(logs.temp_storage.as_ref(), DEFAULT_TEMP_STORAGE_PATH);
        self.pod_log_path = path_or(logs.pod_log_path.as_ref(), DEFAULT_POD_LOG_PATH);
        self.container_log_path =
            path_or(logs.container_log_path.as_ref(), DEFAULT_CONTAINER_LOG_PATH);
        self.symlink_path = path_or(logs.container_symlinks_path.as_ref(), DEFAULT_SYMLINK_PATH);
        required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(logs) = dda.spec.features.log_collection.as_ref() else {
            return RequiredComponents::default();
        };
        if !enabled(logs.enabled) {
            return RequiredComponents::default();
        }

        self.container_collect_all = enabled(logs.logs_config_container_collect_all);
        self.collect_using_files = logs.container_collect_using_files.unwrap_or(true);
        self.open_files_limit = logs.open_files_limit.unwrap_or(DEFAULT_OPEN_FILES_LIMIT);
        self.temp_storage = path_or(logs.temp_storage_path.as_ref(), DEFAULT_TEMP_STORAGE_PATH);
        self.pod_log_path = path_or(logs.pod_logs_path.as_ref(), DEFAULT_POD_LOG_PATH);
        self.container_log_path =
            path_or(logs.container_logs_path.as_ref(), DEFAULT_CONTAINER_LOG_PATH);
        self.symlink_path = path_or(logs.container_symlinks_path.as_ref(), DEFAULT_SYMLINK_PATH);
        required()
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::CoreAgent);
        Ok(())
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::UnprivilegedSingleAgent);
        Ok(())
    }
}
