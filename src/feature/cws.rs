use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::error::Result;
use crate::feature::sysprobe;
use crate::feature::{
    enabled, Feature, FeatureId, FeatureOptions, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{EnvVar, Volume, VolumeMount};

pub const RUNTIME_SECURITY_SOCKET_PATH: &str = "/var/run/sysprobe/runtime-security.sock";
pub const POLICIES_VOLUME_NAME: &str = "customruntimepolicies";
pub const POLICIES_DIR: &str = "/etc/datadog-agent/runtime-security.d";

pub const SECURITYFS_VOLUME_NAME: &str = "securityfs";
pub const SECURITYFS_PATH: &str = "/sys/kernel/security";
pub const PASSWD_VOLUME_NAME: &str = "passwd";
pub const PASSWD_PATH: &str = "/etc/passwd";
pub const GROUP_VOLUME_NAME: &str = "group";
pub const GROUP_PATH: &str = "/etc/group";
pub const OS_RELEASE_VOLUME_NAME: &str = "os-release";
pub const OS_RELEASE_PATH: &str = "/etc/os-release";
pub const HOST_ROOT_VOLUME_NAME: &str = "hostroot";
pub const HOST_ROOT_MOUNT_PATH: &str = "/host/root";

pub const DD_RUNTIME_SECURITY_CONFIG_ENABLED: &str = "DD_RUNTIME_SECURITY_CONFIG_ENABLED";
pub const DD_RUNTIME_SECURITY_CONFIG_SOCKET: &str = "DD_RUNTIME_SECURITY_CONFIG_SOCKET";
pub const DD_RUNTIME_SECURITY_CONFIG_SYSCALL_MONITOR_ENABLED: &str =
    "DD_RUNTIME_SECURITY_CONFIG_SYSCALL_MONITOR_ENABLED";
pub const DD_RUNTIME_SECURITY_CONFIG_POLICIES_DIR: &str =
    "DD_RUNTIME_SECURITY_CONFIG_POLICIES_DIR";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(CwsFeature::default())
}

/// Cloud workload security: runtime event collection in system-probe, rule evaluation in
/// the security agent.
#[derive(Debug, Default)]
pub struct CwsFeature {
    syscall_monitor_enabled: bool,
    custom_policies: Option<String>,
}

impl CwsFeature {
    fn required() -> RequiredComponents {
        RequiredComponents::default().with(
            ComponentKind::NodeAgent,
            RequiredComponent::required([
                ContainerName::CoreAgent,
                ContainerName::SecurityAgent,
                ContainerName::SystemProbe,
            ]),
        )
    }
}

impl Feature for CwsFeature {
    fn id(&self) -> FeatureId {
        FeatureId::Cws
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(cws) = dda.features().and_then(|f| f.cws.as_ref()) else {
            return RequiredComponents::default();
        };
        if !enabled(cws.enabled) {
            return RequiredComponents::default();
        }

        self.syscall_monitor_enabled = enabled(cws.syscall_monitor_enabled);
        self.custom_policies = cws.custom_policies.as_ref().map(|c| c.name.clone());
        Self::required()
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        let Some(runtime) = dda
            .spec
            .agent
            .security
            .as_ref()
            .and_then(|s| s.runtime.as_ref())
        else {
            return RequiredComponents::default();
        };
        if !enabled(runtime.enabled) {
            return RequiredComponents::default();
        }

        self.syscall_monitor_enabled = runtime
            .syscall_monitor
            .as_ref()
            .map(|s| enabled(s.enabled))
            .unwrap_or(false);
        self.custom_policies = runtime
            .policies_dir
            .as_ref()
            .map(|p| p.config_map_name.clone());
        Self::required()
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        sysprobe::add_privileges(managers);
        sysprobe::add_socket(managers, &[ContainerName::SecurityAgent]);
        managers.pod_template_mut().host_pid = true;

        let probe = ContainerName::SystemProbe;
        let security = ContainerName::SecurityAgent;
        let mut volumes = managers.volume();
        volumes.add_volume_to_container(
            Volume::host_path(SECURITYFS_VOLUME_NAME, SECURITYFS_PATH),
            VolumeMount::new(SECURITYFS_VOLUME_NAME, SECURITYFS_PATH, true),
            probe,
        );
        for (name, path) in [
            (PASSWD_VOLUME_NAME, PASSWD_PATH),
            (GROUP_VOLUME_NAME, GROUP_PATH),
            (OS_RELEASE_VOLUME_NAME, OS_RELEASE_PATH),
        ] {
            volumes.add_volume_to_container(
                Volume::host_path(name, path),
                VolumeMount::new(name, format!("/host{path}"), true),
                probe,
            );
        }
        volumes.add_volume_to_container(
            Volume::host_path(HOST_ROOT_VOLUME_NAME, "/"),
            VolumeMount::new(HOST_ROOT_VOLUME_NAME, HOST_ROOT_MOUNT_PATH, true),
            security,
        );

        let mut env = managers.env_var();
        env.add_env_var_to_containers(
            &[security, probe],
            EnvVar::from_bool(DD_RUNTIME_SECURITY_CONFIG_ENABLED, true),
        );
        env.add_env_var_to_containers(
            &[security, probe],
            EnvVar::value(DD_RUNTIME_SECURITY_CONFIG_SOCKET, RUNTIME_SECURITY_SOCKET_PATH),
        );
        env.add_env_var_to_container(
            probe,
            EnvVar::from_bool(
                DD_RUNTIME_SECURITY_CONFIG_SYSCALL_MONITOR_ENABLED,
                self.syscall_monitor_enabled,
            ),
        );

        if let Some(config_map) = &self.custom_policies {
            managers.volume().add_volume_to_containers(
                Volume::configmap(POLICIES_VOLUME_NAME, config_map),
                VolumeMount::new(POLICIES_VOLUME_NAME, POLICIES_DIR, true),
                &[security, probe],
            );
            managers.env_var().add_env_var_to_containers(
                &[security, probe],
                EnvVar::value(DD_RUNTIME_SECURITY_CONFIG_POLICIES_DIR, POLICIES_DIR),
            );
        }
        Ok(())
    }
}
