//! Pod template pieces shared by the features running eBPF programs in system-probe.

use crate::component::defaults::{cgroups_volume, procdir_volume};
use crate::component::ContainerName;
use crate::merger::PodTemplateManagers;
use crate::types::{EnvVar, Volume, VolumeMount};

pub const SOCKET_VOLUME_NAME: &str = "sysprobe-socket-dir";
pub const SOCKET_DIR: &str = "/var/run/sysprobe";
pub const SOCKET_PATH: &str = "/var/run/sysprobe/sysprobe.sock";

pub const DEBUGFS_VOLUME_NAME: &str = "debugfs";
pub const DEBUGFS_PATH: &str = "/sys/kernel/debug";
pub const MODULES_VOLUME_NAME: &str = "modules";
pub const MODULES_PATH: &str = "/lib/modules";
pub const SRC_VOLUME_NAME: &str = "src";
pub const SRC_PATH: &str = "/usr/src";

pub const APPARMOR_ANNOTATION_KEY: &str =
    "container.apparmor.security.beta.kubernetes.io/system-probe";
pub const APPARMOR_UNCONFINED: &str = "unconfined";

pub const DD_SYSPROBE_SOCKET: &str = "DD_SYSPROBE_SOCKET";
pub const DD_SYSTEM_PROBE_ENABLED: &str = "DD_SYSTEM_PROBE_ENABLED";

pub const CAPABILITIES: [&str; 9] = [
    "SYS_ADMIN",
    "SYS_RESOURCE",
    "SYS_PTRACE",
    "NET_ADMIN",
    "NET_BROADCAST",
    "NET_RAW",
    "IPC_LOCK",
    "CHOWN",
    "DAC_READ_SEARCH",
];

/// Socket directory written by system-probe and read by `consumers`.
pub fn add_socket(managers: &mut PodTemplateManagers, consumers: &[ContainerName]) {
    managers.volume().add_volume_to_container(
        Volume::empty_dir(SOCKET_VOLUME_NAME),
        VolumeMount::new(SOCKET_VOLUME_NAME, SOCKET_DIR, false),
        ContainerName::SystemProbe,
    );
    managers.volume_mount().add_volume_mount_to_containers(
        VolumeMount::new(SOCKET_VOLUME_NAME, SOCKET_DIR, true),
        consumers,
    );

    let mut targets = vec![ContainerName::SystemProbe];
    targets.extend_from_slice(consumers);
    let mut env = managers.env_var();
    env.add_env_var_to_containers(&targets, EnvVar::value(DD_SYSPROBE_SOCKET, SOCKET_PATH));
    env.add_env_var_to_containers(&targets, EnvVar::from_bool(DD_SYSTEM_PROBE_ENABLED, true));
}

/// Capabilities, apparmor profile and host views every eBPF feature needs.
pub fn add_privileges(managers: &mut PodTemplateManagers) {
    managers
        .annotation()
        .add_annotation(APPARMOR_ANNOTATION_KEY, APPARMOR_UNCONFINED);
    managers
        .security_context()
        .add_capabilities_to_container(&CAPABILITIES, ContainerName::SystemProbe);

    let (procdir, procdir_mount) = procdir_volume();
    managers
        .volume()
        .add_volume_to_container(procdir, procdir_mount, ContainerName::SystemProbe);
    let (cgroups, cgroups_mount) = cgroups_volume();
    managers
        .volume()
        .add_volume_to_container(cgroups, cgroups_mount, ContainerName::SystemProbe);

    managers.volume().add_volume_to_container(
        Volume::host_path(DEBUGFS_VOLUME_NAME, DEBUGFS_PATH),
        VolumeMount::new(DEBUGFS_VOLUME_NAME, DEBUGFS_PATH, false),
        ContainerName::SystemProbe,
    );
}

/// Kernel modules and headers used to compile eBPF programs at runtime.
pub fn add_kernel_headers(managers: &mut PodTemplateManagers) {
    managers.volume().add_volume_to_container(
        Volume::host_path(MODULES_VOLUME_NAME, MODULES_PATH),
        VolumeMount::new(MODULES_VOLUME_NAME, MODULES_PATH, true),
        ContainerName::SystemProbe,
    );
    managers.volume().add_volume_to_container(
        Volume::host_path(SRC_VOLUME_NAME, SRC_PATH),
        VolumeMount::new(SRC_VOLUME_NAME, SRC_PATH, true),
        ContainerName::SystemProbe,
    );
}
