use std::collections::BTreeSet;

use super::{
    cluster_agent_service_name, image, seccomp_config_map_name, ComponentKind, ContainerName,
    AGENT_IMAGE_NAME, AGENT_LATEST_VERSION, CLUSTER_AGENT_IMAGE_NAME,
    CLUSTER_AGENT_LATEST_VERSION,
};
use crate::types::{
    Container, ContainerPort, EnvVar, Labels, PodTemplate, SecurityContext, Volume, VolumeMount,
};

pub const LOGDATADOG_VOLUME_NAME: &str = "logdatadog";
pub const LOGDATADOG_VOLUME_PATH: &str = "/var/log/datadog";
pub const AUTH_VOLUME_NAME: &str = "datadog-agent-auth";
pub const AUTH_VOLUME_PATH: &str = "/etc/datadog-agent/auth";
pub const CONFIG_VOLUME_NAME: &str = "config";
pub const CONFIG_VOLUME_PATH: &str = "/etc/datadog-agent";
pub const CONFD_VOLUME_NAME: &str = "confd";
pub const CONFD_VOLUME_PATH: &str = "/conf.d";
pub const PROCDIR_VOLUME_NAME: &str = "procdir";
pub const PROCDIR_HOST_PATH: &str = "/proc";
pub const PROCDIR_MOUNT_PATH: &str = "/host/proc";
pub const CGROUPS_VOLUME_NAME: &str = "cgroups";
pub const CGROUPS_HOST_PATH: &str = "/sys/fs/cgroup";
pub const CGROUPS_MOUNT_PATH: &str = "/host/sys/fs/cgroup";
pub const DOGSTATSD_SOCKET_VOLUME_NAME: &str = "dsdsocket";
pub const DOGSTATSD_SOCKET_HOST_PATH: &str = "/var/run/datadog";
pub const DOGSTATSD_SOCKET_MOUNT_PATH: &str = "/var/run/datadog";
pub const SECCOMP_ROOT_VOLUME_NAME: &str = "seccomp-root";
pub const SECCOMP_ROOT_HOST_PATH: &str = "/var/lib/kubelet/seccomp";
pub const SECCOMP_PROFILE_VOLUME_NAME: &str = "seccomp-profile";
pub const SECCOMP_PROFILE_MOUNT_PATH: &str = "/etc/config";
pub const SYSTEM_PROBE_SECCOMP_KEY: &str = "system-probe-seccomp.json";

pub const AGENT_HEALTH_PORT: i32 = 5555;
pub const CLUSTER_AGENT_CMD_PORT: i32 = 5005;

pub const DD_API_KEY: &str = "DD_API_KEY";
pub const DD_APP_KEY: &str = "DD_APP_KEY";
pub const DD_CLUSTER_AGENT_AUTH_TOKEN: &str = "DD_CLUSTER_AGENT_AUTH_TOKEN";
pub const DD_CLUSTER_AGENT_ENABLED: &str = "DD_CLUSTER_AGENT_ENABLED";
pub const DD_CLUSTER_AGENT_KUBERNETES_SERVICE_NAME: &str =
    "DD_CLUSTER_AGENT_KUBERNETES_SERVICE_NAME";
pub const DD_HEALTH_PORT: &str = "DD_HEALTH_PORT";
pub const DD_KUBERNETES_KUBELET_HOST: &str = "DD_KUBERNETES_KUBELET_HOST";
pub const DD_LEADER_ELECTION: &str = "DD_LEADER_ELECTION";
pub const DD_CLC_RUNNER_ENABLED: &str = "DD_CLC_RUNNER_ENABLED";
pub const DD_CLC_RUNNER_HOST: &str = "DD_CLC_RUNNER_HOST";
pub const KUBERNETES_ENV: &str = "KUBERNETES";

pub fn logdatadog_volume() -> (Volume, VolumeMount) {
    (
        Volume::empty_dir(LOGDATADOG_VOLUME_NAME),
        VolumeMount::new(LOGDATADOG_VOLUME_NAME, LOGDATADOG_VOLUME_PATH, false),
    )
}

pub fn auth_volume() -> (Volume, VolumeMount) {
    (
        Volume::empty_dir(AUTH_VOLUME_NAME),
        VolumeMount::new(AUTH_VOLUME_NAME, AUTH_VOLUME_PATH, false),
    )
}

pub fn config_volume() -> (Volume, VolumeMount) {
    (
        Volume::empty_dir(CONFIG_VOLUME_NAME),
        VolumeMount::new(CONFIG_VOLUME_NAME, CONFIG_VOLUME_PATH, false),
    )
}

pub fn confd_volume() -> (Volume, VolumeMount) {
    (
        Volume::empty_dir(CONFD_VOLUME_NAME),
        VolumeMount::new(CONFD_VOLUME_NAME, CONFD_VOLUME_PATH, true),
    )
}

pub fn procdir_volume() -> (Volume, VolumeMount) {
    (
        Volume::host_path(PROCDIR_VOLUME_NAME, PROCDIR_HOST_PATH),
        VolumeMount::new(PROCDIR_VOLUME_NAME, PROCDIR_MOUNT_PATH, true),
    )
}

pub fn cgroups_volume() -> (Volume, VolumeMount) {
    (
        Volume::host_path(CGROUPS_VOLUME_NAME, CGROUPS_HOST_PATH),
        VolumeMount::new(CGROUPS_VOLUME_NAME, CGROUPS_MOUNT_PATH, true),
    )
}

pub fn dogstatsd_socket_volume(read_only: bool) -> (Volume, VolumeMount) {
    (
        Volume::host_path_typed(
            DOGSTATSD_SOCKET_VOLUME_NAME,
            DOGSTATSD_SOCKET_HOST_PATH,
            "DirectoryOrCreate",
        ),
        VolumeMount::new(
            DOGSTATSD_SOCKET_VOLUME_NAME,
            DOGSTATSD_SOCKET_MOUNT_PATH,
            read_only,
        ),
    )
}

/// Base pod template of `kind`, holding one container per entry of `containers`.
pub fn default_pod_template(
    kind: ComponentKind,
    owner_name: &str,
    containers: &BTreeSet<ContainerName>,
    registry: &str,
) -> PodTemplate {
    match kind {
        ComponentKind::NodeAgent => node_agent_template(owner_name, containers, registry),
        ComponentKind::ClusterAgent => cluster_agent_template(owner_name, registry),
        ComponentKind::ClusterChecksRunner => cluster_checks_runner_template(owner_name, registry),
    }
}

fn common_node_env(owner_name: &str) -> Vec<EnvVar> {
    vec![
        EnvVar::value(KUBERNETES_ENV, "yes"),
        EnvVar::from_bool(DD_CLUSTER_AGENT_ENABLED, true),
        EnvVar::value(
            DD_CLUSTER_AGENT_KUBERNETES_SERVICE_NAME,
            cluster_agent_service_name(owner_name),
        ),
        EnvVar::from_field(DD_KUBERNETES_KUBELET_HOST, "status.hostIP"),
    ]
}

fn with_mounts(mut container: Container, mounts: Vec<(Volume, VolumeMount)>) -> Container {
    container.volume_mounts = mounts.into_iter().map(|(_, m)| m).collect();
    container
}

fn with_env(mut container: Container, env: Vec<EnvVar>) -> Container {
    container.env = env;
    container
}

fn core_agent_container(name: ContainerName, owner_name: &str, image: &str) -> Container {
    let mut env = vec![
        EnvVar::value(DD_HEALTH_PORT, AGENT_HEALTH_PORT.to_string()),
        EnvVar::from_bool(DD_LEADER_ELECTION, true),
    ];
    env.extend(common_node_env(owner_name));

    let container = Container::new(name.as_str(), image).command(vec!["agent", "run"]);
    with_env(
        with_mounts(
            container,
            vec![
                logdatadog_volume(),
                auth_volume(),
                confd_volume(),
                config_volume(),
                procdir_volume(),
                cgroups_volume(),
                dogstatsd_socket_volume(false),
            ],
        ),
        env,
    )
}

fn node_sidecar_container(name: ContainerName, owner_name: &str, image: &str) -> Container {
    let command = match name {
        ContainerName::TraceAgent => vec![
            "trace-agent".to_string(),
            "--config=/etc/datadog-agent/datadog.yaml".to_string(),
        ],
        ContainerName::ProcessAgent => vec![
            "process-agent".to_string(),
            "--config=/etc/datadog-agent/datadog.yaml".to_string(),
            "--sysprobe-config=/etc/datadog-agent/system-probe.yaml".to_string(),
        ],
        ContainerName::SecurityAgent => vec![
            "security-agent".to_string(),
            "start".to_string(),
            "-c=/etc/datadog-agent/datadog.yaml".to_string(),
        ],
        _ => vec![
            "system-probe".to_string(),
            "--config=/etc/datadog-agent/system-probe.yaml".to_string(),
        ],
    };

    let mounts = match name {
        ContainerName::SystemProbe => vec![logdatadog_volume(), auth_volume()],
        _ => vec![
            logdatadog_volume(),
            auth_volume(),
            config_volume(),
            dogstatsd_socket_volume(true),
        ],
    };

    let mut env = Vec::new();
    if name == ContainerName::SecurityAgent {
        env.push(EnvVar::value("HOST_ROOT", "/host/root"));
    }
    env.extend(common_node_env(owner_name));

    let mut container = with_env(
        with_mounts(Container::new(name.as_str(), image).command(command), mounts),
        env,
    );
    if name == ContainerName::SystemProbe {
        container = container.security_context(SecurityContext::new());
    }
    container
}

fn node_agent_template(
    owner_name: &str,
    containers: &BTreeSet<ContainerName>,
    registry: &str,
) -> PodTemplate {
    let image = image(registry, AGENT_IMAGE_NAME, AGENT_LATEST_VERSION);
    let kind = ComponentKind::NodeAgent;

    let mut template = PodTemplate::new()
        .labels(Labels::for_component(owner_name, kind))
        .service_account(kind.service_account_name(owner_name))
        .init_container(
            Container::new(ContainerName::InitVolume.as_str(), &image)
                .command(vec!["bash", "-c"])
                .args(vec!["cp -vnr /etc/datadog-agent /opt"])
                .volume_mount(VolumeMount::new(
                    CONFIG_VOLUME_NAME,
                    "/opt/datadog-agent",
                    false,
                )),
        );

    let init_config = with_mounts(
        Container::new(ContainerName::InitConfig.as_str(), &image)
            .command(vec!["bash", "-c"])
            .args(vec![
                "for script in $(find /etc/cont-init.d/ -type f -name '*.sh' | sort) ; \
                 do bash $script ; done",
            ]),
        vec![
            logdatadog_volume(),
            auth_volume(),
            confd_volume(),
            config_volume(),
            procdir_volume(),
        ],
    );
    template = template.init_container(init_config);

    if containers.contains(&ContainerName::UnprivilegedSingleAgent) {
        template = template.container(core_agent_container(
            ContainerName::UnprivilegedSingleAgent,
            owner_name,
            &image,
        ));
    } else {
        template = template.container(core_agent_container(
            ContainerName::CoreAgent,
            owner_name,
            &image,
        ));
        for name in containers {
            match name {
                ContainerName::TraceAgent
                | ContainerName::ProcessAgent
                | ContainerName::SecurityAgent
                | ContainerName::SystemProbe => {
                    template =
                        template.container(node_sidecar_container(*name, owner_name, &image));
                }
                _ => {}
            }
        }
    }

    for (volume, _) in [
        logdatadog_volume(),
        auth_volume(),
        confd_volume(),
        config_volume(),
        procdir_volume(),
        cgroups_volume(),
        dogstatsd_socket_volume(false),
    ] {
        template = template.volume(volume);
    }

    if containers.contains(&ContainerName::SystemProbe) {
        template = template
            .init_container(
                Container::new(ContainerName::SeccompSetup.as_str(), &image)
                    .command(vec!["cp"])
                    .args(vec![
                        format!("{SECCOMP_PROFILE_MOUNT_PATH}/{SYSTEM_PROBE_SECCOMP_KEY}"),
                        format!("{SECCOMP_ROOT_HOST_PATH}/{SYSTEM_PROBE_SECCOMP_KEY}"),
                    ])
                    .volume_mount(VolumeMount::new(
                        SECCOMP_PROFILE_VOLUME_NAME,
                        SECCOMP_PROFILE_MOUNT_PATH,
                        true,
                    ))
                    .volume_mount(VolumeMount::new(
                        SECCOMP_ROOT_VOLUME_NAME,
                        SECCOMP_ROOT_HOST_PATH,
                        false,
                    )),
            )
            .volume(Volume::configmap(
                SECCOMP_PROFILE_VOLUME_NAME,
                seccomp_config_map_name(owner_name),
            ))
            .volume(Volume::host_path(SECCOMP_ROOT_VOLUME_NAME, SECCOMP_ROOT_HOST_PATH));
    }

    template
}

fn cluster_agent_template(owner_name: &str, registry: &str) -> PodTemplate {
    let kind = ComponentKind::ClusterAgent;
    let image = image(registry, CLUSTER_AGENT_IMAGE_NAME, CLUSTER_AGENT_LATEST_VERSION);

    let mut container = Container::new(ContainerName::ClusterAgent.as_str(), image)
        .env(EnvVar::value(
            DD_CLUSTER_AGENT_KUBERNETES_SERVICE_NAME,
            cluster_agent_service_name(owner_name),
        ))
        .env(EnvVar::value(DD_HEALTH_PORT, AGENT_HEALTH_PORT.to_string()))
        .env(EnvVar::from_bool(DD_LEADER_ELECTION, true))
        .env(EnvVar::from_field("DD_POD_NAME", "metadata.name"));
    container.ports.push(ContainerPort::tcp("agentport", CLUSTER_AGENT_CMD_PORT));
    let container = with_mounts(container, vec![logdatadog_volume(), confd_volume()]);

    PodTemplate::new()
        .labels(Labels::for_component(owner_name, kind))
        .service_account(kind.service_account_name(owner_name))
        .container(container)
        .volume(logdatadog_volume().0)
        .volume(confd_volume().0)
}

fn cluster_checks_runner_template(owner_name: &str, registry: &str) -> PodTemplate {
    let kind = ComponentKind::ClusterChecksRunner;
    let image = image(registry, AGENT_IMAGE_NAME, AGENT_LATEST_VERSION);

    let container = Container::new(ContainerName::ClusterChecksRunner.as_str(), image)
        .command(vec!["agent", "run"])
        .env(EnvVar::value(KUBERNETES_ENV, "yes"))
        .env(EnvVar::from_bool(DD_CLUSTER_AGENT_ENABLED, true))
        .env(EnvVar::value(
            DD_CLUSTER_AGENT_KUBERNETES_SERVICE_NAME,
            cluster_agent_service_name(owner_name),
        ))
        .env(EnvVar::from_bool(DD_CLC_RUNNER_ENABLED, true))
        .env(EnvVar::from_field(DD_CLC_RUNNER_HOST, "status.podIP"))
        .env(EnvVar::value(DD_HEALTH_PORT, AGENT_HEALTH_PORT.to_string()));
    let container = with_mounts(container, vec![logdatadog_volume(), config_volume()]);

    PodTemplate::new()
        .labels(Labels::for_component(owner_name, kind))
        .service_account(kind.service_account_name(owner_name))
        .container(container)
        .volume(logdatadog_volume().0)
        .volume(config_volume().0)
}
