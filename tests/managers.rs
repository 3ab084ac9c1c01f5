use agent_operator::prelude::*;
use agent_operator::VolumeSource;

fn template() -> PodTemplate {
    PodTemplate::new()
        .container(
            Container::new(ContainerName::CoreAgent.as_str(), "agent:7")
                .env(EnvVar::value("DD_EXTRA_CONFIG_PROVIDERS", "clusterchecks")),
        )
        .container(Container::new(ContainerName::TraceAgent.as_str(), "agent:7"))
        .init_container(Container::new(ContainerName::InitConfig.as_str(), "agent:7"))
}

fn env<'a>(
    managers: &'a PodTemplateManagers,
    container: ContainerName,
    var: &str,
) -> Option<&'a EnvVar> {
    managers
        .pod_template()
        .container_named(container.as_str())?
        .find_env(var)
}

#[test]
fn add_env_var_keeps_first_value() {
    let mut managers = PodTemplateManagers::new(template());
    managers.env_var().add_env_var(EnvVar::value("DD_SITE", "datadoghq.eu"));
    managers.env_var().add_env_var(EnvVar::value("DD_SITE", "datadoghq.com"));

    for name in [ContainerName::CoreAgent, ContainerName::TraceAgent] {
        assert_eq!(
            env(&managers, name, "DD_SITE").and_then(EnvVar::literal),
            Some("datadoghq.eu"),
            "First writer should win in {name}"
        );
    }
    let init = managers
        .pod_template()
        .init_container_named(ContainerName::InitConfig.as_str())
        .expect("init container");
    assert!(init.find_env("DD_SITE").is_none(), "Init containers are not touched");
}

#[test]
fn env_var_to_missing_container_is_a_no_op() {
    let mut managers = PodTemplateManagers::new(template());
    let before = managers.pod_template().clone();
    managers
        .env_var()
        .add_env_var_to_container(ContainerName::SystemProbe, EnvVar::from_bool("DD_X", true));
    managers
        .env_var()
        .add_env_var_to_container_with_merge(
            ContainerName::SystemProbe,
            EnvVar::from_bool("DD_X", true),
            MergeStrategy::Error,
        )
        .expect("absent container is not an error");
    assert_eq!(managers.pod_template(), &before);
}

#[test]
fn override_replaces_env_var() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .env_var()
        .add_env_var_to_container_with_merge(
            ContainerName::CoreAgent,
            EnvVar::value("DD_EXTRA_CONFIG_PROVIDERS", "kube_services"),
            MergeStrategy::Override,
        )
        .expect("override never fails");
    assert_eq!(
        env(&managers, ContainerName::CoreAgent, "DD_EXTRA_CONFIG_PROVIDERS")
            .and_then(EnvVar::literal),
        Some("kube_services")
    );
}

#[test]
fn append_to_value_skips_existing_tokens() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .env_var()
        .add_env_var_to_container_with_merge(
            ContainerName::CoreAgent,
            EnvVar::value("DD_EXTRA_CONFIG_PROVIDERS", "clusterchecks endpointschecks"),
            MergeStrategy::AppendToValue,
        )
        .expect("append to a literal");
    assert_eq!(
        env(&managers, ContainerName::CoreAgent, "DD_EXTRA_CONFIG_PROVIDERS")
            .and_then(EnvVar::literal),
        Some("clusterchecks endpointschecks")
    );
}

#[test]
fn append_to_reference_is_a_conflict() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .env_var()
        .add_env_var_to_container(
            ContainerName::TraceAgent,
            EnvVar::from_secret("DD_API_KEY", "creds", "api_key"),
        );
    let err = managers
        .env_var()
        .add_env_var_to_container_with_merge(
            ContainerName::TraceAgent,
            EnvVar::value("DD_API_KEY", "abc"),
            MergeStrategy::AppendToValue,
        )
        .expect_err("cannot append to a secret reference");
    assert!(matches!(err, Error::MergeConflict(_)), "Unexpected error: {err}");
}

#[test]
fn error_strategy_rejects_different_values_only() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .env_var()
        .add_env_var_to_container_with_merge(
            ContainerName::CoreAgent,
            EnvVar::value("DD_EXTRA_CONFIG_PROVIDERS", "clusterchecks"),
            MergeStrategy::Error,
        )
        .expect("identical value is accepted");

    let err = managers
        .env_var()
        .add_env_var_with_merge(
            EnvVar::value("DD_EXTRA_CONFIG_PROVIDERS", "endpointschecks"),
            MergeStrategy::Error,
        )
        .expect_err("different value is rejected");
    assert!(matches!(err, Error::MergeConflict(_)), "Unexpected error: {err}");
}

#[test]
fn init_container_env_is_separate() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .env_var()
        .add_env_var_to_init_container(ContainerName::InitConfig, EnvVar::value("DD_X", "1"));
    let init = managers
        .pod_template()
        .init_container_named(ContainerName::InitConfig.as_str())
        .expect("init container");
    assert!(init.find_env("DD_X").is_some());
    assert!(env(&managers, ContainerName::CoreAgent, "DD_X").is_none());
}

#[test]
fn volumes_are_added_once_and_mounted_per_container() {
    let mut managers = PodTemplateManagers::new(template());
    for _ in 0..2 {
        managers.volume().add_volume_to_container(
            Volume::host_path("procdir", "/proc"),
            VolumeMount::new("procdir", "/host/proc", true),
            ContainerName::CoreAgent,
        );
    }
    managers.volume().add_volume_to_container(
        Volume::host_path("procdir", "/proc"),
        VolumeMount::new("procdir", "/host/proc", false),
        ContainerName::TraceAgent,
    );

    let pod = managers.pod_template();
    assert_eq!(
        pod.volumes.iter().filter(|v| v.name == "procdir").count(),
        1,
        "Volume should be declared once"
    );
    let core = pod.container_named("agent").expect("core agent");
    assert_eq!(core.volume_mounts.len(), 1);
    assert!(core.volume_mounts[0].read_only, "Core mount stays read-only");
    let trace = pod.container_named("trace-agent").expect("trace agent");
    assert!(!trace.volume_mounts[0].read_only, "Read-only flag is per container");
}

#[test]
fn volume_merge_strategies() {
    let mut managers = PodTemplateManagers::new(template());
    managers.volume().add_pod_volume(Volume::host_path("dsdsocket", "/var/run/datadog"));

    managers
        .volume()
        .add_volume_with_merge(Volume::host_path("dsdsocket", "/tmp"), MergeStrategy::KeepExisting)
        .expect("keep existing");
    assert_eq!(
        managers.pod_template().volume_named("dsdsocket").and_then(Volume::host_path_str),
        Some("/var/run/datadog")
    );

    managers
        .volume()
        .add_volume_with_merge(Volume::host_path("dsdsocket", "/tmp"), MergeStrategy::Override)
        .expect("override");
    assert_eq!(
        managers.pod_template().volume_named("dsdsocket").and_then(Volume::host_path_str),
        Some("/tmp")
    );

    let err = managers
        .volume()
        .add_volume_with_merge(Volume::empty_dir("dsdsocket"), MergeStrategy::Error)
        .expect_err("different source");
    assert!(matches!(err, Error::MergeConflict(_)), "Unexpected error: {err}");
}

#[test]
fn append_merges_configmap_items() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .volume()
        .add_pod_volume(Volume::configmap("checks", "agent-checks").item("a.yaml", "a.yaml"));
    managers
        .volume()
        .add_volume_with_merge(
            Volume::configmap("checks", "agent-checks").item("b.yaml", "b.yaml"),
            MergeStrategy::AppendToValue,
        )
        .expect("append items");

    let volume = managers.pod_template().volume_named("checks").expect("volume");
    let VolumeSource::ConfigMap { items, .. } = &volume.source else {
        panic!("expected a configmap volume, got {:?}", volume.source);
    };
    assert_eq!(items.len(), 2, "Items should be unioned");
}

#[test]
fn append_rejects_configmap_path_reuse() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .volume()
        .add_pod_volume(Volume::configmap("checks", "agent-checks").item("a.yaml", "conf.yaml"));
    managers
        .volume()
        .add_volume_with_merge(
            Volume::configmap("checks", "agent-checks").item("a.yaml", "conf.yaml"),
            MergeStrategy::AppendToValue,
        )
        .expect("same key and path");

    let err = managers
        .volume()
        .add_volume_with_merge(
            Volume::configmap("checks", "agent-checks").item("b.yaml", "conf.yaml"),
            MergeStrategy::AppendToValue,
        )
        .expect_err("path already used by another key");
    assert!(matches!(err, Error::MergeConflict(_)), "Unexpected error: {err}");

    let volume = managers.pod_template().volume_named("checks").expect("volume");
    let VolumeSource::ConfigMap { items, .. } = &volume.source else {
        panic!("expected a configmap volume, got {:?}", volume.source);
    };
    assert_eq!(items, &vec![("a.yaml".to_string(), "conf.yaml".to_string())]);
}

#[test]
fn volume_mount_override() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .volume_mount()
        .add_volume_mount_to_container(
            VolumeMount::new("dsdsocket", "/var/run/datadog", true),
            ContainerName::CoreAgent,
        );
    managers
        .volume_mount()
        .add_volume_mount_to_container_with_merge(
            VolumeMount::new("dsdsocket", "/run/dsd", false),
            ContainerName::CoreAgent,
            MergeStrategy::Override,
        )
        .expect("override");

    let mount = managers
        .pod_template()
        .container_named("agent")
        .and_then(|c| c.find_volume_mount("dsdsocket"))
        .expect("mount");
    assert_eq!(mount.mount_path, "/run/dsd");
    assert!(!mount.read_only);
}

#[test]
fn ports_are_unique_by_name() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .port()
        .add_port_to_container(ContainerName::TraceAgent, ContainerPort::tcp("traceport", 8126));
    managers
        .port()
        .add_port_to_container(ContainerName::TraceAgent, ContainerPort::tcp("traceport", 9126));
    managers
        .port()
        .add_port_to_container(ContainerName::SystemProbe, ContainerPort::tcp("traceport", 8126));

    let trace = managers.pod_template().container_named("trace-agent").expect("trace agent");
    assert_eq!(trace.ports.len(), 1);
    assert_eq!(trace.ports[0].container_port, 8126, "First port should win");
}

#[test]
fn capabilities_are_unioned() {
    let mut managers = PodTemplateManagers::new(template());
    managers
        .security_context()
        .add_capabilities_to_container(&["SYS_ADMIN", "NET_RAW"], ContainerName::CoreAgent);
    managers
        .security_context()
        .add_capabilities_to_container(&["NET_RAW", "IPC_LOCK"], ContainerName::CoreAgent);

    let ctx = managers
        .pod_template()
        .container_named("agent")
        .and_then(|c| c.security_context.as_ref())
        .expect("security context");
    assert_eq!(ctx.capabilities_add, vec!["SYS_ADMIN", "NET_RAW", "IPC_LOCK"]);
}

#[test]
fn annotations_overwrite() {
    let mut managers = PodTemplateManagers::new(template());
    managers.annotation().add_annotation("checksum/x", "1");
    managers.annotation().add_annotation("checksum/x", "2");
    assert_eq!(
        managers.pod_template().annotations.get("checksum/x").map(String::as_str),
        Some("2")
    );
}
