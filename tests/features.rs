mod common;

use agent_operator::checksum;
use agent_operator::feature::{
    admissioncontroller, apm, clusterchecks, cws, dogstatsd, externalmetrics, kubernetesstatecore,
    livecontainer, liveprocess, logcollection, npm, orchestratorexplorer, otlp, prometheusscrape,
    sysprobe, tcpqueuelength,
};
use agent_operator::prelude::*;
use agent_operator::VolumeSource;
use common::{
    cluster_agent_template, compose, container, container_names, env_value, legacy_agent,
    node_template, recent_server, NAME, NAMESPACE,
};

#[test]
fn otlp_sets_endpoints_and_core_ports() {
    let composition = compose(
        r#"
features:
  otlp:
    receiver:
      protocols:
        grpc:
          enabled: true
        http:
          enabled: true
          endpoint: "0.0.0.0:5318"
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    assert_eq!(
        env_value(node, ContainerName::CoreAgent, otlp::DD_OTLP_GRPC_ENDPOINT),
        Some(otlp::DEFAULT_GRPC_ENDPOINT)
    );
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, otlp::DD_OTLP_HTTP_ENDPOINT),
        Some("0.0.0.0:5318")
    );
    let core = container(node, ContainerName::CoreAgent);
    let grpc = core.find_port(otlp::GRPC_PORT_NAME).expect("grpc port");
    assert_eq!((grpc.container_port, grpc.host_port), (4317, Some(4317)));
    let http = core.find_port(otlp::HTTP_PORT_NAME).expect("http port");
    assert_eq!(http.container_port, 5318);
    assert!(
        node.container_named(ContainerName::TraceAgent.as_str()).is_none(),
        "No trace agent without APM"
    );

    let service = composition
        .dependencies
        .service(NAMESPACE, "datadog-agent")
        .expect("local service");
    assert!(service.find_port(otlp::GRPC_PORT_NAME).is_some());
    assert!(service.find_port(otlp::HTTP_PORT_NAME).is_some());
}

#[test]
fn otlp_forwards_to_trace_agent_with_apm() {
    let composition = compose(
        r#"
features:
  apm:
    enabled: true
  otlp:
    receiver:
      protocols:
        grpc:
          enabled: true
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    assert_eq!(
        env_value(node, ContainerName::TraceAgent, otlp::DD_OTLP_GRPC_ENDPOINT),
        Some(otlp::DEFAULT_GRPC_ENDPOINT)
    );
    assert!(
        container(node, ContainerName::TraceAgent)
            .find_port(otlp::GRPC_PORT_NAME)
            .is_none(),
        "OTLP ports are exposed by the core agent only"
    );
}

#[test]
fn legacy_otlp_configures_receivers() {
    let dda = legacy_agent(
        r#"
agent:
  apm:
    enabled: true
  otlp:
    receiver:
      protocols:
        grpc:
          enabled: true
          endpoint: "0.0.0.0:14317"
        http:
          enabled: false
"#,
    );
    let composition = Driver::builtin()
        .expect("builtin driver")
        .compose_v1(&dda, &recent_server())
        .expect("compose v1");
    assert!(composition.has_feature(FeatureId::Otlp));

    let node = node_template(&composition);
    for name in [ContainerName::CoreAgent, ContainerName::TraceAgent] {
        assert_eq!(
            env_value(node, name, otlp::DD_OTLP_GRPC_ENDPOINT),
            Some("0.0.0.0:14317")
        );
        assert_eq!(env_value(node, name, otlp::DD_OTLP_HTTP_ENDPOINT), None);
    }
    let grpc = container(node, ContainerName::CoreAgent)
        .find_port(otlp::GRPC_PORT_NAME)
        .expect("grpc port");
    assert_eq!(grpc.container_port, 14317);
}

#[test]
fn legacy_otlp_without_receivers_is_not_configured() {
    let composition = Driver::builtin()
        .expect("builtin driver")
        .compose_v1(&legacy_agent("agent:\n  otlp: {}"), &recent_server())
        .expect("compose v1");
    assert!(!composition.has_feature(FeatureId::Otlp));
}

#[test]
fn otlp_invalid_endpoint_fails_composition() {
    let err = compose(
        r#"
features:
  otlp:
    receiver:
      protocols:
        grpc:
          enabled: true
          endpoint: "unix:///var/run/otlp.sock"
"#,
    )
    .expect_err("unix socket endpoint");
    match err {
        Error::Dependency { feature, source } => {
            assert_eq!(feature, FeatureId::Otlp);
            assert!(
                matches!(*source, Error::InvalidEndpoint { .. }),
                "Unexpected source: {source}"
            );
        }
        other => panic!("Unexpected error: {other}"),
    }
}

#[test]
fn endpoint_port_extraction() {
    assert_eq!(otlp::extract_port("0.0.0.0:4317").expect("port"), 4317);
    assert_eq!(otlp::extract_port("[::1]:4318").expect("ipv6"), 4318);
    assert!(otlp::extract_port("localhost").is_err(), "Missing port");
    assert!(otlp::extract_port("localhost:http").is_err(), "Named port");
    assert!(otlp::extract_port("localhost:70000").is_err(), "Out of range");
}

#[test]
fn apm_adds_trace_agent_and_local_service_port() {
    let composition = compose(
        r#"
features:
  apm:
    enabled: true
    hostPortConfig:
      enabled: true
      hostPort: 8127
    unixDomainSocketConfig:
      enabled: true
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    let trace = container(node, ContainerName::TraceAgent);
    let port = trace.find_port(apm::APM_PORT_NAME).expect("trace port");
    assert_eq!((port.container_port, port.host_port), (8126, Some(8127)));
    assert_eq!(
        env_value(node, ContainerName::TraceAgent, apm::DD_APM_NON_LOCAL_TRAFFIC),
        Some("true")
    );
    assert_eq!(
        env_value(node, ContainerName::TraceAgent, apm::DD_APM_RECEIVER_SOCKET),
        Some(apm::DEFAULT_APM_SOCKET_PATH)
    );
    assert!(node.volume_named(apm::APM_SOCKET_VOLUME_NAME).is_some());

    let service = composition
        .dependencies
        .service(NAMESPACE, "datadog-agent")
        .expect("local service");
    assert_eq!(service.internal_traffic_policy.as_deref(), Some("Local"));
    assert!(service.find_port(apm::APM_PORT_NAME).is_some());
}

#[test]
fn apm_single_step_rejects_both_namespace_lists() {
    let err = compose(
        r#"
features:
  apm:
    enabled: true
    singleStepInstrumentation:
      enabled: true
      enabledNamespaces: [apps]
      disabledNamespaces: [kube-system]
"#,
    )
    .expect_err("conflicting namespaces");
    assert!(
        matches!(
            err,
            Error::PodTemplate {
                feature: FeatureId::Apm,
                component: ComponentKind::ClusterAgent,
                ..
            }
        ),
        "Unexpected error: {err}"
    );
}

#[test]
fn apm_single_step_configures_cluster_agent() {
    let composition = compose(
        r#"
features:
  apm:
    enabled: true
    singleStepInstrumentation:
      enabled: true
      enabledNamespaces: [apps, web]
      libVersions:
        java: "1.20.0"
"#,
    )
    .expect("compose");
    let dca = cluster_agent_template(&composition);
    assert_eq!(
        env_value(dca, ContainerName::ClusterAgent, apm::DD_APM_INSTRUMENTATION_ENABLED),
        Some("true")
    );
    assert_eq!(
        env_value(dca, ContainerName::ClusterAgent, apm::DD_APM_INSTRUMENTATION_ENABLED_NAMESPACES),
        Some(r#"["apps","web"]"#)
    );
    assert_eq!(
        env_value(dca, ContainerName::ClusterAgent, apm::DD_APM_INSTRUMENTATION_LIB_VERSIONS),
        Some(r#"{"java":"1.20.0"}"#)
    );
}

#[test]
fn admission_controller_custom_names() {
    let composition = compose(
        r#"
features:
  admissionController:
    enabled: true
    mutateUnlabelled: true
    serviceName: custom-webhook-svc
    webhookName: custom-webhook
    agentCommunicationMode: service
    failurePolicy: Fail
"#,
    )
    .expect("compose");
    let dca = cluster_agent_template(&composition);
    let value = |var| env_value(dca, ContainerName::ClusterAgent, var);

    assert_eq!(value(admissioncontroller::DD_ADMISSION_CONTROLLER_ENABLED), Some("true"));
    assert_eq!(value(admissioncontroller::DD_ADMISSION_CONTROLLER_MUTATE_UNLABELLED), Some("true"));
    assert_eq!(
        value(admissioncontroller::DD_ADMISSION_CONTROLLER_SERVICE_NAME),
        Some("custom-webhook-svc")
    );
    assert_eq!(
        value(admissioncontroller::DD_ADMISSION_CONTROLLER_WEBHOOK_NAME),
        Some("custom-webhook")
    );
    assert_eq!(value(admissioncontroller::DD_ADMISSION_CONTROLLER_FAILURE_POLICY), Some("Fail"));
    assert_eq!(
        value(admissioncontroller::DD_ADMISSION_CONTROLLER_INJECT_CONFIG_LOCAL_SERVICE_NAME),
        Some("datadog-agent")
    );

    let service = composition
        .dependencies
        .service(NAMESPACE, "custom-webhook-svc")
        .expect("webhook service");
    let port = service
        .find_port(admissioncontroller::WEBHOOK_PORT_NAME)
        .expect("webhook port");
    assert_eq!(port.port, 443);
    assert!(composition
        .dependencies
        .cluster_role("datadog-cluster-agent-admission-controller")
        .is_some());
}

#[test]
fn admission_controller_defaults() {
    let composition = compose(
        r#"
features:
  admissionController:
    enabled: true
"#,
    )
    .expect("compose");
    let dca = cluster_agent_template(&composition);
    assert_eq!(
        env_value(
            dca,
            ContainerName::ClusterAgent,
            admissioncontroller::DD_ADMISSION_CONTROLLER_SERVICE_NAME,
        ),
        Some(admissioncontroller::DEFAULT_SERVICE_NAME)
    );
    assert_eq!(
        env_value(
            dca,
            ContainerName::ClusterAgent,
            admissioncontroller::DD_ADMISSION_CONTROLLER_FAILURE_POLICY,
        ),
        Some(admissioncontroller::DEFAULT_FAILURE_POLICY)
    );
    assert!(
        env_value(
            dca,
            ContainerName::ClusterAgent,
            admissioncontroller::DD_ADMISSION_CONTROLLER_INJECT_CONFIG_MODE,
        )
            .is_none(),
        "No mode without a configured communication mode"
    );
}

#[test]
fn external_metrics_registers_api_service() {
    let composition = compose(
        r#"
features:
  externalMetricsServer:
    enabled: true
    useDatadogMetrics: true
    endpoint:
      url: https://app.datadoghq.eu
      credentials:
        apiKey: my-api-key
        appSecret:
          secretName: external-keys
          keyName: app
"#,
    )
    .expect("compose");
    let deps = &composition.dependencies;

    let service_name = externalmetrics::metrics_server_service_name(NAME);
    let service = deps.service(NAMESPACE, &service_name).expect("metrics service");
    assert_eq!(
        service.find_port(externalmetrics::METRICS_PORT_NAME).map(|p| p.port),
        Some(externalmetrics::DEFAULT_METRICS_PORT)
    );

    let api_service = deps
        .api_service("v1beta1.external.metrics.k8s.io")
        .expect("api service");
    assert_eq!(api_service.service_name, service_name);
    assert_eq!(api_service.service_namespace, NAMESPACE);
    assert!(api_service.insecure_skip_tls_verify);

    assert!(deps.cluster_role_binding("datadog-cluster-agent-auth-delegator").is_some());
    assert!(deps
        .role_binding("kube-system", "datadog-cluster-agent-apiserver-auth")
        .is_some());
    let provider = deps
        .cluster_role("datadog-cluster-agent-metrics-provider")
        .expect("provider role");
    assert!(
        provider
            .rules
            .iter()
            .any(|r| r.resources.iter().any(|res| res == "datadogmetrics")),
        "DatadogMetric access should be granted"
    );

    let secret = deps
        .secret(NAMESPACE, &externalmetrics::endpoint_credentials_secret_name(NAME))
        .expect("endpoint secret");
    assert_eq!(
        secret.string_data.get(externalmetrics::API_KEY_SECRET_KEY).map(String::as_str),
        Some("my-api-key")
    );
    assert!(!secret.string_data.contains_key(externalmetrics::APP_KEY_SECRET_KEY));

    let dca = cluster_agent_template(&composition);
    let app_key = container(dca, ContainerName::ClusterAgent)
        .find_env(externalmetrics::DD_EXTERNAL_METRICS_PROVIDER_APP_KEY)
        .expect("app key env");
    assert_eq!(
        app_key,
        &EnvVar::from_secret(
            externalmetrics::DD_EXTERNAL_METRICS_PROVIDER_APP_KEY,
            "external-keys",
            "app"
        )
    );
    assert_eq!(
        env_value(
            dca,
            ContainerName::ClusterAgent,
            externalmetrics::DD_EXTERNAL_METRICS_PROVIDER_ENDPOINT,
        ),
        Some("https://app.datadoghq.eu")
    );
}

#[test]
fn external_metrics_without_api_service() {
    let composition = compose(
        r#"
features:
  externalMetricsServer:
    enabled: true
    registerApiService: false
"#,
    )
    .expect("compose");
    assert!(composition
        .dependencies
        .api_service("v1beta1.external.metrics.k8s.io")
        .is_none());
}

#[test]
fn npm_enables_network_tracing() {
    let composition = compose(
        r#"
features:
  npm:
    enabled: true
    collectDnsStats: false
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    assert_eq!(
        container_names(node),
        vec!["agent", "process-agent", "system-probe"]
    );
    for name in [ContainerName::ProcessAgent, ContainerName::SystemProbe] {
        assert_eq!(
            env_value(node, name, npm::DD_SYSTEM_PROBE_NETWORK_ENABLED),
            Some("true"),
            "Network tracing should be enabled in {name}"
        );
    }
    assert_eq!(
        env_value(node, ContainerName::SystemProbe, npm::DD_SYSTEM_PROBE_CONNTRACK_ENABLED),
        Some("true")
    );
    assert_eq!(
        env_value(node, ContainerName::SystemProbe, npm::DD_SYSTEM_PROBE_COLLECT_DNS_STATS_ENABLED),
        Some("false")
    );
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, sysprobe::DD_SYSPROBE_SOCKET),
        Some(sysprobe::SOCKET_PATH)
    );

    let probe = container(node, ContainerName::SystemProbe);
    let ctx = probe.security_context.as_ref().expect("security context");
    assert!(ctx.has_capability("SYS_ADMIN"));
    assert_eq!(
        node.annotations.get(sysprobe::APPARMOR_ANNOTATION_KEY).map(String::as_str),
        Some(sysprobe::APPARMOR_UNCONFINED)
    );
    assert!(
        node.init_container_named(ContainerName::SeccompSetup.as_str()).is_some(),
        "System-probe pods install the seccomp profile"
    );
    assert!(composition
        .dependencies
        .config_map(NAMESPACE, "datadog-system-probe-seccomp")
        .is_some());
}

#[test]
fn ebpf_features_share_one_system_probe() {
    let composition = compose(
        r#"
features:
  npm:
    enabled: true
  tcpQueueLength:
    enabled: true
  oomKill:
    enabled: true
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    assert_eq!(
        node.containers
            .iter()
            .filter(|c| c.name == ContainerName::SystemProbe.as_str())
            .count(),
        1
    );
    let probe = container(node, ContainerName::SystemProbe);
    let caps = &probe.security_context.as_ref().expect("security context").capabilities_add;
    assert_eq!(caps.len(), sysprobe::CAPABILITIES.len(), "Capabilities are unioned");
    assert_eq!(
        node.volumes
            .iter()
            .filter(|v| v.name == sysprobe::SOCKET_VOLUME_NAME)
            .count(),
        1
    );
}

#[test]
fn tcp_queue_length_disabled_leaves_no_system_probe() {
    let composition = compose(
        r#"
features:
  tcpQueueLength:
    enabled: false
"#,
    )
    .expect("compose");
    let node = node_template(&composition);
    assert_eq!(container_names(node), vec!["agent"]);
    assert!(!composition.has_feature(FeatureId::TcpQueueLength));
}

#[test]
fn tcp_queue_length_mounts_kernel_headers() {
    let composition = compose(
        r#"
features:
  tcpQueueLength:
    enabled: true
"#,
    )
    .expect("compose");
    let node = node_template(&composition);
    assert_eq!(
        env_value(
            node,
            ContainerName::SystemProbe,
            tcpqueuelength::DD_SYSTEM_PROBE_CONFIG_ENABLE_TCP_QUEUE_LENGTH
        ),
        Some("true")
    );
    let probe = container(node, ContainerName::SystemProbe);
    assert!(probe.find_volume_mount(sysprobe::MODULES_VOLUME_NAME).is_some());
    assert!(probe.find_volume_mount(sysprobe::SRC_VOLUME_NAME).is_some());
}

#[test]
fn cws_adds_security_agent() {
    let composition = compose(
        r#"
features:
  cws:
    enabled: true
    syscallMonitorEnabled: true
    customPolicies:
      name: my-policies
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    assert_eq!(
        container_names(node),
        vec!["agent", "system-probe", "security-agent"]
    );
    assert!(node.host_pid, "Runtime security needs the host PID namespace");
    for name in [ContainerName::SecurityAgent, ContainerName::SystemProbe] {
        assert_eq!(
            env_value(node, name, cws::DD_RUNTIME_SECURITY_CONFIG_ENABLED),
            Some("true")
        );
        assert!(container(node, name).find_volume_mount(cws::POLICIES_VOLUME_NAME).is_some());
    }
    assert_eq!(
        env_value(
            node,
            ContainerName::SystemProbe,
            cws::DD_RUNTIME_SECURITY_CONFIG_SYSCALL_MONITOR_ENABLED,
        ),
        Some("true")
    );
    let policies = node.volume_named(cws::POLICIES_VOLUME_NAME).expect("policies volume");
    assert!(matches!(
        &policies.source,
        VolumeSource::ConfigMap { name, .. } if name == "my-policies"
    ));
}

#[test]
fn kube_state_core_runs_in_cluster_agent() {
    let composition = compose(
        r#"
features:
  kubeStateMetricsCore:
    enabled: true
"#,
    )
    .expect("compose");
    let deps = &composition.dependencies;

    let config_map_name = kubernetesstatecore::default_config_map_name(NAME);
    let config_map = deps
        .config_map(NAMESPACE, &config_map_name)
        .expect("owned configmap");
    let data = config_map
        .data
        .get(kubernetesstatecore::CONFIG_KEY)
        .expect("check config");
    let parsed: serde_yaml::Value = serde_yaml::from_str(data).expect("valid check config");
    let collectors = parsed["instances"][0]["collectors"]
        .as_sequence()
        .expect("collector list");
    assert!(collectors.contains(&serde_yaml::Value::from("pods")));
    assert!(parsed.get("cluster_check").is_none());
    assert_eq!(
        parsed["instances"][0]["skip_leader_election"],
        serde_yaml::Value::Bool(false)
    );
    assert!(deps.cluster_role("datadog-cluster-agent-ksm-core").is_some());

    let dca = cluster_agent_template(&composition);
    assert_eq!(
        env_value(
            dca,
            ContainerName::ClusterAgent,
            kubernetesstatecore::DD_KUBE_STATE_METRICS_CORE_CONFIGMAP_NAME,
        ),
        Some(config_map_name.as_str())
    );
    let mount = container(dca, ContainerName::ClusterAgent)
        .find_volume_mount(kubernetesstatecore::CONFIG_VOLUME_NAME)
        .expect("config mount");
    assert_eq!(mount.mount_path, kubernetesstatecore::CONFIG_MOUNT_PATH);

    let annotation_key = checksum::annotation_key(FeatureId::KubernetesStateCore);
    let default_config = kubernetesstatecore::default_config(false).expect("default config");
    let expected = checksum::digest(&default_config).expect("digest");
    assert_eq!(dca.annotations.get(&annotation_key), Some(&expected));
    assert_eq!(config_map.annotations.get(&annotation_key), Some(&expected));

    let node = node_template(&composition);
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, kubernetesstatecore::DD_IGNORE_AUTOCONF),
        Some("kubernetes_state")
    );
}

#[test]
fn kube_state_core_moves_to_runner() {
    let composition = compose(
        r#"
features:
  kubeStateMetricsCore:
    enabled: true
  clusterChecks:
    enabled: true
    useClusterChecksRunners: true
"#,
    )
    .expect("compose");
    assert!(composition.required.cluster_checks_runner.is_enabled());
    assert!(composition
        .dependencies
        .cluster_role("datadog-cluster-checks-runner-ksm-core")
        .is_some());
    let config_map = composition
        .dependencies
        .config_map(NAMESPACE, &kubernetesstatecore::default_config_map_name(NAME))
        .expect("owned configmap");
    let parsed: serde_yaml::Value =
        serde_yaml::from_str(&config_map.data[kubernetesstatecore::CONFIG_KEY])
            .expect("valid check config");
    assert_eq!(parsed["cluster_check"], serde_yaml::Value::Bool(true));
    assert_eq!(
        parsed["instances"][0]["skip_leader_election"],
        serde_yaml::Value::Bool(true)
    );
}

#[test]
fn kube_state_core_external_configmap() {
    let composition = compose(
        r#"
features:
  kubeStateMetricsCore:
    enabled: true
    conf:
      configMap:
        name: my-ksm-config
"#,
    )
    .expect("compose");
    assert!(composition
        .dependencies
        .config_map(NAMESPACE, &kubernetesstatecore::default_config_map_name(NAME))
        .is_none());
    let dca = cluster_agent_template(&composition);
    assert_eq!(
        env_value(
            dca,
            ContainerName::ClusterAgent,
            kubernetesstatecore::DD_KUBE_STATE_METRICS_CORE_CONFIGMAP_NAME,
        ),
        Some("my-ksm-config")
    );
}

#[test]
fn cluster_checks_disabled_is_not_configured() {
    let composition = compose(
        r#"
features:
  clusterChecks:
    enabled: false
    useClusterChecksRunners: true
"#,
    )
    .expect("compose");
    assert!(!composition.has_feature(FeatureId::ClusterChecks));
    assert!(composition.template(ComponentKind::ClusterChecksRunner).is_none());

    let node = node_template(&composition);
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, clusterchecks::DD_EXTRA_CONFIG_PROVIDERS),
        None
    );
}

#[test]
fn cluster_checks_without_runners() {
    let composition = compose(
        r#"
features:
  clusterChecks:
    enabled: true
"#,
    )
    .expect("compose");
    assert!(composition.template(ComponentKind::ClusterChecksRunner).is_none());

    let node = node_template(&composition);
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, clusterchecks::DD_EXTRA_CONFIG_PROVIDERS),
        Some(clusterchecks::CLUSTER_AND_ENDPOINTS_CHECKS)
    );
    let dca = cluster_agent_template(&composition);
    assert_eq!(
        env_value(dca, ContainerName::ClusterAgent, clusterchecks::DD_CLUSTER_CHECKS_ENABLED),
        Some("true")
    );
    assert_eq!(
        env_value(dca, ContainerName::ClusterAgent, clusterchecks::DD_EXTRA_LISTENERS),
        Some(clusterchecks::KUBE_SERVICES_AND_ENDPOINTS)
    );
}

#[test]
fn cluster_checks_with_runners() {
    let composition = compose(
        r#"
features:
  clusterChecks:
    enabled: true
    useClusterChecksRunners: true
"#,
    )
    .expect("compose");
    let runner = composition
        .template(ComponentKind::ClusterChecksRunner)
        .expect("runner template");
    assert_eq!(
        env_value(
            runner,
            ContainerName::ClusterChecksRunner,
            clusterchecks::DD_EXTRA_CONFIG_PROVIDERS,
        ),
        Some(clusterchecks::CLUSTER_CHECKS)
    );
    let node = node_template(&composition);
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, clusterchecks::DD_EXTRA_CONFIG_PROVIDERS),
        Some(clusterchecks::ENDPOINTS_CHECKS)
    );
    assert!(composition
        .dependencies
        .service_account(NAMESPACE, "datadog-cluster-checks-runner")
        .is_some());
}

#[test]
fn dogstatsd_defaults_to_socket() {
    let composition = compose("{}").expect("compose");
    let node = node_template(&composition);

    assert_eq!(
        env_value(node, ContainerName::CoreAgent, dogstatsd::DD_DOGSTATSD_SOCKET),
        Some(dogstatsd::DEFAULT_DOGSTATSD_SOCKET_PATH)
    );
    let port = container(node, ContainerName::CoreAgent)
        .find_port(dogstatsd::DOGSTATSD_PORT_NAME)
        .expect("dogstatsd port");
    assert_eq!(port.container_port, 8125);
    assert_eq!(port.host_port, None);
    assert!(
        env_value(
            node,
            ContainerName::CoreAgent,
            dogstatsd::DD_DOGSTATSD_NON_LOCAL_TRAFFIC,
        ).is_none()
    );
}

#[test]
fn dogstatsd_custom_socket_and_host_port() {
    let composition = compose(
        r#"
features:
  dogstatsd:
    originDetectionEnabled: true
    tagCardinality: orchestrator
    hostPortConfig:
      enabled: true
    unixDomainSocketConfig:
      path: /run/dsd/statsd.sock
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    let socket = node.volume_named("dsdsocket").expect("socket volume");
    assert_eq!(socket.host_path_str(), Some("/run/dsd"));
    let mount = container(node, ContainerName::CoreAgent)
        .find_volume_mount("dsdsocket")
        .expect("socket mount");
    assert_eq!(mount.mount_path, "/run/dsd");

    let port = container(node, ContainerName::CoreAgent)
        .find_port(dogstatsd::DOGSTATSD_PORT_NAME)
        .expect("dogstatsd port");
    assert_eq!(port.host_port, Some(8125));
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, dogstatsd::DD_DOGSTATSD_NON_LOCAL_TRAFFIC),
        Some("true")
    );
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, dogstatsd::DD_DOGSTATSD_TAG_CARDINALITY),
        Some("orchestrator")
    );
    assert!(node.host_pid, "Origin detection over UDS needs the host PID namespace");
}

#[test]
fn dogstatsd_socket_can_be_disabled() {
    let composition = compose(
        r#"
features:
  dogstatsd:
    unixDomainSocketConfig:
      enabled: false
"#,
    )
    .expect("compose");
    let node = node_template(&composition);
    assert!(env_value(node, ContainerName::CoreAgent, dogstatsd::DD_DOGSTATSD_SOCKET).is_none());
    assert!(!node.host_pid);
}

#[test]
fn log_collection_mounts_log_paths() {
    let composition = compose(
        r#"
features:
  logCollection:
    enabled: true
    containerCollectAll: true
    openFilesLimit: 250
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    assert_eq!(
        env_value(node, ContainerName::CoreAgent, logcollection::DD_LOGS_ENABLED),
        Some("true")
    );
    assert_eq!(
        env_value(
            node,
            ContainerName::CoreAgent,
            logcollection::DD_LOGS_CONFIG_CONTAINER_COLLECT_ALL,
        ),
        Some("true")
    );
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, logcollection::DD_LOGS_CONFIG_OPEN_FILES_LIMIT),
        Some("250")
    );

    let core = container(node, ContainerName::CoreAgent);
    let pointer = core
        .find_volume_mount(logcollection::POINTER_VOLUME_NAME)
        .expect("pointer mount");
    assert!(!pointer.read_only, "The agent writes its log pointers");
    for name in [
        logcollection::POD_LOG_VOLUME_NAME,
        logcollection::CONTAINER_LOG_VOLUME_NAME,
        logcollection::SYMLINK_VOLUME_NAME,
    ] {
        let mount = core.find_volume_mount(name).expect("log mount");
        assert!(mount.read_only, "{name} should be read-only");
    }
    assert_eq!(
        node.volume_named(logcollection::POINTER_VOLUME_NAME)
            .and_then(|v| v.host_path_str()),
        Some(logcollection::DEFAULT_TEMP_STORAGE_PATH)
    );
}

#[test]
fn live_process_runs_in_process_agent_by_default() {
    let composition = compose(
        r#"
features:
  liveProcessCollection:
    enabled: true
    scrubProcessArguments: true
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    assert_eq!(container_names(node), vec!["agent", "process-agent"]);
    assert_eq!(
        env_value(
            node,
            ContainerName::ProcessAgent,
            liveprocess::DD_PROCESS_CONFIG_PROCESS_COLLECTION_ENABLED,
        ),
        Some("true")
    );
    assert_eq!(
        env_value(node, ContainerName::ProcessAgent, liveprocess::DD_PROCESS_CONFIG_SCRUB_ARGS),
        Some("true")
    );
    assert!(env_value(
        node,
        ContainerName::ProcessAgent,
        liveprocess::DD_PROCESS_CONFIG_STRIP_PROC_ARGUMENTS,
    )
    .is_none());
}

#[test]
fn live_process_in_core_agent() {
    common::init_tracing();
    let driver = Driver::builtin()
        .expect("builtin driver")
        .options(FeatureOptions::default().process_checks_in_core_agent(true));
    let composition = driver
        .compose(
            &common::agent(
                r#"
features:
  liveProcessCollection:
    enabled: true
"#,
            ),
            &common::recent_server(),
        )
        .expect("compose");
    let node = node_template(&composition);

    assert_eq!(container_names(node), vec!["agent"], "No process agent sidecar");
    assert_eq!(
        env_value(
            node,
            ContainerName::CoreAgent,
            liveprocess::DD_PROCESS_CONFIG_RUN_IN_CORE_AGENT_ENABLED,
        ),
        Some("true")
    );
    assert!(container(node, ContainerName::CoreAgent)
        .find_volume_mount(liveprocess::PASSWD_VOLUME_NAME)
        .is_some());
}

#[test]
fn live_container_mounts_host_dirs_on_process_agent() {
    let composition = compose(
        r#"
features:
  liveContainerCollection:
    enabled: true
"#,
    )
    .expect("compose");
    assert!(composition.has_feature(FeatureId::LiveContainer));
    let node = node_template(&composition);

    assert_eq!(container_names(node), vec!["agent", "process-agent"]);
    assert_eq!(
        env_value(
            node,
            ContainerName::ProcessAgent,
            livecontainer::DD_CONTAINER_COLLECTION_ENABLED,
        ),
        Some("true")
    );
    for name in [ContainerName::CoreAgent, ContainerName::ProcessAgent] {
        assert_eq!(
            env_value(node, name, liveprocess::DD_PROCESS_CONFIG_RUN_IN_CORE_AGENT_ENABLED),
            Some("false")
        );
    }
    let process = container(node, ContainerName::ProcessAgent);
    assert!(process.find_volume_mount("cgroups").is_some());
    assert!(process.find_volume_mount("procdir").is_some());
}

#[test]
fn live_container_in_core_agent() {
    let composition = compose(
        r#"
features:
  liveContainerCollection:
    enabled: true
    runInCoreAgent:
      enabled: true
"#,
    )
    .expect("compose");
    let node = node_template(&composition);

    assert_eq!(container_names(node), vec!["agent"]);
    assert_eq!(
        env_value(node, ContainerName::CoreAgent, livecontainer::DD_CONTAINER_COLLECTION_ENABLED),
        Some("true")
    );
    assert_eq!(
        env_value(
            node,
            ContainerName::CoreAgent,
            liveprocess::DD_PROCESS_CONFIG_RUN_IN_CORE_AGENT_ENABLED,
        ),
        Some("true")
    );
}

#[test]
fn live_container_is_skipped_with_live_process() {
    let composition = compose(
        r#"
features:
  liveProcessCollection:
    enabled: true
  liveContainerCollection:
    enabled: true
"#,
    )
    .expect("compose");
    assert!(composition.has_feature(FeatureId::LiveProcess));
    assert!(!composition.has_feature(FeatureId::LiveContainer));
    assert!(env_value(
        node_template(&composition),
        ContainerName::ProcessAgent,
        livecontainer::DD_CONTAINER_COLLECTION_ENABLED
    )
    .is_none());
}

#[test]
fn orchestrator_explorer_runs_in_cluster_agent() {
    let composition = compose(
        r#"
features:
  orchestratorExplorer:
    enabled: true
    scrubContainers: true
    extraTags: ["team:infra", "env:prod"]
    ddUrl: "https://orchestrator.example.com"
    customResources: ["datadoghq.com/v1alpha1/datadogmetrics"]
"#,
    )
    .expect("compose");
    assert!(composition.has_feature(FeatureId::OrchestratorExplorer));
    let deps = &composition.dependencies;

    let config_map = deps
        .config_map(NAMESPACE, &orchestratorexplorer::default_config_map_name(NAME))
        .expect("owned configmap");
    let parsed: serde_yaml::Value =
        serde_yaml::from_str(&config_map.data[orchestratorexplorer::CONFIG_KEY])
            .expect("valid check config");
    assert_eq!(parsed["cluster_check"], serde_yaml::Value::Bool(false));
    assert_eq!(parsed["ad_identifiers"][0], serde_yaml::Value::from("_kube_orchestrator"));
    assert_eq!(
        parsed["instances"][0]["crd_collectors"][0],
        serde_yaml::Value::from("datadoghq.com/v1alpha1/datadogmetrics")
    );

    let role = deps
        .cluster_role("datadog-cluster-agent-orchestrator-explorer")
        .expect("orchestrator cluster role");
    assert!(role.rules.iter().any(|r| r.resource_names == ["kube-system"]));
    assert!(role
        .rules
        .iter()
        .any(|r| r.api_groups == ["datadoghq.com"] && r.resources == ["datadogmetrics"]));

    let dca = cluster_agent_template(&composition);
    let dca_env = |var| env_value(dca, ContainerName::ClusterAgent, var);
    assert_eq!(dca_env(orchestratorexplorer::DD_ORCHESTRATOR_EXPLORER_ENABLED), Some("true"));
    assert_eq!(
        dca_env(orchestratorexplorer::DD_ORCHESTRATOR_EXPLORER_CONTAINER_SCRUBBING_ENABLED),
        Some("true")
    );
    assert_eq!(
        dca_env(orchestratorexplorer::DD_ORCHESTRATOR_EXPLORER_EXTRA_TAGS),
        Some(r#"["team:infra","env:prod"]"#)
    );
    assert_eq!(
        dca_env(orchestratorexplorer::DD_ORCHESTRATOR_EXPLORER_ORCHESTRATOR_DD_URL),
        Some("https://orchestrator.example.com")
    );
    let mount = container(dca, ContainerName::ClusterAgent)
        .find_volume_mount(orchestratorexplorer::CONFIG_VOLUME_NAME)
        .expect("config mount");
    assert_eq!(mount.mount_path, orchestratorexplorer::CONFIG_MOUNT_PATH);
    assert!(
        dca.annotations
            .get(&checksum::annotation_key(FeatureId::OrchestratorExplorer))
            .is_none(),
        "Default configuration carries no checksum annotation"
    );

    let node = node_template(&composition);
    for name in [ContainerName::CoreAgent, ContainerName::ProcessAgent] {
        assert_eq!(
            env_value(node, name, orchestratorexplorer::DD_ORCHESTRATOR_EXPLORER_ENABLED),
            Some("true")
        );
    }
}

#[test]
fn orchestrator_explorer_moves_to_runner() {
    let composition = compose(
        r#"
features:
  orchestratorExplorer:
    enabled: true
    conf:
      configData: "instances: []"
  clusterChecks:
    enabled: true
    useClusterChecksRunners: true
"#,
    )
    .expect("compose");
    assert!(composition.required.cluster_checks_runner.is_enabled());
    assert!(composition
        .dependencies
        .cluster_role("datadog-cluster-checks-runner-orchestrator-explorer")
        .is_some());
    let config_map = composition
        .dependencies
        .config_map(NAMESPACE, &orchestratorexplorer::default_config_map_name(NAME))
        .expect("owned configmap");
    assert_eq!(config_map.data[orchestratorexplorer::CONFIG_KEY], "instances: []");

    let annotation_key = checksum::annotation_key(FeatureId::OrchestratorExplorer);
    let expected = checksum::digest(&Some("instances: []".to_string())).expect("digest");
    assert_eq!(
        cluster_agent_template(&composition).annotations.get(&annotation_key),
        Some(&expected)
    );
    let runner = composition
        .template(ComponentKind::ClusterChecksRunner)
        .expect("runner template");
    assert_eq!(
        env_value(
            runner,
            ContainerName::ClusterChecksRunner,
            orchestratorexplorer::DD_ORCHESTRATOR_EXPLORER_ENABLED,
        ),
        Some("true")
    );
}

#[test]
fn legacy_orchestrator_explorer_cluster_check() {
    let dda = legacy_agent(
        r#"
clusterAgent:
  enabled: true
  config:
    clusterChecksEnabled: true
clusterChecksRunner:
  enabled: true
features:
  orchestratorExplorer:
    enabled: true
    clusterCheck: true
    scrubbing:
      containers: true
"#,
    );
    let composition = Driver::builtin()
        .expect("builtin driver")
        .compose_v1(&dda, &recent_server())
        .expect("compose v1");
    assert!(composition.has_feature(FeatureId::OrchestratorExplorer));
    assert!(composition
        .dependencies
        .cluster_role("datadog-cluster-checks-runner-orchestrator-explorer")
        .is_some());
    assert_eq!(
        env_value(
            cluster_agent_template(&composition),
            ContainerName::ClusterAgent,
            orchestratorexplorer::DD_ORCHESTRATOR_EXPLORER_CONTAINER_SCRUBBING_ENABLED
        ),
        Some("true")
    );
}

#[test]
fn prometheus_scrape_converts_additional_configs() {
    let composition = compose(
        r#"
features:
  prometheusScrape:
    enabled: true
    enableServiceEndpoints: true
    version: 2
    additionalConfigs: |
      - autodiscovery:
          kubernetes_annotations:
            include:
              custom_label: "true"
"#,
    )
    .expect("compose");
    assert!(composition.has_feature(FeatureId::PrometheusScrape));
    let expected = concat!(
        r#"[{"autodiscovery":{"kubernetes_annotations":"#,
        r#"{"include":{"custom_label":"true"}}}}]"#
    );

    let node = node_template(&composition);
    let dca = cluster_agent_template(&composition);
    for (template, name) in [(node, ContainerName::CoreAgent), (dca, ContainerName::ClusterAgent)] {
        assert_eq!(
            env_value(template, name, prometheusscrape::DD_PROMETHEUS_SCRAPE_ENABLED),
            Some("true")
        );
        assert_eq!(
            env_value(template, name, prometheusscrape::DD_PROMETHEUS_SCRAPE_SERVICE_ENDPOINTS),
            Some("true")
        );
        assert_eq!(
            env_value(template, name, prometheusscrape::DD_PROMETHEUS_SCRAPE_CHECKS),
            Some(expected)
        );
        assert_eq!(
            env_value(template, name, prometheusscrape::DD_PROMETHEUS_SCRAPE_VERSION),
            Some("2")
        );
    }
}

#[test]
fn prometheus_scrape_rejects_invalid_yaml() {
    let err = compose(
        r#"
features:
  prometheusScrape:
    enabled: true
    additionalConfigs: "- [unclosed"
"#,
    )
    .expect_err("invalid additional configs");
    assert!(
        matches!(err, Error::PodTemplate { feature: FeatureId::PrometheusScrape, .. }),
        "Unexpected error: {err}"
    );
}

#[test]
fn legacy_prometheus_scrape() {
    let dda = legacy_agent(
        r#"
features:
  prometheusScrape:
    enabled: true
"#,
    );
    let composition = Driver::builtin()
        .expect("builtin driver")
        .compose_v1(&dda, &recent_server())
        .expect("compose v1");
    assert!(composition.required.cluster_agent.is_enabled());
    let node = node_template(&composition);
    assert_eq!(
        env_value(
            node,
            ContainerName::CoreAgent,
            prometheusscrape::DD_PROMETHEUS_SCRAPE_SERVICE_ENDPOINTS,
        ),
        Some("false")
    );
    assert!(env_value(
        node,
        ContainerName::CoreAgent,
        prometheusscrape::DD_PROMETHEUS_SCRAPE_VERSION,
    )
    .is_none());
}
