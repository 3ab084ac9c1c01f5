use agent_operator::component::{LABEL_MANAGED_BY, LABEL_NAME};
use agent_operator::prelude::*;
use agent_operator::{DependencyStore, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

const NS: &str = "monitoring";

fn managers() -> ResourceManagers {
    ResourceManagers::new(DependencyStore::new(), VersionInfo::new(1, 28, 0))
}

fn local_service() -> Service {
    Service::new("datadog-agent", Selector::new().match_labels("app", "agent"))
        .internal_traffic_local()
}

fn owner_ref() -> OwnerReference {
    OwnerReference {
        api_version: "datadoghq.com/v2alpha1".to_string(),
        kind: "DatadogAgent".to_string(),
        name: "datadog".to_string(),
        uid: "uid-1".to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

#[test]
fn service_ports_are_merged_by_name() {
    let mut managers = managers();
    managers
        .service()
        .add_service(NS, local_service().port(ServicePort::tcp("traceport", 8126, 8126)))
        .expect("first declaration");
    managers
        .service()
        .add_service(NS, local_service().port(ServicePort::udp("dogstatsdport", 8125, 8125)))
        .expect("new port");
    managers
        .service()
        .add_service(NS, local_service().port(ServicePort::tcp("traceport", 8126, 8126)))
        .expect("identical port");

    let service = managers
        .store()
        .service(NS, "datadog-agent")
        .expect("service declared");
    let names: Vec<_> = service.ports.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["traceport", "dogstatsdport"]);
}

#[test]
fn service_port_number_conflict() {
    let mut managers = managers();
    managers
        .service()
        .add_service(NS, local_service().port(ServicePort::tcp("otlpgrpcport", 4317, 4317)))
        .expect("first declaration");
    let err = managers
        .service()
        .add_service(NS, local_service().port(ServicePort::tcp("otlpgrpcport", 5317, 5317)))
        .expect_err("same name, different number");
    assert!(matches!(err, Error::MergeConflict(_)), "Unexpected error: {err}");
}

#[test]
fn rbac_rules_and_subjects_are_unioned() {
    let mut managers = managers();
    let read_pods = PolicyRule::new().core_api().resources(&["pods"]).read_only();
    let read_nodes = PolicyRule::new().core_api().resources(&["nodes"]).read_only();

    managers
        .rbac()
        .add_cluster_policy_rules(NS, "datadog-agent", "datadog-agent", vec![read_pods.clone()]);
    managers.rbac().add_cluster_policy_rules(
        NS,
        "datadog-agent",
        "datadog-agent",
        vec![read_pods.clone(), read_nodes.clone()],
    );
    managers
        .rbac()
        .add_cluster_policy_rules(NS, "datadog-agent", "datadog-checks-runner", vec![read_pods]);

    let store = managers.store();
    let role = store.cluster_role("datadog-agent").expect("cluster role");
    assert_eq!(role.rules.len(), 2, "Identical rules should be stored once");
    let binding = store
        .cluster_role_binding("datadog-agent")
        .expect("cluster role binding");
    assert_eq!(binding.role_ref.kind, "ClusterRole");
    let subjects: Vec<_> = binding.subjects.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(subjects, vec!["datadog-agent", "datadog-checks-runner"]);
}

#[test]
fn role_binding_can_target_another_namespace() {
    let mut managers = managers();
    managers.rbac().add_role_binding(
        "kube-system",
        "datadog-cluster-agent-apiserver-auth",
        NS,
        "datadog-cluster-agent",
        RoleRef::role("extension-apiserver-authentication-reader"),
    );

    let binding = managers
        .store()
        .role_binding("kube-system", "datadog-cluster-agent-apiserver-auth")
        .expect("role binding");
    assert_eq!(binding.subjects[0].namespace.as_deref(), Some(NS));
    assert!(managers.store().role(NS, "datadog-cluster-agent-apiserver-auth").is_none());
}

#[test]
fn secrets_accumulate_keys() {
    let mut managers = managers();
    managers.secret().add_secret(NS, "datadog", "api_key", "abc");
    managers.secret().add_secret(NS, "datadog", "app_key", "def");

    let secret = managers.store().secret(NS, "datadog").expect("secret");
    assert_eq!(secret.string_data.len(), 2);
    assert_eq!(managers.store().len(), 1);
}

#[test]
fn render_sets_owner_reference_on_namespaced_objects_only() {
    let mut managers = managers();
    managers.rbac().add_service_account(NS, "datadog-agent");
    managers.rbac().add_cluster_policy_rules(
        NS,
        "datadog-agent",
        "datadog-agent",
        vec![PolicyRule::new().non_resource_urls(&["/metrics"]).verbs(&["get"])],
    );
    managers
        .config_map()
        .add_config_map(NS, ConfigMap::new("datadog-install-info").data("install_info", "---"));
    managers.api_service().add_api_service(
        ApiService::new("external.metrics.k8s.io", "v1beta1").service(NS, "datadog-metrics", 8443),
    );

    let labels = Labels::new()
        .insert(LABEL_NAME, "datadog")
        .insert(LABEL_MANAGED_BY, "datadog-operator");
    let store = managers.into_store().common_labels(labels);
    let rendered = store.render(Some(owner_ref()));

    assert_eq!(rendered.len(), 5);
    let sa = &rendered.service_accounts[0];
    assert_eq!(sa.metadata.namespace.as_deref(), Some(NS));
    assert_eq!(sa.metadata.owner_references.as_ref().map(Vec::len), Some(1));
    assert_eq!(
        sa.metadata.labels.as_ref().and_then(|l| l.get(LABEL_NAME)).map(String::as_str),
        Some("datadog"),
        "Common labels should be stamped"
    );

    let cluster_role = &rendered.cluster_roles[0];
    assert!(
        cluster_role.metadata.owner_references.is_none(),
        "Cluster-scoped objects cannot be owned by a namespaced resource"
    );
    assert!(rendered.cluster_role_bindings[0].metadata.owner_references.is_none());
    assert_eq!(
        rendered.api_services[0].metadata.name.as_deref(),
        Some("v1beta1.external.metrics.k8s.io")
    );
    assert!(rendered.api_services[0].metadata.owner_references.is_none());
}

#[test]
fn render_is_sorted_by_key() {
    let mut managers = managers();
    managers.rbac().add_service_account(NS, "zeta");
    managers.rbac().add_service_account(NS, "alpha");
    managers.rbac().add_service_account("default", "omega");

    let rendered = managers.into_store().render(None);
    let names: Vec<_> = rendered
        .service_accounts
        .iter()
        .filter_map(|sa| sa.metadata.name.as_deref())
        .collect();
    assert_eq!(names, vec!["omega", "alpha", "zeta"], "Ordered by namespace then name");
}

#[test]
fn service_account_is_declared_once() {
    let mut managers = managers();
    managers.rbac().add_service_account(NS, "datadog-agent");
    managers.rbac().add_service_account(NS, "datadog-agent");
    assert_eq!(
        managers.store().service_account(NS, "datadog-agent"),
        Some(&ServiceAccount::new("datadog-agent"))
    );
    assert_eq!(managers.store().len(), 1);
}

#[test]
fn version_parsing_and_gates() {
    let gke = VersionInfo::parse("v1.28.3-gke.1203001").expect("vendor version");
    assert!(gke.is_at_least(1, 28));
    assert!(gke.supports_internal_traffic_policy());

    let old = VersionInfo::parse("v1.21.14").expect("old version");
    assert!(!old.supports_internal_traffic_policy());
    assert!(VersionInfo::new(1, 22, 0).supports_internal_traffic_policy());
    assert!(
        !VersionInfo::unknown().supports_internal_traffic_policy(),
        "Unknown versions fail every gate"
    );

    let err = VersionInfo::parse("not-a-version").expect_err("garbage");
    assert!(matches!(err, Error::InvalidConfig(_)), "Unexpected error: {err}");
}
