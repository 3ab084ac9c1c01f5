use agent_operator::feature::{apm, FeatureOptions};
use agent_operator::{Error, Feature, FeatureId, FeatureRegistry};

#[test]
fn builtin_registers_every_feature() {
    let registry = FeatureRegistry::builtin().expect("builtin registry");
    assert_eq!(registry.len(), 17);
    for id in [
        FeatureId::Default,
        FeatureId::Apm,
        FeatureId::Otlp,
        FeatureId::AdmissionController,
        FeatureId::ExternalMetrics,
        FeatureId::Npm,
        FeatureId::Cws,
        FeatureId::TcpQueueLength,
        FeatureId::OomKill,
        FeatureId::KubernetesStateCore,
        FeatureId::ClusterChecks,
        FeatureId::Dogstatsd,
        FeatureId::LogCollection,
        FeatureId::LiveProcess,
        FeatureId::LiveContainer,
        FeatureId::OrchestratorExplorer,
        FeatureId::PrometheusScrape,
    ] {
        assert!(registry.contains(id), "{id} should be registered");
    }
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = FeatureRegistry::new();
    registry.register(FeatureId::Apm, apm::build).expect("first registration");

    let err = registry
        .register(FeatureId::Apm, apm::build)
        .expect_err("second registration");
    assert!(
        matches!(err, Error::DuplicateFeature(FeatureId::Apm)),
        "Unexpected error: {err}"
    );
    assert_eq!(registry.len(), 1, "Registry should be unchanged");
}

#[test]
fn features_are_built_in_id_order() {
    let registry = FeatureRegistry::builtin().expect("builtin registry");
    let options = FeatureOptions::default();
    let ids: Vec<_> = registry.build_all(&options).iter().map(|f| f.id()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted, "Build order should be stable");
    assert_eq!(ids.first(), Some(&FeatureId::Default));
}

#[test]
fn build_returns_fresh_instance_per_call() {
    let registry = FeatureRegistry::builtin().expect("builtin registry");
    let options = FeatureOptions::default();
    let first = registry.build(FeatureId::Otlp, &options).expect("otlp");
    let second = registry.build(FeatureId::Otlp, &options).expect("otlp");
    assert_eq!(first.id(), second.id());
    assert!(registry.build(FeatureId::Otlp, &options).is_some());
    assert!(FeatureRegistry::new().build(FeatureId::Otlp, &options).is_none());
}

#[test]
fn options_from_lookup() {
    let options = FeatureOptions::from_lookup(|key| match key {
        "DD_OPERATOR_PROCESS_CHECKS_IN_CORE_AGENT" => Some("true".to_string()),
        "DD_OPERATOR_DEFAULT_REGISTRY" => Some(" registry.example.com ".to_string()),
        _ => None,
    })
    .expect("valid options");
    assert!(options.process_checks_in_core_agent);
    assert_eq!(options.registry, "registry.example.com");

    let err = FeatureOptions::from_lookup(|key| {
        (key == "DD_OPERATOR_PROCESS_CHECKS_IN_CORE_AGENT").then(|| "maybe".to_string())
    })
    .expect_err("invalid bool");
    assert!(matches!(err, Error::InvalidConfig(_)), "Unexpected error: {err}");
}
