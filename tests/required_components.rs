use agent_operator::{
    ComponentKind, ContainerName, Requirement, RequiredComponent, RequiredComponents,
};

#[test]
fn required_wins_over_not_required() {
    let mut merged = RequiredComponent::not_required();
    merged.merge(&RequiredComponent::required([ContainerName::CoreAgent]));
    assert!(merged.is_enabled(), "Required should dominate NotRequired");

    let mut merged = RequiredComponent::required([ContainerName::CoreAgent]);
    merged.merge(&RequiredComponent::not_required());
    assert!(merged.is_enabled(), "Merge order should not matter");
}

#[test]
fn not_required_wins_over_unset() {
    let mut merged = RequiredComponent::default();
    merged.merge(&RequiredComponent::not_required());
    assert_eq!(merged.requirement, Requirement::NotRequired);
    assert!(merged.is_configured(), "An explicit NotRequired counts as configured");
    assert!(!merged.is_enabled());
}

#[test]
fn unset_merged_with_unset_stays_unset() {
    assert_eq!(Requirement::Unset.merge(Requirement::Unset), Requirement::Unset);
    assert!(!RequiredComponent::default().is_configured());
}

#[test]
fn containers_are_unioned_without_duplicates() {
    let mut merged =
        RequiredComponent::required([ContainerName::CoreAgent, ContainerName::TraceAgent]);
    merged.merge(&RequiredComponent::required([
        ContainerName::CoreAgent,
        ContainerName::SystemProbe,
    ]));

    let containers: Vec<_> = merged.containers.iter().copied().collect();
    assert_eq!(
        containers,
        vec![
            ContainerName::CoreAgent,
            ContainerName::TraceAgent,
            ContainerName::SystemProbe
        ],
        "Containers should be the ordered union"
    );
}

#[test]
fn privileged_containers_are_detected() {
    let component =
        RequiredComponent::required([ContainerName::CoreAgent, ContainerName::SystemProbe]);
    assert!(component.is_privileged());
    assert!(!RequiredComponent::required([ContainerName::CoreAgent]).is_privileged());
}

#[test]
fn zero_value_is_not_configured() {
    let components = RequiredComponents::default();
    assert!(!components.is_configured(), "Disabled features return the zero value");
    assert!(!components.is_enabled());
    assert!(components.enabled_components().is_empty());
}

#[test]
fn aggregate_merges_every_component() {
    let mut total = RequiredComponents::default().with(
        ComponentKind::NodeAgent,
        RequiredComponent::required([ContainerName::CoreAgent]),
    );
    total.merge(
        &RequiredComponents::default()
            .with(
                ComponentKind::ClusterAgent,
                RequiredComponent::required([ContainerName::ClusterAgent]),
            )
            .with(ComponentKind::ClusterChecksRunner, RequiredComponent::not_required()),
    );

    assert_eq!(
        total.enabled_components(),
        vec![ComponentKind::NodeAgent, ComponentKind::ClusterAgent]
    );
    assert!(total.cluster_checks_runner.is_configured());
    assert!(!total.cluster_checks_runner.is_enabled());
}

#[test]
fn aggregate_is_independent_of_feature_order() {
    let votes = [
        RequiredComponents::default().with(
            ComponentKind::NodeAgent,
            RequiredComponent::required([ContainerName::CoreAgent, ContainerName::ProcessAgent]),
        ),
        RequiredComponents::default()
            .with(ComponentKind::NodeAgent, RequiredComponent::not_required()),
        RequiredComponents::default().with(
            ComponentKind::ClusterChecksRunner,
            RequiredComponent::required([ContainerName::ClusterChecksRunner]),
        ),
    ];

    let mut forward = RequiredComponents::default();
    for vote in &votes {
        forward.merge(vote);
    }
    let mut backward = RequiredComponents::default();
    for vote in votes.iter().rev() {
        backward.merge(vote);
    }
    assert_eq!(forward, backward, "Aggregation should be commutative");
}

#[test]
fn single_container_strategy_requires_only_the_single_agent() {
    let single = RequiredComponent::required([ContainerName::UnprivilegedSingleAgent]);
    assert!(single.single_container_strategy_enabled());

    let mixed = RequiredComponent::required([
        ContainerName::UnprivilegedSingleAgent,
        ContainerName::SystemProbe,
    ]);
    assert!(!mixed.single_container_strategy_enabled());
}
