#![allow(dead_code)]

use agent_operator::api::{v1alpha1, v2alpha1};
use agent_operator::prelude::*;

pub const NAME: &str = "datadog";
pub const NAMESPACE: &str = "monitoring";
pub const UID: &str = "3c0fa1a6-8f3e-4d8f-b1e2-5d7f0e2b9a41";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Agent named [`NAME`] in [`NAMESPACE`] built from the YAML form of its spec.
pub fn agent(spec_yaml: &str) -> v2alpha1::DatadogAgent {
    let spec: v2alpha1::DatadogAgentSpec =
        serde_yaml::from_str(spec_yaml).expect("valid v2alpha1 spec");
    let mut dda = v2alpha1::DatadogAgent::new(NAME, spec);
    dda.metadata.namespace = Some(NAMESPACE.to_string());
    dda.metadata.uid = Some(UID.to_string());
    dda
}

pub fn legacy_agent(spec_yaml: &str) -> v1alpha1::DatadogAgent {
    let spec: v1alpha1::DatadogAgentSpec =
        serde_yaml::from_str(spec_yaml).expect("valid v1alpha1 spec");
    let mut dda = v1alpha1::DatadogAgent::new(NAME, spec);
    dda.metadata.namespace = Some(NAMESPACE.to_string());
    dda.metadata.uid = Some(UID.to_string());
    dda
}

pub fn recent_server() -> VersionInfo {
    VersionInfo::new(1, 28, 0)
}

pub fn compose(spec_yaml: &str) -> Result<Composition> {
    init_tracing();
    Driver::builtin()?.compose(&agent(spec_yaml), &recent_server())
}

pub fn compose_on(spec_yaml: &str, version: VersionInfo) -> Result<Composition> {
    init_tracing();
    Driver::builtin()?.compose(&agent(spec_yaml), &version)
}

pub fn node_template(composition: &Composition) -> &PodTemplate {
    composition
        .template(ComponentKind::NodeAgent)
        .expect("node agent template")
}

pub fn cluster_agent_template(composition: &Composition) -> &PodTemplate {
    composition
        .template(ComponentKind::ClusterAgent)
        .expect("cluster agent template")
}

pub fn container<'a>(template: &'a PodTemplate, name: ContainerName) -> &'a Container {
    template
        .container_named(name.as_str())
        .unwrap_or_else(|| panic!("container {name} present"))
}

/// Literal value of `var` in `name`, `None` when unset or sourced from a reference.
pub fn env_value<'a>(template: &'a PodTemplate, name: ContainerName, var: &str) -> Option<&'a str> {
    template
        .container_named(name.as_str())?
        .find_env(var)?
        .literal()
}

pub fn container_names(template: &PodTemplate) -> Vec<&str> {
    template.containers.iter().map(|c| c.name.as_str()).collect()
}
