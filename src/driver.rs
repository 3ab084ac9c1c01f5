use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::api::apps::v1 as apps;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use tracing::{debug, error, info};

use crate::api::{v1alpha1, v2alpha1};
use crate::component::{
    cluster_agent_token_secret_name, default_pod_template, ComponentKind, ContainerName,
    LABEL_MANAGED_BY, LABEL_NAME,
};
use crate::dependencies::{DependencyStore, RenderedDependencies, ResourceManagers, VersionInfo};
use crate::error::{Error, Result};
use crate::feature::enabledefault::TOKEN_SECRET_KEY;
use crate::feature::{
    Feature, FeatureId, FeatureOptions, FeatureRegistry, Owner, RequiredComponent,
    RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{ChildResource, DaemonSet, Deployment, Labels, PodTemplate, Selector};

pub const DAEMONSET_MAX_UNAVAILABLE: &str = "10%";

/// Composes the features of a registry into the desired state of one agent instance.
pub struct Driver {
    registry: FeatureRegistry,
    options: FeatureOptions,
}

impl Driver {
    pub fn new(registry: FeatureRegistry) -> Self {
        Self {
            registry,
            options: FeatureOptions::default(),
        }
    }

    /// Driver over every feature shipped with the operator.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(FeatureRegistry::builtin()?))
    }

    pub fn options(mut self, options: FeatureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    pub fn compose(
        &self,
        dda: &v2alpha1::DatadogAgent,
        version: &VersionInfo,
    ) -> Result<Composition> {
        let mut overrides = BTreeMap::new();
        for kind in ComponentKind::ALL {
            if let Some(o) = dda.spec.component_override(kind) {
                overrides.insert(
                    kind,
                    Override {
                        disabled: o.disabled.unwrap_or(false),
                        replicas: o.replicas,
                    },
                );
            }
        }
        let input = Input {
            owner: Owner::from_resource(dda),
            owner_ref: owner_reference(dda),
            image_registry: dda
                .registry()
                .map(str::to_string)
                .unwrap_or_else(|| self.options.registry.clone()),
            single_process: dda.container_strategy() == v2alpha1::ContainerStrategy::SingleProcess,
            overrides,
            has_status_token: dda.generated_token().is_some_and(|t| !t.is_empty()),
        };
        self.compose_with(input, version, |feature| feature.configure(dda))
    }

    /// Same as [`Driver::compose`] for the legacy schema, which has no overrides and no
    /// container strategy.
    pub fn compose_v1(
        &self,
        dda: &v1alpha1::DatadogAgent,
        version: &VersionInfo,
    ) -> Result<Composition> {
        let input = Input {
            owner: Owner::from_resource(dda),
            owner_ref: owner_reference(dda),
            image_registry: self.options.registry.clone(),
            single_process: false,
            overrides: BTreeMap::new(),
            has_status_token: dda.generated_token().is_some_and(|t| !t.is_empty()),
        };
        self.compose_with(input, version, |feature| feature.configure_v1(dda))
    }

    fn compose_with<F>(
        &self,
        input: Input,
        version: &VersionInfo,
        mut configure: F,
    ) -> Result<Composition>
    where
        F: FnMut(&mut dyn Feature) -> RequiredComponents,
    {
        let owner = &input.owner;

        let mut required = RequiredComponents::default();
        let mut active: Vec<Box<dyn Feature>> = Vec::new();
        for mut feature in self.registry.build_all(&self.options) {
            let components = configure(feature.as_mut());
            if !components.is_configured() {
                debug!(owner = %owner.name, feature = %feature.id(), "Feature not configured");
                continue;
            }
            debug!(owner = %owner.name, feature = %feature.id(), "Feature configured");
            required.merge(&components);
            active.push(feature);
        }

        for (kind, o) in &input.overrides {
            if o.disabled {
                debug!(owner = %owner.name, component = %kind, "Component disabled by override");
                *required.get_mut(*kind) = RequiredComponent::not_required();
            }
        }

        let node = &mut required.node_agent;
        let single_container = input.single_process
            && node.is_enabled()
            && node.containers.iter().all(ContainerName::fits_single_container);
        if single_container {
            node.containers = BTreeSet::from([ContainerName::UnprivilegedSingleAgent]);
        }

        let store = DependencyStore::new().common_labels(
            Labels::new()
                .insert(LABEL_NAME, &owner.name)
                .insert(LABEL_MANAGED_BY, "datadog-operator"),
        );
        let mut resources = ResourceManagers::new(store, version.clone());
        for feature in &active {
            feature
                .manage_dependencies(&mut resources, &required)
                .map_err(|e| {
                    error!(
                        owner = %owner.name,
                        feature = %feature.id(),
                        error = %e,
                        "Failed to manage dependencies"
                    );
                    Error::Dependency {
                        feature: feature.id(),
                        source: Box::new(e),
                    }
                })?;
        }

        let mut templates = BTreeMap::new();
        for kind in required.enabled_components() {
            let base = default_pod_template(
                kind,
                &owner.name,
                &required.get(kind).containers,
                &input.image_registry,
            );
            let mut managers = PodTemplateManagers::new(base);
            for feature in &active {
                manage(feature.as_ref(), kind, single_container, &mut managers).map_err(|e| {
                    error!(
                        owner = %owner.name,
                        feature = %feature.id(),
                        component = %kind,
                        error = %e,
                        "Failed to manage pod template"
                    );
                    Error::PodTemplate {
                        feature: feature.id(),
                        component: kind,
                        source: Box::new(e),
                    }
                })?;
            }
            templates.insert(kind, managers.into_pod_template());
        }

        let dependencies = resources.into_store();
        let generated_token = if input.has_status_token {
            None
        } else {
            dependencies
                .secret(&owner.namespace, &cluster_agent_token_secret_name(&owner.name))
                .and_then(|s| s.string_data.get(TOKEN_SECRET_KEY))
                .cloned()
        };
        info!(
            owner = %owner.name,
            namespace = %owner.namespace,
            components = ?required.enabled_components(),
            features = active.len(),
            dependencies = dependencies.len(),
            single_container,
            "Composed agent deployment"
        );

        Ok(Composition {
            required,
            features: active.iter().map(|f| f.id()).collect(),
            single_container,
            templates,
            dependencies,
            generated_token,
            replicas: input
                .overrides
                .iter()
                .filter_map(|(kind, o)| o.replicas.map(|r| (*kind, r)))
                .collect(),
            owner: input.owner,
            owner_ref: input.owner_ref,
        })
    }
}

fn manage(
    feature: &dyn Feature,
    kind: ComponentKind,
    single_container: bool,
    managers: &mut PodTemplateManagers,
) -> Result<()> {
    match kind {
        ComponentKind::NodeAgent if single_container => {
            feature.manage_single_container_node_agent(managers)
        }
        ComponentKind::NodeAgent => feature.manage_node_agent(managers),
        ComponentKind::ClusterAgent => feature.manage_cluster_agent(managers),
        ComponentKind::ClusterChecksRunner => feature.manage_cluster_checks_runner(managers),
    }
}

fn owner_reference<R: Resource<DynamicType = ()>>(resource: &R) -> OwnerReference {
    OwnerReference {
        api_version: R::api_version(&()).to_string(),
        kind: R::kind(&()).to_string(),
        name: resource.name_any(),
        uid: resource.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

struct Input {
    owner: Owner,
    owner_ref: OwnerReference,
    image_registry: String,
    single_process: bool,
    overrides: BTreeMap<ComponentKind, Override>,
    has_status_token: bool,
}

struct Override {
    disabled: bool,
    replicas: Option<i32>,
}

/// Result of one composition, before rendering to Kubernetes objects.
#[derive(Clone, Debug)]
pub struct Composition {
    pub owner: Owner,
    pub required: RequiredComponents,
    /// Features whose configure returned a configured value, in registry order.
    pub features: Vec<FeatureId>,
    pub single_container: bool,
    pub templates: BTreeMap<ComponentKind, PodTemplate>,
    pub dependencies: DependencyStore,
    /// Cluster agent token to persist in `status.clusterAgent.generatedToken`. `None` when the
    /// status already carries one or the token comes from an external Secret.
    pub generated_token: Option<String>,
    replicas: BTreeMap<ComponentKind, i32>,
    owner_ref: OwnerReference,
}

impl Composition {
    pub fn template(&self, kind: ComponentKind) -> Option<&PodTemplate> {
        self.templates.get(&kind)
    }

    pub fn has_feature(&self, id: FeatureId) -> bool {
        self.features.contains(&id)
    }

    pub fn owner_reference(&self) -> &OwnerReference {
        &self.owner_ref
    }

    pub fn render(self) -> DesiredState {
        let ns = self.owner.namespace.as_str();
        let name = self.owner.name.as_str();
        let mut state = DesiredState {
            dependencies: self.dependencies.render(Some(self.owner_ref.clone())),
            ..Default::default()
        };

        for (kind, template) in self.templates {
            let selector = Selector::for_component(name, kind);
            let labels = Labels::for_component(name, kind);
            let owner_ref = Some(self.owner_ref.clone());
            match kind {
                ComponentKind::NodeAgent => {
                    let ds = DaemonSet::new(kind.resource_name(name), selector, template)
                        .labels(labels)
                        .max_unavailable(DAEMONSET_MAX_UNAVAILABLE);
                    state.node_agent = Some(ds.into_k8s(ns, owner_ref));
                }
                ComponentKind::ClusterAgent | ComponentKind::ClusterChecksRunner => {
                    let replicas = self.replicas.get(&kind).copied().unwrap_or(1);
                    let deployment = Deployment::new(kind.resource_name(name), selector, template)
                        .labels(labels)
                        .replicas(replicas)
                        .into_k8s(ns, owner_ref);
                    if kind == ComponentKind::ClusterAgent {
                        state.cluster_agent = Some(deployment);
                    } else {
                        state.cluster_checks_runner = Some(deployment);
                    }
                }
            }
        }
        state
    }
}

/// Kubernetes objects to apply for one agent instance.
#[derive(Clone, Debug, Default)]
pub struct DesiredState {
    pub node_agent: Option<apps::DaemonSet>,
    pub cluster_agent: Option<apps::Deployment>,
    pub cluster_checks_runner: Option<apps::Deployment>,
    pub dependencies: RenderedDependencies,
}

impl DesiredState {
    /// Number of workloads rendered.
    pub fn workload_count(&self) -> usize {
        [
            self.node_agent.is_some(),
            self.cluster_agent.is_some(),
            self.cluster_checks_runner.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}
