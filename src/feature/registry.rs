use std::collections::BTreeMap;

use super::{
    admissioncontroller, apm, clusterchecks, cws, dogstatsd, enabledefault, externalmetrics,
    kubernetesstatecore, livecontainer, liveprocess, logcollection, npm, oomkill,
    orchestratorexplorer, otlp, prometheusscrape, tcpqueuelength, Feature, FeatureId,
    FeatureOptions,
};
use crate::error::{Error, Result};

pub type BuildFn = fn(&FeatureOptions) -> Box<dyn Feature>;

/// Table of feature constructors keyed by id.
///
/// Filled once at startup and read-only afterwards. Features are built in id order so
/// that every reconcile visits them in the same sequence.
#[derive(Clone, Default)]
pub struct FeatureRegistry {
    builders: BTreeMap<FeatureId, BuildFn>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every feature shipped with the operator.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(FeatureId::Default, enabledefault::build)?;
        registry.register(FeatureId::Apm, apm::build)?;
        registry.register(FeatureId::Otlp, otlp::build)?;
        registry.register(FeatureId::AdmissionController, admissioncontroller::build)?;
        registry.register(FeatureId::ExternalMetrics, externalmetrics::build)?;
        registry.register(FeatureId::Npm, npm::build)?;
        registry.register(FeatureId::Cws, cws::build)?;
        registry.register(FeatureId::TcpQueueLength, tcpqueuelength::build)?;
        registry.register(FeatureId::OomKill, oomkill::build)?;
        registry.register(FeatureId::KubernetesStateCore, kubernetesstatecore::build)?;
        registry.register(FeatureId::ClusterChecks, clusterchecks::build)?;
        registry.register(FeatureId::Dogstatsd, dogstatsd::build)?;
        registry.register(FeatureId::LogCollection, logcollection::build)?;
        registry.register(FeatureId::LiveProcess, liveprocess::build)?;
        registry.register(FeatureId::LiveContainer, livecontainer::build)?;
        registry.register(FeatureId::OrchestratorExplorer, orchestratorexplorer::build)?;
        registry.register(FeatureId::PrometheusScrape, prometheusscrape::build)?;
        Ok(registry)
    }

    pub fn register(&mut self, id: FeatureId, build: BuildFn) -> Result<()> {
        if self.builders.contains_key(&id) {
            tracing::error!(feature = %id, "Feature registered twice");
            return Err(Error::DuplicateFeature(id));
        }
        self.builders.insert(id, build);
        Ok(())
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.builders.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.builders.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    pub fn build(&self, id: FeatureId, options: &FeatureOptions) -> Option<Box<dyn Feature>> {
        self.builders.get(&id).map(|build| build(options))
    }

    /// Fresh instances of every registered feature.
    pub fn build_all(&self, options: &FeatureOptions) -> Vec<Box<dyn Feature>> {
        self.builders.values().map(|build| build(options)).collect()
    }
}
