use crate::component::ComponentKind;
use crate::feature::FeatureId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Feature {0} is already registered")]
    DuplicateFeature(FeatureId),

    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Merge conflict: {0}")]
    MergeConflict(String),

    #[error("Feature {feature} failed to manage dependencies: {source}")]
    Dependency {
        feature: FeatureId,
        #[source]
        source: Box<Error>,
    },

    #[error("Feature {feature} failed to manage the {component} pod template: {source}")]
    PodTemplate {
        feature: FeatureId,
        component: ComponentKind,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
