pub mod api;
pub mod checksum;
pub mod component;
pub mod dependencies;
pub mod driver;
pub mod error;
pub mod feature;
pub mod merger;
pub mod types;

pub use component::{ComponentKind, ContainerName};
pub use dependencies::{DependencyStore, RenderedDependencies, ResourceManagers, VersionInfo};
pub use driver::{Composition, DesiredState, Driver};
pub use error::{Error, Result};
pub use feature::{
    Feature, FeatureId, FeatureOptions, FeatureRegistry, Requirement, RequiredComponent,
    RequiredComponents,
};
pub use merger::{MergeStrategy, PodTemplateManagers};
pub use types::*;

pub mod prelude {
    pub use crate::driver::{Composition, DesiredState, Driver};
    pub use crate::error::{Error, Result};

    pub use crate::component::{ComponentKind, ContainerName};
    pub use crate::dependencies::{ResourceManagers, VersionInfo};
    pub use crate::feature::{
        Feature, FeatureId, FeatureOptions, FeatureRegistry, Owner, RequiredComponent,
        RequiredComponents,
    };
    pub use crate::merger::{MergeStrategy, PodTemplateManagers};

    pub use crate::types::{
        Annotations, ApiService, ClusterRole, ClusterRoleBinding, ConfigMap, Container,
        ContainerPort, EnvVar, Labels, PodTemplate, PolicyRule, Role, RoleBinding, RoleRef,
        Secret, SecurityContext, Selector, Service, ServiceAccount, ServicePort, Volume,
        VolumeMount,
    };

    pub use kube::CustomResource;
    pub use schemars::JsonSchema;
    pub use serde::{Deserialize, Serialize};
}
