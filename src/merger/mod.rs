pub mod annotation;
pub mod envvar;
pub mod port;
pub mod security_context;
pub mod volume;
pub mod volume_mount;

pub use annotation::AnnotationManager;
pub use envvar::EnvVarManager;
pub use port::PortManager;
pub use security_context::SecurityContextManager;
pub use volume::VolumeManager;
pub use volume_mount::VolumeMountManager;

use crate::types::PodTemplate;

/// What to do when an entry with the same name already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Leave the existing entry untouched.
    #[default]
    KeepExisting,
    /// Replace the existing entry.
    Override,
    /// Join the new value onto the existing one, space separated, skipping tokens already present.
    AppendToValue,
    /// Fail with a merge conflict unless both entries are identical.
    Error,
}

/// Mutation surface over one component's pod template.
///
/// Every feature touching the component goes through the same instance, so each
/// sub-manager adds by name and keeps insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodTemplateManagers {
    template: PodTemplate,
}

impl PodTemplateManagers {
    pub fn new(template: PodTemplate) -> Self {
        Self { template }
    }

    pub fn pod_template(&self) -> &PodTemplate {
        &self.template
    }

    pub fn pod_template_mut(&mut self) -> &mut PodTemplate {
        &mut self.template
    }

    pub fn into_pod_template(self) -> PodTemplate {
        self.template
    }

    pub fn env_var(&mut self) -> EnvVarManager<'_> {
        EnvVarManager::new(&mut self.template)
    }

    pub fn volume(&mut self) -> VolumeManager<'_> {
        VolumeManager::new(&mut self.template)
    }

    pub fn volume_mount(&mut self) -> VolumeMountManager<'_> {
        VolumeMountManager::new(&mut self.template)
    }

    pub fn port(&mut self) -> PortManager<'_> {
        PortManager::new(&mut self.template)
    }

    pub fn security_context(&mut self) -> SecurityContextManager<'_> {
        SecurityContextManager::new(&mut self.template)
    }

    pub fn annotation(&mut self) -> AnnotationManager<'_> {
        AnnotationManager::new(&mut self.template)
    }

    pub fn set_service_account(&mut self, name: impl Into<String>) {
        self.template.service_account = Some(name.into());
    }
}
