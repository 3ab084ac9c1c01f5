use super::MergeStrategy;
use crate::component::ContainerName;
use crate::error::{Error, Result};
use crate::types::{Container, PodTemplate, VolumeMount};

pub struct VolumeMountManager<'a> {
    template: &'a mut PodTemplate,
}

impl<'a> VolumeMountManager<'a> {
    pub(crate) fn new(template: &'a mut PodTemplate) -> Self {
        Self { template }
    }

    pub fn add_volume_mount_to_container(&mut self, mount: VolumeMount, name: ContainerName) {
        if let Some(container) = self.template.container_named_mut(name.as_str()) {
            add_volume_mount(container, mount);
        }
    }

    pub fn add_volume_mount_to_containers(&mut self, mount: VolumeMount, names: &[ContainerName]) {
        for name in names {
            self.add_volume_mount_to_container(mount.clone(), *name);
        }
    }

    pub fn add_volume_mount_to_init_container(&mut self, mount: VolumeMount, name: ContainerName) {
        if let Some(container) = self.template.init_container_named_mut(name.as_str()) {
            add_volume_mount(container, mount);
        }
    }

    pub fn add_volume_mount_to_container_with_merge(
        &mut self,
        mount: VolumeMount,
        name: ContainerName,
        strategy: MergeStrategy,
    ) -> Result<()> {
        match self.template.container_named_mut(name.as_str()) {
            Some(container) => merge_volume_mount(container, mount, strategy),
            None => Ok(()),
        }
    }
}

/// Mounts `mount` unless the container already mounts a volume of that name.
pub(crate) fn add_volume_mount(container: &mut Container, mount: VolumeMount) {
    if !container.volume_mounts.iter().any(|m| m.name == mount.name) {
        container.volume_mounts.push(mount);
    }
}

/// Mounts are keyed by volume name within one container; the read-only flag is per container.
pub(crate) fn merge_volume_mount(
    container: &mut Container,
    mount: VolumeMount,
    strategy: MergeStrategy,
) -> Result<()> {
    let Some(idx) = container
        .volume_mounts
        .iter()
        .position(|m| m.name == mount.name)
    else {
        container.volume_mounts.push(mount);
        return Ok(());
    };

    match strategy {
        MergeStrategy::KeepExisting | MergeStrategy::AppendToValue => {}
        MergeStrategy::Override => container.volume_mounts[idx] = mount,
        MergeStrategy::Error => {
            if container.volume_mounts[idx] != mount {
                return Err(Error::MergeConflict(format!(
                    "volume {} already mounted in container {}",
                    mount.name, container.name
                )));
            }
        }
    }
    Ok(())
}
