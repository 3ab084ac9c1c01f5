use super::volume_mount::add_volume_mount;
use super::MergeStrategy;
use crate::component::ContainerName;
use crate::error::{Error, Result};
use crate::types::{PodTemplate, Volume, VolumeMount, VolumeSource};

pub struct VolumeManager<'a> {
    template: &'a mut PodTemplate,
}

impl<'a> VolumeManager<'a> {
    pub(crate) fn new(template: &'a mut PodTemplate) -> Self {
        Self { template }
    }

    /// Adds the volume to the pod and mounts it in every regular container.
    pub fn add_volume(&mut self, volume: Volume, mount: VolumeMount) {
        add_volume_to_pod(self.template, volume);
        for container in &mut self.template.containers {
            add_volume_mount(container, mount.clone());
        }
    }

    pub fn add_volume_to_container(
        &mut self,
        volume: Volume,
        mount: VolumeMount,
        name: ContainerName,
    ) {
        self.add_volume_to_containers(volume, mount, &[name]);
    }

    pub fn add_volume_to_containers(
        &mut self,
        volume: Volume,
        mount: VolumeMount,
        names: &[ContainerName],
    ) {
        add_volume_to_pod(self.template, volume);
        for name in names {
            if let Some(container) = self.template.container_named_mut(name.as_str()) {
                add_volume_mount(container, mount.clone());
            }
        }
    }

    /// Adds a volume to the pod without mounting it anywhere.
    pub fn add_pod_volume(&mut self, volume: Volume) {
        add_volume_to_pod(self.template, volume);
    }

    pub fn add_volume_with_merge(&mut self, volume: Volume, strategy: MergeStrategy) -> Result<()> {
        merge_volume(self.template, volume, strategy)
    }
}

fn add_volume_to_pod(template: &mut PodTemplate, volume: Volume) {
    if template.volume_named(&volume.name).is_none() {
        template.volumes.push(volume);
    }
}

pub(crate) fn merge_volume(
    template: &mut PodTemplate,
    volume: Volume,
    strategy: MergeStrategy,
) -> Result<()> {
    let Some(idx) = template.volumes.iter().position(|v| v.name == volume.name) else {
        template.volumes.push(volume);
        return Ok(());
    };

    match strategy {
        MergeStrategy::KeepExisting => {}
        MergeStrategy::Override => template.volumes[idx] = volume,
        MergeStrategy::AppendToValue => {
            let current = &mut template.volumes[idx];
            if let (
                VolumeSource::ConfigMap { name, items },
                VolumeSource::ConfigMap {
                    name: new_name,
                    items: new_items,
                },
            ) = (&mut current.source, &volume.source)
            {
                if name == new_name {
                    for (key, path) in new_items {
                        match items.iter().find(|(_, p)| p == path) {
                            None => items.push((key.clone(), path.clone())),
                            Some((existing, _)) if existing == key => {}
                            Some((existing, _)) => {
                                return Err(Error::MergeConflict(format!(
                                    "path {path} of volume {} already used by key {existing}",
                                    volume.name
                                )));
                            }
                        }
                    }
                    return Ok(());
                }
            }
            current.source = volume.source;
        }
        MergeStrategy::Error => {
            if template.volumes[idx] != volume {
                return Err(Error::MergeConflict(format!(
                    "volume {} already defined with a different source",
                    volume.name
                )));
            }
        }
    }
    Ok(())
}
