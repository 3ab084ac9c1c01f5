use k8s_openapi::api::core::v1 as k8s;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
}

impl Volume {
    pub fn empty_dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::EmptyDir,
        }
    }

    pub fn host_path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::HostPath {
                path: path.into(),
                type_: None,
            },
        }
    }

    pub fn host_path_typed(
        name: impl Into<String>,
        path: impl Into<String>,
        type_: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::HostPath {
                path: path.into(),
                type_: Some(type_.into()),
            },
        }
    }

    pub fn secret(name: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::Secret {
                secret_name: secret_name.into(),
            },
        }
    }

    pub fn configmap(name: impl Into<String>, configmap_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::ConfigMap {
                name: configmap_name.into(),
                items: Vec::new(),
            },
        }
    }

    /// Projects a single key of the config map to `path` inside the mount.
    pub fn item(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        if let VolumeSource::ConfigMap { items, .. } = &mut self.source {
            items.push((key.into(), path.into()));
        }
        self
    }

    pub fn host_path_str(&self) -> Option<&str> {
        match &self.source {
            VolumeSource::HostPath { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn into_k8s(self) -> k8s::Volume {
        let mut volume = k8s::Volume {
            name: self.name,
            ..Default::default()
        };
        match self.source {
            VolumeSource::EmptyDir => {
                volume.empty_dir = Some(k8s::EmptyDirVolumeSource::default());
            }
            VolumeSource::HostPath { path, type_ } => {
                volume.host_path = Some(k8s::HostPathVolumeSource { path, type_ });
            }
            VolumeSource::Secret { secret_name } => {
                volume.secret = Some(k8s::SecretVolumeSource {
                    secret_name: Some(secret_name),
                    ..Default::default()
                });
            }
            VolumeSource::ConfigMap { name, items } => {
                volume.config_map = Some(k8s::ConfigMapVolumeSource {
                    name,
                    items: if items.is_empty() {
                        None
                    } else {
                        Some(
                            items
                                .into_iter()
                                .map(|(key, path)| k8s::KeyToPath {
                                    key,
                                    path,
                                    mode: None,
                                })
                                .collect(),
                        )
                    },
                    ..Default::default()
                });
            }
        }
        volume
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VolumeSource {
    EmptyDir,
    HostPath {
        path: String,
        type_: Option<String>,
    },
    Secret {
        secret_name: String,
    },
    ConfigMap {
        name: String,
        items: Vec<(String, String)>,
    },
}
