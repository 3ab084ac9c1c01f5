use k8s_openapi::api::core::v1 as k8s;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub ports: Vec<ContainerPort>,
    pub env: Vec<EnvVar>,
    pub resources: Option<Resources>,
    pub volume_mounts: Vec<VolumeMount>,
    pub security_context: Option<SecurityContext>,
}

impl Container {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
            args: Vec::new(),
            ports: Vec::new(),
            env: Vec::new(),
            resources: None,
            volume_mounts: Vec::new(),
            security_context: None,
        }
    }

    pub fn command(mut self, cmd: Vec<impl Into<String>>) -> Self {
        self.command = cmd.into_iter().map(Into::into).collect();
        self
    }

    pub fn args(mut self, args: Vec<impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, var: EnvVar) -> Self {
        self.env.push(var);
        self
    }

    pub fn volume_mount(mut self, mount: VolumeMount) -> Self {
        self.volume_mounts.push(mount);
        self
    }

    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn security_context(mut self, ctx: SecurityContext) -> Self {
        self.security_context = Some(ctx);
        self
    }

    pub fn find_env(&self, name: &str) -> Option<&EnvVar> {
        self.env.iter().find(|e| e.name() == name)
    }

    pub fn find_port(&self, name: &str) -> Option<&ContainerPort> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn find_volume_mount(&self, name: &str) -> Option<&VolumeMount> {
        self.volume_mounts.iter().find(|m| m.name == name)
    }

    pub fn into_k8s(self) -> k8s::Container {
        k8s::Container {
            name: self.name,
            image: Some(self.image),
            command: if self.command.is_empty() {
                None
            } else {
                Some(self.command)
            },
            args: if self.args.is_empty() { None } else { Some(self.args) },
            ports: if self.ports.is_empty() {
                None
            } else {
                Some(self.ports.into_iter().map(|p| p.into_k8s()).collect())
            },
            env: if self.env.is_empty() {
                None
            } else {
                Some(self.env.into_iter().map(|e| e.into_k8s()).collect())
            },
            resources: self.resources.map(|r| r.into_k8s()),
            volume_mounts: if self.volume_mounts.is_empty() {
                None
            } else {
                Some(
                    self.volume_mounts
                        .into_iter()
                        .map(|v| v.into_k8s())
                        .collect(),
                )
            },
            security_context: self.security_context.map(|s| s.into_k8s()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerPort {
    pub name: String,
    pub container_port: i32,
    pub host_port: Option<i32>,
    pub protocol: Protocol,
}

impl ContainerPort {
    pub fn tcp(name: impl Into<String>, port: i32) -> Self {
        Self {
            name: name.into(),
            container_port: port,
            host_port: None,
            protocol: Protocol::Tcp,
        }
    }

    pub fn udp(name: impl Into<String>, port: i32) -> Self {
        Self {
            name: name.into(),
            container_port: port,
            host_port: None,
            protocol: Protocol::Udp,
        }
    }

    pub fn host_port(mut self, port: i32) -> Self {
        self.host_port = Some(port);
        self
    }

    pub fn into_k8s(self) -> k8s::ContainerPort {
        k8s::ContainerPort {
            name: Some(self.name),
            container_port: self.container_port,
            host_port: self.host_port,
            protocol: Some(self.protocol.as_str().to_string()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvVar {
    Value {
        name: String,
        value: String,
    },
    SecretRef {
        name: String,
        secret_name: String,
        key: String,
    },
    ConfigMapRef {
        name: String,
        configmap_name: String,
        key: String,
    },
    FieldRef {
        name: String,
        field_path: String,
    },
}

impl EnvVar {
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        EnvVar::Value {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn from_bool(name: impl Into<String>, value: bool) -> Self {
        Self::value(name, value.to_string())
    }

    pub fn from_secret(
        name: impl Into<String>,
        secret_name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        EnvVar::SecretRef {
            name: name.into(),
            secret_name: secret_name.into(),
            key: key.into(),
        }
    }

    pub fn from_field(name: impl Into<String>, field_path: impl Into<String>) -> Self {
        EnvVar::FieldRef {
            name: name.into(),
            field_path: field_path.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EnvVar::Value { name, .. }
            | EnvVar::SecretRef { name, .. }
            | EnvVar::ConfigMapRef { name, .. }
            | EnvVar::FieldRef { name, .. } => name,
        }
    }

    /// Literal value, `None` for variables sourced from another object.
    pub fn literal(&self) -> Option<&str> {
        match self {
            EnvVar::Value { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn into_k8s(self) -> k8s::EnvVar {
        match self {
            EnvVar::Value { name, value } => k8s::EnvVar {
                name,
                value: Some(value),
                value_from: None,
            },
            EnvVar::SecretRef {
                name,
                secret_name,
                key,
            } => k8s::EnvVar {
                name,
                value: None,
                value_from: Some(k8s::EnvVarSource {
                    secret_key_ref: Some(k8s::SecretKeySelector {
                        name: secret_name,
                        key,
                        optional: None,
                    }),
                    ..Default::default()
                }),
            },
            EnvVar::ConfigMapRef {
                name,
                configmap_name,
                key,
            } => k8s::EnvVar {
                name,
                value: None,
                value_from: Some(k8s::EnvVarSource {
                    config_map_key_ref: Some(k8s::ConfigMapKeySelector {
                        name: configmap_name,
                        key,
                        optional: None,
                    }),
                    ..Default::default()
                }),
            },
            EnvVar::FieldRef { name, field_path } => k8s::EnvVar {
                name,
                value: None,
                value_from: Some(k8s::EnvVarSource {
                    field_ref: Some(k8s::ObjectFieldSelector {
                        field_path,
                        api_version: None,
                    }),
                    ..Default::default()
                }),
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resources {
    pub requests: BTreeMap<String, String>,
    pub limits: BTreeMap<String, String>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cpu(mut self, request: impl Into<String>, limit: impl Into<String>) -> Self {
        self.requests.insert("cpu".to_string(), request.into());
        self.limits.insert("cpu".to_string(), limit.into());
        self
    }

    pub fn memory(mut self, request: impl Into<String>, limit: impl Into<String>) -> Self {
        self.requests.insert("memory".to_string(), request.into());
        self.limits.insert("memory".to_string(), limit.into());
        self
    }

    pub fn into_k8s(self) -> k8s::ResourceRequirements {
        let to_quantities = |m: BTreeMap<String, String>| {
            if m.is_empty() {
                None
            } else {
                Some(m.into_iter().map(|(k, v)| (k, Quantity(v))).collect())
            }
        };

        k8s::ResourceRequirements {
            requests: to_quantities(self.requests),
            limits: to_quantities(self.limits),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    pub sub_path: Option<String>,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn new(name: impl Into<String>, mount_path: impl Into<String>, read_only: bool) -> Self {
        Self {
            name: name.into(),
            mount_path: mount_path.into(),
            sub_path: None,
            read_only,
        }
    }

    pub fn sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    pub fn into_k8s(self) -> k8s::VolumeMount {
        k8s::VolumeMount {
            name: self.name,
            mount_path: self.mount_path,
            sub_path: self.sub_path,
            read_only: Some(self.read_only),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityContext {
    pub run_as_user: Option<i64>,
    pub privileged: Option<bool>,
    pub read_only_root_filesystem: Option<bool>,
    pub capabilities_add: Vec<String>,
    pub apparmor_profile: Option<String>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_as_user(mut self, uid: i64) -> Self {
        self.run_as_user = Some(uid);
        self
    }

    pub fn privileged(mut self, value: bool) -> Self {
        self.privileged = Some(value);
        self
    }

    pub fn read_only_root_filesystem(mut self, value: bool) -> Self {
        self.read_only_root_filesystem = Some(value);
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities_add.iter().any(|c| c == capability)
    }

    pub fn into_k8s(self) -> k8s::SecurityContext {
        k8s::SecurityContext {
            run_as_user: self.run_as_user,
            privileged: self.privileged,
            read_only_root_filesystem: self.read_only_root_filesystem,
            capabilities: if self.capabilities_add.is_empty() {
                None
            } else {
                Some(k8s::Capabilities {
                    add: Some(self.capabilities_add),
                    drop: None,
                })
            },
            ..Default::default()
        }
    }
}
