use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use crate::api::{v1alpha1, v2alpha1};
use crate::checksum;
use crate::component::defaults::{
    CLUSTER_AGENT_CMD_PORT, DD_API_KEY, DD_APP_KEY, DD_CLUSTER_AGENT_AUTH_TOKEN,
    SYSTEM_PROBE_SECCOMP_KEY,
};
use crate::component::{
    cluster_agent_service_name, cluster_agent_token_secret_name, credentials_secret_name,
    install_info_config_map_name, seccomp_config_map_name, ComponentKind, ContainerName,
};
use crate::dependencies::ResourceManagers;
use crate::error::Result;
use crate::feature::{
    Feature, FeatureId, FeatureOptions, Owner, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{
    ConfigMap, EnvVar, Labels, PolicyRule, Selector, Service, ServicePort, Volume, VolumeMount,
    CREATE_VERB, GET_VERB, LIST_VERB, UPDATE_VERB, WATCH_VERB,
};

pub const API_KEY_SECRET_KEY: &str = "api_key";
pub const APP_KEY_SECRET_KEY: &str = "app_key";
pub const TOKEN_SECRET_KEY: &str = "token";
pub const GENERATED_TOKEN_LENGTH: usize = 32;

pub const DD_SITE: &str = "DD_SITE";
pub const DD_CLUSTER_NAME: &str = "DD_CLUSTER_NAME";

pub const INSTALL_INFO_KEY: &str = "install_info";
pub const INSTALL_INFO_VOLUME_NAME: &str = "installinfo";
pub const INSTALL_INFO_MOUNT_PATH: &str = "/etc/datadog-agent/install_info";

/// Key of the pod annotation tracking the cluster agent token.
pub const TOKEN_CHECKSUM_ANNOTATION: &str = "checksum/dca-token-custom-config";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(DefaultFeature::default())
}

/// Where a credential is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
enum SecretSource {
    /// Literal value stored in a Secret owned by the agent.
    Owned(String),
    /// Key of a Secret managed outside the operator.
    External { secret_name: String, key: String },
}

/// Baseline every agent deployment needs: credentials, token, service accounts and RBAC.
#[derive(Debug, Default)]
pub struct DefaultFeature {
    owner: Owner,
    api_key: Option<SecretSource>,
    app_key: Option<SecretSource>,
    token: Option<SecretSource>,
    site: Option<String>,
    cluster_name: Option<String>,
    disable_non_resource_rules: bool,
}

impl DefaultFeature {
    fn api_key_env(&self) -> Option<EnvVar> {
        self.secret_env(DD_API_KEY, self.api_key.as_ref(), API_KEY_SECRET_KEY)
    }

    fn app_key_env(&self) -> Option<EnvVar> {
        self.secret_env(DD_APP_KEY, self.app_key.as_ref(), APP_KEY_SECRET_KEY)
    }

    fn token_env(&self) -> EnvVar {
        match &self.token {
            Some(SecretSource::External { secret_name, key }) => {
                EnvVar::from_secret(DD_CLUSTER_AGENT_AUTH_TOKEN, secret_name, key)
            }
            _ => EnvVar::from_secret(
                DD_CLUSTER_AGENT_AUTH_TOKEN,
                cluster_agent_token_secret_name(&self.owner.name),
                TOKEN_SECRET_KEY,
            ),
        }
    }

    fn secret_env(
        &self,
        name: &str,
        source: Option<&SecretSource>,
        owned_key: &str,
    ) -> Option<EnvVar> {
        match source? {
            SecretSource::Owned(_) => Some(EnvVar::from_secret(
                name,
                credentials_secret_name(&self.owner.name),
                owned_key,
            )),
            SecretSource::External { secret_name, key } => {
                Some(EnvVar::from_secret(name, secret_name, key))
            }
        }
    }

    /// Token value stored in the owned token Secret, if the token is not external.
    fn owned_token(&self) -> Option<&str> {
        match &self.token {
            Some(SecretSource::Owned(token)) => Some(token),
            _ => None,
        }
    }

    fn token_checksum(&self) -> Result<String> {
        match &self.token {
            Some(SecretSource::External { secret_name, key }) => {
                checksum::digest(&(secret_name, key))
            }
            _ => checksum::digest(&self.owned_token()),
        }
    }

    fn add_common_env(&self, managers: &mut PodTemplateManagers) {
        let mut env = managers.env_var();
        if let Some(var) = self.api_key_env() {
            env.add_env_var(var);
        }
        env.add_env_var(self.token_env());
        if let Some(site) = &self.site {
            env.add_env_var(EnvVar::value(DD_SITE, site));
        }
        if let Some(cluster_name) = &self.cluster_name {
            env.add_env_var(EnvVar::value(DD_CLUSTER_NAME, cluster_name));
        }
    }

    fn manage_agent(&self, managers: &mut PodTemplateManagers, core: ContainerName) -> Result<()> {
        self.add_common_env(managers);
        managers
            .annotation()
            .add_annotation(TOKEN_CHECKSUM_ANNOTATION, self.token_checksum()?);
        managers.volume().add_volume_to_container(
            Volume::configmap(
                INSTALL_INFO_VOLUME_NAME,
                install_info_config_map_name(&self.owner.name),
            ),
            VolumeMount::new(INSTALL_INFO_VOLUME_NAME, INSTALL_INFO_MOUNT_PATH, true)
                .sub_path(INSTALL_INFO_KEY),
            core,
        );
        Ok(())
    }
}

/// Token from the status when a previous reconcile generated one, a fresh random one otherwise.
fn status_or_random_token(status_token: Option<&String>) -> SecretSource {
    let token = match status_token.filter(|t| !t.is_empty()) {
        Some(token) => token.clone(),
        None => rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_TOKEN_LENGTH)
            .map(char::from)
            .collect(),
    };
    SecretSource::Owned(token)
}

fn credential_source(
    literal: Option<&String>,
    secret: Option<&v2alpha1::SecretRef>,
) -> Option<SecretSource> {
    if let Some(secret) = secret {
        return Some(SecretSource::External {
            secret_name: secret.secret_name.clone(),
            key: secret.key_name.clone(),
        });
    }
    literal.map(|value| SecretSource::Owned(value.clone()))
}

impl Feature for DefaultFeature {
    fn id(&self) -> FeatureId {
        FeatureId::Default
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        self.owner = Owner::from_resource(dda);

        if let Some(global) = dda.global() {
            if let Some(creds) = &global.credentials {
                self.api_key = credential_source(creds.api_key.as_ref(), creds.api_secret.as_ref());
                self.app_key = credential_source(creds.app_key.as_ref(), creds.app_secret.as_ref());
            }
            self.token = credential_source(
                global.cluster_agent_token.as_ref(),
                global.cluster_agent_token_secret.as_ref(),
            );
            self.site = global.site.clone();
            self.cluster_name = global.cluster_name.clone();
            self.disable_non_resource_rules = global.disable_non_resource_rules.unwrap_or(false);
        }
        if self.token.is_none() {
            self.token = Some(status_or_random_token(dda.generated_token()));
        }

        RequiredComponents::default()
            .with(
                ComponentKind::NodeAgent,
                RequiredComponent::required([ContainerName::CoreAgent]),
            )
            .with(
                ComponentKind::ClusterAgent,
                RequiredComponent::required([ContainerName::ClusterAgent]),
            )
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        self.owner = Owner::from_resource(dda);

        if let Some(creds) = &dda.spec.credentials {
            self.api_key = creds.api_key.clone().map(SecretSource::Owned);
            self.app_key = creds.app_key.clone().map(SecretSource::Owned);
            self.token = creds.token.clone().map(SecretSource::Owned);
        }
        if self.token.is_none() {
            self.token = Some(status_or_random_token(dda.generated_token()));
        }

        let cluster_agent = if dda.spec.cluster_agent.enabled.unwrap_or(false) {
            RequiredComponent::required([ContainerName::ClusterAgent])
        } else {
            RequiredComponent::not_required()
        };

        RequiredComponents::default()
            .with(
                ComponentKind::NodeAgent,
                RequiredComponent::required([ContainerName::CoreAgent]),
            )
            .with(ComponentKind::ClusterAgent, cluster_agent)
    }

    fn manage_dependencies(
        &self,
        managers: &mut ResourceManagers,
        components: &RequiredComponents,
    ) -> Result<()> {
        let owner = &self.owner;
        let ns = owner.namespace.as_str();

        for (key, source) in [
            (API_KEY_SECRET_KEY, &self.api_key),
            (APP_KEY_SECRET_KEY, &self.app_key),
        ] {
            if let Some(SecretSource::Owned(value)) = source {
                managers
                    .secret()
                    .add_secret(ns, &credentials_secret_name(&owner.name), key, value);
            }
        }
        if let Some(token) = self.owned_token() {
            managers.secret().add_secret(
                ns,
                &cluster_agent_token_secret_name(&owner.name),
                TOKEN_SECRET_KEY,
                token,
            );
        }

        managers.config_map().add_config_map(
            ns,
            ConfigMap::new(install_info_config_map_name(&owner.name))
                .data(INSTALL_INFO_KEY, install_info()?),
        );

        for kind in components.enabled_components() {
            managers
                .rbac()
                .add_service_account(ns, &kind.service_account_name(&owner.name));
        }

        if components.node_agent.is_enabled() {
            let kind = ComponentKind::NodeAgent;
            managers.rbac().add_cluster_policy_rules(
                ns,
                &kind.rbac_resource_name(&owner.name),
                &kind.service_account_name(&owner.name),
                self.agent_rules(),
            );
            if components.node_agent.has_container(ContainerName::SystemProbe) {
                managers.config_map().add_config_map(
                    ns,
                    ConfigMap::new(seccomp_config_map_name(&owner.name))
                        .data(SYSTEM_PROBE_SECCOMP_KEY, seccomp_profile()?),
                );
            }
        }

        if components.cluster_agent.is_enabled() {
            let kind = ComponentKind::ClusterAgent;
            let rbac_name = kind.rbac_resource_name(&owner.name);
            let sa_name = kind.service_account_name(&owner.name);
            managers
                .rbac()
                .add_cluster_policy_rules(ns, &rbac_name, &sa_name, cluster_agent_cluster_rules());
            managers
                .rbac()
                .add_policy_rules(ns, &rbac_name, &sa_name, cluster_agent_rules());

            let service = Service::new(
                cluster_agent_service_name(&owner.name),
                Selector::for_component(&owner.name, kind),
            )
            .labels(Labels::for_component(&owner.name, kind))
            .port(ServicePort::tcp("agentport", CLUSTER_AGENT_CMD_PORT, CLUSTER_AGENT_CMD_PORT));
            managers.service().add_service(ns, service)?;
        }

        if components.cluster_checks_runner.is_enabled() {
            let kind = ComponentKind::ClusterChecksRunner;
            managers.rbac().add_cluster_policy_rules(
                ns,
                &kind.rbac_resource_name(&owner.name),
                &kind.service_account_name(&owner.name),
                self.agent_rules(),
            );
        }

        Ok(())
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::CoreAgent)
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, ContainerName::UnprivilegedSingleAgent)
    }

    fn manage_cluster_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.add_common_env(managers);
        if let Some(var) = self.app_key_env() {
            managers.env_var().add_env_var(var);
        }
        managers
            .annotation()
            .add_annotation(TOKEN_CHECKSUM_ANNOTATION, self.token_checksum()?);
        Ok(())
    }

    fn manage_cluster_checks_runner(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.add_common_env(managers);
        managers
            .annotation()
            .add_annotation(TOKEN_CHECKSUM_ANNOTATION, self.token_checksum()?);
        Ok(())
    }
}

impl DefaultFeature {
    /// Kubelet access shared by the node agent and the cluster checks runner.
    fn agent_rules(&self) -> Vec<PolicyRule> {
        let mut rules = vec![
            PolicyRule::new()
                .core_api()
                .resources(&["nodes/metrics", "nodes/spec", "nodes/proxy", "nodes/stats"])
                .verbs(&[GET_VERB]),
            PolicyRule::new()
                .core_api()
                .resources(&["endpoints"])
                .verbs(&[GET_VERB]),
        ];
        if !self.disable_non_resource_rules {
            rules.push(
                PolicyRule::new()
                    .non_resource_urls(&["/version", "/healthz", "/metrics"])
                    .verbs(&[GET_VERB]),
            );
        }
        rules
    }
}

fn cluster_agent_cluster_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::new()
            .core_api()
            .resources(&["services", "endpoints", "pods", "nodes", "componentstatuses"])
            .verbs(&[GET_VERB, LIST_VERB, WATCH_VERB]),
        PolicyRule::new()
            .core_api()
            .resources(&["events"])
            .verbs(&[GET_VERB, LIST_VERB, WATCH_VERB, CREATE_VERB]),
        PolicyRule::new()
            .core_api()
            .resources(&["namespaces"])
            .resource_names(&["kube-system"])
            .verbs(&[GET_VERB]),
    ]
}

/// Leader election state kept in the agent namespace.
fn cluster_agent_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::new()
            .core_api()
            .resources(&["configmaps"])
            .verbs(&[GET_VERB, CREATE_VERB, UPDATE_VERB]),
        PolicyRule::new()
            .api_groups(&["coordination.k8s.io"])
            .resources(&["leases"])
            .verbs(&[GET_VERB, CREATE_VERB, UPDATE_VERB]),
    ]
}

#[derive(Serialize)]
struct InstallInfo {
    install_method: InstallMethod,
}

#[derive(Serialize)]
struct InstallMethod {
    tool: &'static str,
    tool_version: &'static str,
    installer_version: &'static str,
}

fn install_info() -> Result<String> {
    let info = InstallInfo {
        install_method: InstallMethod {
            tool: "datadog-operator",
            tool_version: "datadog-operator",
            installer_version: env!("CARGO_PKG_VERSION"),
        },
    };
    Ok(serde_yaml::to_string(&info)?)
}

fn seccomp_profile() -> Result<String> {
    let syscalls: &[&str] = &[
        "accept4", "access", "arch_prctl", "bind", "bpf", "brk", "capget", "capset", "chdir",
        "clock_gettime", "clone", "close", "connect", "dup", "dup2", "dup3", "epoll_create1",
        "epoll_ctl", "epoll_pwait", "epoll_wait", "execve", "exit", "exit_group", "fcntl",
        "fstat", "fstatfs", "futex", "getdents64", "getpid", "getrandom", "getsockname",
        "getsockopt", "gettid", "ioctl", "listen", "lseek", "madvise", "mmap", "mprotect",
        "munmap", "nanosleep", "newfstatat", "openat", "perf_event_open", "pipe2", "prctl",
        "pread64", "read", "readlinkat", "recvfrom", "recvmsg", "rt_sigaction", "rt_sigprocmask",
        "rt_sigreturn", "sched_yield", "sendmsg", "sendto", "setns", "setsockopt", "socket",
        "statfs", "tgkill", "uname", "unlinkat", "wait4", "write",
    ];
    let profile = serde_json::json!({
        "defaultAction": "SCMP_ACT_ERRNO",
        "syscalls": [{
            "names": syscalls,
            "action": "SCMP_ACT_ALLOW",
        }],
    });
    Ok(serde_json::to_string_pretty(&profile)?)
}
