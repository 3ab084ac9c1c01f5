use crate::api::v2alpha1::{OtlpEndpointConfig, OtlpFeatureConfig};
use crate::api::{v1alpha1, v2alpha1};
use crate::component::{ComponentKind, ContainerName};
use crate::dependencies::ResourceManagers;
use crate::error::{Error, Result};
use crate::feature::{
    add_agent_local_service, enabled, Feature, FeatureId, FeatureOptions, LocalServiceConfig,
    Owner, RequiredComponent, RequiredComponents,
};
use crate::merger::PodTemplateManagers;
use crate::types::{ContainerPort, EnvVar, ServicePort};

pub const DEFAULT_GRPC_ENDPOINT: &str = "0.0.0.0:4317";
pub const DEFAULT_HTTP_ENDPOINT: &str = "0.0.0.0:4318";
pub const GRPC_PORT_NAME: &str = "otlpgrpcport";
pub const HTTP_PORT_NAME: &str = "otlphttpport";

pub const DD_OTLP_GRPC_ENDPOINT: &str = "DD_OTLP_GRPC_ENDPOINT";
pub const DD_OTLP_HTTP_ENDPOINT: &str = "DD_OTLP_HTTP_ENDPOINT";

pub fn build(_options: &FeatureOptions) -> Box<dyn Feature> {
    Box::new(OtlpFeature::default())
}

/// OTLP ingestion in the core agent, forwarded to the trace agent when APM is on.
#[derive(Debug, Default)]
pub struct OtlpFeature {
    owner: Owner,
    grpc_endpoint: Option<String>,
    http_endpoint: Option<String>,
    apm_enabled: bool,
    local_service: LocalServiceConfig,
}

/// Port of a `host:port` endpoint.
pub fn extract_port(endpoint: &str) -> Result<i32> {
    let Some((_, digits)) = endpoint.rsplit_once(':') else {
        return Err(Error::invalid_endpoint(endpoint, "missing port"));
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_endpoint(endpoint, "port is not a number"));
    }
    match digits.parse::<u32>() {
        Ok(port) if port <= 65535 => Ok(port as i32),
        _ => Err(Error::invalid_endpoint(endpoint, "port out of range")),
    }
}

fn validate_grpc_endpoint(endpoint: &str) -> Result<i32> {
    if endpoint.starts_with("unix:") || endpoint.starts_with("unix-abstract:") {
        return Err(Error::invalid_endpoint(
            endpoint,
            "unix sockets are not supported for the gRPC receiver",
        ));
    }
    extract_port(endpoint)
}

impl OtlpFeature {
    /// Validated `(port name, port, env name, endpoint)` for every enabled protocol.
    fn endpoints(&self) -> Result<Vec<(&'static str, i32, &'static str, &str)>> {
        let mut out = Vec::new();
        if let Some(endpoint) = &self.grpc_endpoint {
            let port = validate_grpc_endpoint(endpoint).inspect_err(|e| {
                tracing::error!(owner = %self.owner.name, error = %e, "Invalid OTLP gRPC endpoint");
            })?;
            out.push((GRPC_PORT_NAME, port, DD_OTLP_GRPC_ENDPOINT, endpoint.as_str()));
        }
        if let Some(endpoint) = &self.http_endpoint {
            let port = extract_port(endpoint).inspect_err(|e| {
                tracing::error!(owner = %self.owner.name, error = %e, "Invalid OTLP HTTP endpoint");
            })?;
            out.push((HTTP_PORT_NAME, port, DD_OTLP_HTTP_ENDPOINT, endpoint.as_str()));
        }
        Ok(out)
    }

    fn manage_agent(
        &self,
        managers: &mut PodTemplateManagers,
        containers: &[ContainerName],
    ) -> Result<()> {
        let Some(core) = containers.first().copied() else {
            return Ok(());
        };
        for (port_name, port, env_name, endpoint) in self.endpoints()? {
            managers
                .env_var()
                .add_env_var_to_containers(containers, EnvVar::value(env_name, endpoint));
            managers
                .port()
                .add_port_to_container(core, ContainerPort::tcp(port_name, port).host_port(port));
        }
        Ok(())
    }
}

impl OtlpFeature {
    fn required(&mut self, otlp: Option<&OtlpFeatureConfig>) -> RequiredComponents {
        let Some(otlp) = otlp else {
            return RequiredComponents::default();
        };
        let protocols = &otlp.receiver.protocols;
        self.grpc_endpoint = enabled_endpoint(protocols.grpc.as_ref(), DEFAULT_GRPC_ENDPOINT);
        self.http_endpoint = enabled_endpoint(protocols.http.as_ref(), DEFAULT_HTTP_ENDPOINT);
        if self.grpc_endpoint.is_none() && self.http_endpoint.is_none() {
            return RequiredComponents::default();
        }

        let mut containers = vec![ContainerName::CoreAgent];
        if self.apm_enabled {
            containers.push(ContainerName::TraceAgent);
        }
        RequiredComponents::default()
            .with(ComponentKind::NodeAgent, RequiredComponent::required(containers))
    }
}

fn enabled_endpoint(config: Option<&OtlpEndpointConfig>, default: &str) -> Option<String> {
    config
        .filter(|p| enabled(p.enabled))
        .map(|p| p.endpoint.clone().unwrap_or_else(|| default.to_string()))
}

impl Feature for OtlpFeature {
    fn id(&self) -> FeatureId {
        FeatureId::Otlp
    }

    fn configure(&mut self, dda: &v2alpha1::DatadogAgent) -> RequiredComponents {
        let Some(features) = dda.features() else {
            return RequiredComponents::default();
        };
        self.owner = Owner::from_resource(dda);
        self.local_service = LocalServiceConfig::from_v2(dda);
        self.apm_enabled = features
            .apm
            .as_ref()
            .map(|a| enabled(a.enabled))
            .unwrap_or(false);
        self.required(features.otlp.as_ref())
    }

    fn configure_v1(&mut self, dda: &v1alpha1::DatadogAgent) -> RequiredComponents {
        self.owner = Owner::from_resource(dda);
        self.local_service = LocalServiceConfig::from_v1(dda);
        self.apm_enabled = dda
            .spec
            .agent
            .apm
            .as_ref()
            .map(|a| enabled(a.enabled))
            .unwrap_or(false);
        self.required(dda.spec.agent.otlp.as_ref())
    }

    fn manage_dependencies(
        &self,
        managers: &mut ResourceManagers,
        components: &RequiredComponents,
    ) -> Result<()> {
        let ports = self
            .endpoints()?
            .into_iter()
            .map(|(name, port, _, _)| ServicePort::tcp(name, port, port))
            .collect();
        if !components.node_agent.is_enabled() {
            return Ok(());
        }
        add_agent_local_service(managers, &self.owner, &self.local_service, ports)
    }

    fn manage_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        if self.apm_enabled {
            self.manage_agent(managers, &[ContainerName::CoreAgent, ContainerName::TraceAgent])
        } else {
            self.manage_agent(managers, &[ContainerName::CoreAgent])
        }
    }

    fn manage_single_container_node_agent(&self, managers: &mut PodTemplateManagers) -> Result<()> {
        self.manage_agent(managers, &[ContainerName::UnprivilegedSingleAgent])
    }
}
