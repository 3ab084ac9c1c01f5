use crate::component::ContainerName;
use crate::types::{ContainerPort, PodTemplate};

pub struct PortManager<'a> {
    template: &'a mut PodTemplate,
}

impl<'a> PortManager<'a> {
    pub(crate) fn new(template: &'a mut PodTemplate) -> Self {
        Self { template }
    }

    /// Adds `port` unless the container already exposes a port with the same name.
    pub fn add_port_to_container(&mut self, name: ContainerName, port: ContainerPort) {
        let Some(container) = self.template.container_named_mut(name.as_str()) else {
            tracing::debug!(container = %name, port = %port.name, "Container absent, port skipped");
            return;
        };
        if container.find_port(&port.name).is_none() {
            container.ports.push(port);
        }
    }
}
