use crate::component::ContainerName;
use crate::types::{PodTemplate, SecurityContext};

pub struct SecurityContextManager<'a> {
    template: &'a mut PodTemplate,
}

impl<'a> SecurityContextManager<'a> {
    pub(crate) fn new(template: &'a mut PodTemplate) -> Self {
        Self { template }
    }

    /// Unions `capabilities` into the container's added capabilities.
    pub fn add_capabilities_to_container(&mut self, capabilities: &[&str], name: ContainerName) {
        let Some(container) = self.template.container_named_mut(name.as_str()) else {
            return;
        };
        let ctx = container
            .security_context
            .get_or_insert_with(SecurityContext::new);
        for capability in capabilities {
            if !ctx.has_capability(capability) {
                ctx.capabilities_add.push(capability.to_string());
            }
        }
    }
}
