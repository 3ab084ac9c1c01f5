use crate::types::PodTemplate;

pub struct AnnotationManager<'a> {
    template: &'a mut PodTemplate,
}

impl<'a> AnnotationManager<'a> {
    pub(crate) fn new(template: &'a mut PodTemplate) -> Self {
        Self { template }
    }

    /// Adds or overwrites `key`.
    pub fn add_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.template.annotations.set(key, value);
    }
}
