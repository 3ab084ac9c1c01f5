use super::{key, DependencyStore};
use crate::types::ConfigMap;

pub struct ConfigMapManager<'a> {
    store: &'a mut DependencyStore,
}

impl<'a> ConfigMapManager<'a> {
    pub(crate) fn new(store: &'a mut DependencyStore) -> Self {
        Self { store }
    }

    /// Declares `config_map`, replacing any ConfigMap of the same name.
    pub fn add_config_map(&mut self, namespace: &str, config_map: ConfigMap) {
        self.store
            .config_maps
            .insert(key(namespace, &config_map.name), config_map);
    }
}
