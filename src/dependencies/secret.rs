use super::{key, DependencyStore};
use crate::types::Secret;

pub struct SecretManager<'a> {
    store: &'a mut DependencyStore,
}

impl<'a> SecretManager<'a> {
    pub(crate) fn new(store: &'a mut DependencyStore) -> Self {
        Self { store }
    }

    /// Sets `key` in the Secret `namespace/name`, creating the Secret on first use.
    pub fn add_secret(
        &mut self,
        namespace: &str,
        name: &str,
        secret_key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.store
            .secrets
            .entry(key(namespace, name))
            .or_insert_with(|| Secret::opaque(name))
            .string_data
            .insert(secret_key.into(), value.into());
    }
}
