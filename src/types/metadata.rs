use std::collections::BTreeMap;

use crate::component::{
    ComponentKind, LABEL_COMPONENT, LABEL_INSTANCE, LABEL_MANAGED_BY, LABEL_NAME,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels(pub BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Standard labels carried by every object rendered for an agent instance.
    pub fn for_component(owner_name: &str, component: ComponentKind) -> Self {
        Self::new()
            .insert(LABEL_NAME, owner_name)
            .insert(LABEL_COMPONENT, component.label_value())
            .insert(LABEL_INSTANCE, component.resource_name(owner_name))
            .insert(LABEL_MANAGED_BY, "datadog-operator")
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }

    pub(crate) fn into_option(self) -> Option<BTreeMap<String, String>> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotations(pub BTreeMap<String, String>);

impl Annotations {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Adds or overwrites `key` in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }

    pub(crate) fn into_option(self) -> Option<BTreeMap<String, String>> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0)
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Annotations
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector(pub BTreeMap<String, String>);

impl Selector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Selects the pods of one component of one agent instance.
    pub fn for_component(owner_name: &str, component: ComponentKind) -> Self {
        Self::new()
            .match_labels(LABEL_NAME, owner_name)
            .match_labels(LABEL_COMPONENT, component.label_value())
    }

    pub fn match_labels(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}
