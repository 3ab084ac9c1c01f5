use crate::component::DEFAULT_IMAGE_REGISTRY;
use crate::error::{Error, Result};

pub const PROCESS_CHECKS_IN_CORE_AGENT_ENV: &str = "DD_OPERATOR_PROCESS_CHECKS_IN_CORE_AGENT";
pub const DEFAULT_REGISTRY_ENV: &str = "DD_OPERATOR_DEFAULT_REGISTRY";

/// Operator-wide settings handed to every feature constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureOptions {
    pub support_extended_daemonset: bool,
    pub process_checks_in_core_agent: bool,
    pub registry: String,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            support_extended_daemonset: false,
            process_checks_in_core_agent: false,
            registry: DEFAULT_IMAGE_REGISTRY.to_string(),
        }
    }
}

impl FeatureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`FeatureOptions::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(val) = lookup(PROCESS_CHECKS_IN_CORE_AGENT_ENV) {
            options.process_checks_in_core_agent = val.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!(
                    "Invalid {PROCESS_CHECKS_IN_CORE_AGENT_ENV}: {val:?}"
                ))
            })?;
        }

        if let Some(val) = lookup(DEFAULT_REGISTRY_ENV) {
            if !val.trim().is_empty() {
                options.registry = val.trim().to_string();
            }
        }

        Ok(options)
    }

    pub fn support_extended_daemonset(mut self, value: bool) -> Self {
        self.support_extended_daemonset = value;
        self
    }

    pub fn process_checks_in_core_agent(mut self, value: bool) -> Self {
        self.process_checks_in_core_agent = value;
        self
    }

    pub fn registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }
}
