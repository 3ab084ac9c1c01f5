use super::MergeStrategy;
use crate::component::ContainerName;
use crate::error::{Error, Result};
use crate::types::{Container, EnvVar, PodTemplate};

pub struct EnvVarManager<'a> {
    template: &'a mut PodTemplate,
}

impl<'a> EnvVarManager<'a> {
    pub(crate) fn new(template: &'a mut PodTemplate) -> Self {
        Self { template }
    }

    /// Adds `var` to every regular container that does not define it yet.
    pub fn add_env_var(&mut self, var: EnvVar) {
        for container in &mut self.template.containers {
            keep_existing(container, &var);
        }
    }

    pub fn add_env_var_to_container(&mut self, name: ContainerName, var: EnvVar) {
        if let Some(container) = self.template.container_named_mut(name.as_str()) {
            keep_existing(container, &var);
        }
    }

    pub fn add_env_var_to_containers(&mut self, names: &[ContainerName], var: EnvVar) {
        for name in names {
            self.add_env_var_to_container(*name, var.clone());
        }
    }

    pub fn add_env_var_to_init_container(&mut self, name: ContainerName, var: EnvVar) {
        if let Some(container) = self.template.init_container_named_mut(name.as_str()) {
            keep_existing(container, &var);
        }
    }

    pub fn add_env_var_with_merge(&mut self, var: EnvVar, strategy: MergeStrategy) -> Result<()> {
        for container in &mut self.template.containers {
            merge_env_var(container, var.clone(), strategy)?;
        }
        Ok(())
    }

    pub fn add_env_var_to_container_with_merge(
        &mut self,
        name: ContainerName,
        var: EnvVar,
        strategy: MergeStrategy,
    ) -> Result<()> {
        match self.template.container_named_mut(name.as_str()) {
            Some(container) => merge_env_var(container, var, strategy),
            None => Ok(()),
        }
    }
}

fn keep_existing(container: &mut Container, var: &EnvVar) {
    if container.find_env(var.name()).is_none() {
        container.env.push(var.clone());
    }
}

pub(crate) fn merge_env_var(
    container: &mut Container,
    var: EnvVar,
    strategy: MergeStrategy,
) -> Result<()> {
    let Some(idx) = container.env.iter().position(|e| e.name() == var.name()) else {
        container.env.push(var);
        return Ok(());
    };

    match strategy {
        MergeStrategy::KeepExisting => {}
        MergeStrategy::Override => container.env[idx] = var,
        MergeStrategy::AppendToValue => {
            let current = &container.env[idx];
            let (Some(existing), Some(added)) = (current.literal(), var.literal()) else {
                return Err(Error::MergeConflict(format!(
                    "cannot append to env var {} in container {}: value comes from a reference",
                    var.name(),
                    container.name
                )));
            };
            let mut tokens: Vec<&str> = existing.split_whitespace().collect();
            for token in added.split_whitespace() {
                if !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
            container.env[idx] = EnvVar::value(var.name(), tokens.join(" "));
        }
        MergeStrategy::Error => {
            if container.env[idx] != var {
                return Err(Error::MergeConflict(format!(
                    "env var {} already set in container {}",
                    var.name(),
                    container.name
                )));
            }
        }
    }
    Ok(())
}
