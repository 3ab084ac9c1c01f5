use std::collections::btree_map::Entry;

use super::{key, DependencyStore};
use crate::error::{Error, Result};
use crate::types::Service;

pub struct ServiceManager<'a> {
    store: &'a mut DependencyStore,
}

impl<'a> ServiceManager<'a> {
    pub(crate) fn new(store: &'a mut DependencyStore) -> Self {
        Self { store }
    }

    /// Declares `service`, merging its ports into an already declared Service of the same name.
    ///
    /// A port reusing an existing port name with a different number is a conflict.
    pub fn add_service(&mut self, namespace: &str, service: Service) -> Result<()> {
        let existing = match self.store.services.entry(key(namespace, &service.name)) {
            Entry::Vacant(slot) => {
                slot.insert(service);
                return Ok(());
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        for port in service.ports {
            let bound = existing.find_port(&port.name).map(|p| (p == &port, p.port));
            match bound {
                Some((true, _)) => {}
                Some((false, current)) => {
                    return Err(Error::MergeConflict(format!(
                        "service {namespace}/{} port {} already bound to {current}",
                        existing.name, port.name
                    )));
                }
                None => existing.ports.push(port),
            }
        }
        if service.internal_traffic_policy.is_some() {
            existing.internal_traffic_policy = service.internal_traffic_policy;
        }
        existing.labels.0.extend(service.labels.0);
        Ok(())
    }
}
