use super::DependencyStore;
use crate::types::ApiService;

pub struct ApiServiceManager<'a> {
    store: &'a mut DependencyStore,
}

impl<'a> ApiServiceManager<'a> {
    pub(crate) fn new(store: &'a mut DependencyStore) -> Self {
        Self { store }
    }

    pub fn add_api_service(&mut self, api_service: ApiService) {
        self.store
            .api_services
            .insert(api_service.name.clone(), api_service);
    }
}
