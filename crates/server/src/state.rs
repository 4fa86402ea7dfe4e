use std::sync::Arc;

use service::{CityService, CustomerService, DocumentStore};

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub customers: CustomerService,
    pub cities: CityService,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { customers: CustomerService::new(Arc::clone(&store)), cities: CityService::new(store) }
    }
}
