//! Service layer: referential-integrity rules for customers and cities on top of
//! a pluggable hierarchical document store.
//! - `storage` defines the `DocumentStore` seam plus the Firebase and local backends.
//! - `customers` / `cities` hold the per-entity business operations.
//! - `views` are the joined response shapes.

pub mod errors;
pub mod storage;
pub mod customers;
pub mod cities;
pub mod views;

#[cfg(test)]
mod test_support;

pub use cities::CityService;
pub use customers::CustomerService;
pub use errors::ServiceError;
pub use storage::{DocumentStore, FirebaseStore, LocalStore, StoreError};
