//! Domain records for the registry: customers (`clientes`) and cities (`cidades`).
//!
//! Rust field names are English; the wire/storage names are the Portuguese ones
//! callers already use (`nome`, `idade`, `cidadeId`, ...).

pub mod errors;
pub mod fields;
pub mod timestamp;
pub mod customer;
pub mod city;

pub use city::{City, CityPatch, CreateCityInput, NewCity, UpdateCityInput};
pub use customer::{CreateCustomerInput, Customer, CustomerPatch, NewCustomer, UpdateCustomerInput};
pub use errors::ModelError;

/// Storage collection holding customer records, keyed by id.
pub const CUSTOMERS: &str = "clientes";
/// Storage collection holding city records, keyed by id.
pub const CITIES: &str = "cidades";
