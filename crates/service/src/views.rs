//! Response shapes that join a record with its related records.

use models::{City, Customer};
use serde::Serialize;
use serde_json::Value;

/// A listed record: typed when it decodes, otherwise the stored JSON untouched,
/// so listings and counts always cover every stored child.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Listed<T> {
    Record(T),
    Raw(Value),
}

impl<T> Listed<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            Listed::Record(r) => Some(r),
            Listed::Raw(_) => None,
        }
    }
}

/// A customer with its linked city inlined, when that city resolves.
#[derive(Clone, Debug, Serialize)]
pub struct CustomerWithCity {
    #[serde(flatten)]
    pub customer: Customer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidade: Option<City>,
}

/// A city with every customer that references it.
#[derive(Clone, Debug, Serialize)]
pub struct CityWithCustomers {
    #[serde(flatten)]
    pub city: City,
    pub clientes: Vec<Listed<Customer>>,
    #[serde(rename = "totalClientes")]
    pub total_clientes: usize,
}

impl CityWithCustomers {
    pub fn new(city: City, clientes: Vec<Listed<Customer>>) -> Self {
        Self { total_clientes: clientes.len(), city, clientes }
    }
}

/// `GET /cidades/:id/clientes` body: the city's name and its customers.
#[derive(Clone, Debug, Serialize)]
pub struct CityCustomers {
    pub cidade: String,
    pub total: usize,
    pub clientes: Vec<Listed<Customer>>,
}

impl CityCustomers {
    pub fn new(city: &City, clientes: Vec<Listed<Customer>>) -> Self {
        Self { cidade: city.name.clone(), total: clientes.len(), clientes }
    }
}
