use std::sync::Arc;

use models::{timestamp, City, CreateCustomerInput, Customer, UpdateCustomerInput, CITIES, CUSTOMERS};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::{
    errors::ServiceError,
    storage::{child_path, DocumentStore, StoreError},
    views::{CustomerWithCity, Listed},
};

const CITY_FIELD: &str = "cidadeId";

/// Decode a stored record, reporting which path held bad data.
pub(crate) fn decode<T: DeserializeOwned>(collection: &str, id: &str, value: Value) -> Result<T, ServiceError> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::Decode(format!("{}: {e}", child_path(collection, id))).into())
}

/// Decode every child of a collection snapshot. Children that do not parse are
/// passed through as stored, so nothing the store holds is hidden.
pub(crate) fn decode_all<T: DeserializeOwned>(collection: &str, children: Map<String, Value>) -> Vec<Listed<T>> {
    children
        .into_iter()
        .map(|(id, value)| match serde_json::from_value(value.clone()) {
            Ok(record) => Listed::Record(record),
            Err(e) => {
                warn!(%collection, %id, error = %e, "record does not match the expected shape");
                Listed::Raw(value)
            }
        })
        .collect()
}

/// Customer operations. City links are checked here since the store has no
/// foreign keys.
#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn DocumentStore>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn city_exists(&self, city_id: &str) -> Result<bool, ServiceError> {
        Ok(self.store.read(&child_path(CITIES, city_id)).await?.is_some())
    }

    async fn require_city(&self, city_id: Option<&str>) -> Result<(), ServiceError> {
        match city_id {
            Some(id) if !self.city_exists(id).await? => Err(ServiceError::Validation("Cidade não encontrada".into())),
            _ => Ok(()),
        }
    }

    async fn find(&self, id: &str) -> Result<Option<Customer>, ServiceError> {
        if models::fields::validate_key(id).is_err() {
            return Ok(None);
        }
        match self.store.read(&child_path(CUSTOMERS, id)).await? {
            Some(value) => decode(CUSTOMERS, id, value).map(Some),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(backend = self.store.backend()))]
    pub async fn create(&self, input: CreateCustomerInput) -> Result<Customer, ServiceError> {
        let new = input.validate()?;
        let path = child_path(CUSTOMERS, &new.id);
        if self.store.read(&path).await?.is_some() {
            return Err(ServiceError::Conflict("Cliente com este ID já existe".into()));
        }
        self.require_city(new.city_id.as_deref()).await?;

        let customer = Customer::new(new, timestamp::now());
        let value = serde_json::to_value(&customer).map_err(|e| StoreError::Decode(e.to_string()))?;
        // a concurrent create can still land between the read and here
        if !self.store.create(&path, &value).await? {
            return Err(ServiceError::Conflict("Cliente com este ID já existe".into()));
        }
        info!(id = %customer.id, city = ?customer.city_id, "customer created");
        Ok(customer)
    }

    pub async fn list(&self) -> Result<Vec<Listed<Customer>>, ServiceError> {
        match self.store.read(CUSTOMERS).await? {
            Some(Value::Object(children)) => Ok(decode_all(CUSTOMERS, children)),
            Some(_) => Err(StoreError::Decode(format!("{CUSTOMERS} is not an object")).into()),
            None => Ok(Vec::new()),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Customer, ServiceError> {
        self.find(id).await?.ok_or_else(ServiceError::customer_not_found)
    }

    /// The customer plus its city. A city that is gone or unreadable is left out.
    pub async fn get_with_city(&self, id: &str) -> Result<CustomerWithCity, ServiceError> {
        let customer = self.get(id).await?;
        let cidade = match customer.city_id.as_deref() {
            Some(city_id) => match self.store.read(&child_path(CITIES, city_id)).await {
                Ok(Some(value)) => decode::<City>(CITIES, city_id, value)
                    .map_err(|e| warn!(%id, %city_id, error = %e, "linked city unreadable"))
                    .ok(),
                Ok(None) => None,
                Err(e) => {
                    warn!(%id, %city_id, error = %e, "linked city lookup failed");
                    None
                }
            },
            None => None,
        };
        Ok(CustomerWithCity { customer, cidade })
    }

    #[instrument(skip(self, input), fields(backend = self.store.backend()))]
    pub async fn update(&self, id: &str, input: UpdateCustomerInput) -> Result<Customer, ServiceError> {
        let existing = self.get(id).await?;
        let patch = input.validate()?;
        self.require_city(patch.linked_city()).await?;

        let updated = existing.apply(patch, timestamp::now());
        let value = serde_json::to_value(&updated).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.store.write(&child_path(CUSTOMERS, id), &value).await?;
        info!(%id, "customer updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(backend = self.store.backend()))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.get(id).await?;
        self.store.delete(&child_path(CUSTOMERS, id)).await?;
        info!(%id, "customer deleted");
        Ok(())
    }

    /// How many stored customers reference `city_id`, decodable or not.
    pub async fn linked_count(&self, city_id: &str) -> Result<usize, ServiceError> {
        Ok(self.store.find_by_field(CUSTOMERS, CITY_FIELD, city_id).await?.len())
    }

    /// Customers whose `cidadeId` is `city_id`, one entry per stored child.
    pub async fn by_city(&self, city_id: &str) -> Result<Vec<Listed<Customer>>, ServiceError> {
        let hits = self.store.find_by_field(CUSTOMERS, CITY_FIELD, city_id).await?;
        Ok(decode_all(CUSTOMERS, hits))
    }
}
