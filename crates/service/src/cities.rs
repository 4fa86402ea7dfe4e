use std::sync::Arc;

use models::{timestamp, City, CreateCityInput, UpdateCityInput, CITIES};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    customers::{decode, decode_all, CustomerService},
    errors::ServiceError,
    storage::{child_path, DocumentStore, StoreError},
    views::{CityCustomers, CityWithCustomers, Listed},
};

const LINKED_CUSTOMERS: &str = "Não é possível deletar cidade com clientes vinculados";

/// City operations, including the customer lookups that guard deletes.
#[derive(Clone)]
pub struct CityService {
    store: Arc<dyn DocumentStore>,
    customers: CustomerService,
}

impl CityService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { customers: CustomerService::new(Arc::clone(&store)), store }
    }

    async fn find(&self, id: &str) -> Result<Option<City>, ServiceError> {
        if models::fields::validate_key(id).is_err() {
            return Ok(None);
        }
        match self.store.read(&child_path(CITIES, id)).await? {
            Some(value) => decode(CITIES, id, value).map(Some),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(backend = self.store.backend()))]
    pub async fn create(&self, input: CreateCityInput) -> Result<City, ServiceError> {
        let new = input.validate()?;
        let path = child_path(CITIES, &new.id);
        if self.store.read(&path).await?.is_some() {
            return Err(ServiceError::Conflict("Cidade com este ID já existe".into()));
        }

        let city = City::new(new, timestamp::now());
        let value = serde_json::to_value(&city).map_err(|e| StoreError::Decode(e.to_string()))?;
        if !self.store.create(&path, &value).await? {
            return Err(ServiceError::Conflict("Cidade com este ID já existe".into()));
        }
        info!(id = %city.id, "city created");
        Ok(city)
    }

    pub async fn list(&self) -> Result<Vec<Listed<City>>, ServiceError> {
        match self.store.read(CITIES).await? {
            Some(Value::Object(children)) => Ok(decode_all(CITIES, children)),
            Some(_) => Err(StoreError::Decode(format!("{CITIES} is not an object")).into()),
            None => Ok(Vec::new()),
        }
    }

    pub async fn get(&self, id: &str) -> Result<City, ServiceError> {
        self.find(id).await?.ok_or_else(ServiceError::city_not_found)
    }

    pub async fn get_with_customers(&self, id: &str) -> Result<CityWithCustomers, ServiceError> {
        let city = self.get(id).await?;
        let clientes = self.customers.by_city(id).await?;
        Ok(CityWithCustomers::new(city, clientes))
    }

    #[instrument(skip(self, input), fields(backend = self.store.backend()))]
    pub async fn update(&self, id: &str, input: UpdateCityInput) -> Result<City, ServiceError> {
        let existing = self.get(id).await?;
        let patch = input.validate()?;

        let updated = existing.apply(patch, timestamp::now());
        let value = serde_json::to_value(&updated).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.store.write(&child_path(CITIES, id), &value).await?;
        info!(%id, "city updated");
        Ok(updated)
    }

    /// Delete a city nobody references.
    #[instrument(skip(self), fields(backend = self.store.backend()))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.get(id).await?;
        let linked = self.customers.linked_count(id).await?;
        if linked > 0 {
            warn!(%id, linked, "delete blocked by linked customers");
            return Err(ServiceError::Integrity { message: LINKED_CUSTOMERS.into(), linked });
        }
        self.store.delete(&child_path(CITIES, id)).await?;
        info!(%id, "city deleted");
        Ok(())
    }

    pub async fn customers_of(&self, id: &str) -> Result<CityCustomers, ServiceError> {
        let city = self.get(id).await?;
        let clientes = self.customers.by_city(id).await?;
        Ok(CityCustomers::new(&city, clientes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed, service_store};
    use models::CreateCustomerInput;
    use serde_json::json;

    fn city_input(body: Value) -> CreateCityInput {
        serde_json::from_value(body).unwrap()
    }

    async fn add_customer(svc: &CityService, id: &str, city: Option<&str>) {
        let body = json!({"id": id, "nome": id, "idade": 20, "cidadeId": city});
        let input: CreateCustomerInput = serde_json::from_value(body).unwrap();
        svc.customers.create(input).await.unwrap();
    }

    #[tokio::test]
    async fn create_defaults_country_and_rejects_duplicates() -> Result<(), anyhow::Error> {
        let svc = CityService::new(service_store());
        let city = svc.create(city_input(json!({"id": "c1", "nome": "Springfield", "estado": "IL"}))).await?;
        assert_eq!(city.country, "Brasil");

        let err = svc.create(city_input(json!({"id": "c1", "nome": "Other", "estado": "SP"}))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Cidade com este ID já existe"));
        assert_eq!(svc.get("c1").await?.name, "Springfield");

        let err = svc.create(city_input(json!({"id": "c2", "nome": "Nowhere"}))).await.unwrap_err();
        assert_eq!(err.to_string(), "Campos obrigatórios: id, nome, estado");
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_blocked_while_customers_link_to_city() -> Result<(), anyhow::Error> {
        let svc = CityService::new(service_store());
        svc.create(city_input(json!({"id": "c1", "nome": "Springfield", "estado": "IL"}))).await?;
        add_customer(&svc, "u1", Some("c1")).await;
        add_customer(&svc, "u2", Some("c1")).await;

        match svc.delete("c1").await {
            Err(ServiceError::Integrity { message, linked }) => {
                assert_eq!(message, LINKED_CUSTOMERS);
                assert_eq!(linked, 2);
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
        assert!(svc.get("c1").await.is_ok());

        svc.customers.delete("u1").await?;
        svc.customers.delete("u2").await?;
        svc.delete("c1").await?;
        assert!(matches!(svc.get("c1").await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn relational_views_agree_with_linked_customers() -> Result<(), anyhow::Error> {
        let svc = CityService::new(service_store());
        svc.create(city_input(json!({"id": "c1", "nome": "Springfield", "estado": "IL"}))).await?;
        svc.create(city_input(json!({"id": "c2", "nome": "Shelbyville", "estado": "IL"}))).await?;
        add_customer(&svc, "u1", Some("c1")).await;
        add_customer(&svc, "u2", Some("c2")).await;
        add_customer(&svc, "u3", Some("c1")).await;
        add_customer(&svc, "u4", None).await;

        let view = svc.customers_of("c1").await?;
        assert_eq!(view.cidade, "Springfield");
        assert_eq!(view.total, view.clientes.len());
        assert_eq!(view.total, 2);

        let detail = svc.get_with_customers("c2").await?;
        assert_eq!(detail.total_clientes, 1);
        assert_eq!(detail.clientes[0].record().map(|c| c.id.as_str()), Some("u2"));

        assert!(matches!(svc.customers_of("ghost").await, Err(ServiceError::NotFound(ref m)) if m == "Cidade não encontrada"));
        Ok(())
    }

    #[tokio::test]
    async fn update_keeps_unsupplied_fields() -> Result<(), anyhow::Error> {
        let store = service_store();
        seed(&store, "cidades/c1", json!({
            "id": "c1", "nome": "Springfield", "estado": "IL",
            "criadoEm": "2024-01-01T00:00:00.000Z", "atualizadoEm": "2024-01-01T00:00:00.000Z",
            "prefeito": "Quimby"
        }))
        .await;
        let svc = CityService::new(store.clone());

        let input: UpdateCityInput = serde_json::from_value(json!({"populacao": "30720", "nome": ""}))?;
        let updated = svc.update("c1", input).await?;
        assert_eq!(updated.name, "Springfield");
        assert_eq!(updated.population, Some(30720));
        assert_eq!(updated.country, "Brasil");

        let stored = store.read("cidades/c1").await?.unwrap();
        assert_eq!(stored["prefeito"], "Quimby");
        assert_eq!(stored["criadoEm"], "2024-01-01T00:00:00.000Z");
        assert_ne!(stored["atualizadoEm"], "2024-01-01T00:00:00.000Z");
        Ok(())
    }

    #[tokio::test]
    async fn list_returns_every_city() -> Result<(), anyhow::Error> {
        let svc = CityService::new(service_store());
        assert!(svc.list().await?.is_empty());
        svc.create(city_input(json!({"id": "c2", "nome": "B", "estado": "X"}))).await?;
        svc.create(city_input(json!({"id": "c1", "nome": "A", "estado": "Y"}))).await?;
        let mut ids: Vec<_> = svc.list().await?.iter().filter_map(Listed::record).map(|c| c.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["c1", "c2"]);
        Ok(())
    }

    #[tokio::test]
    async fn delete_counts_customers_stored_by_other_writers() -> Result<(), anyhow::Error> {
        let store = service_store();
        let svc = CityService::new(store.clone());
        svc.create(city_input(json!({"id": "c1", "nome": "Springfield", "estado": "IL"}))).await?;
        seed(&store, "clientes/7", json!({
            "id": 7, "nome": "Alice", "idade": 30, "cidadeId": "c1",
            "criadoEm": "2024-01-01T00:00:00.000Z", "atualizadoEm": "2024-01-01T00:00:00.000Z"
        }))
        .await;
        seed(&store, "clientes/x", json!({"cidadeId": "c1", "nome": ["not", "text"]})).await;

        match svc.delete("c1").await {
            Err(ServiceError::Integrity { linked, .. }) => assert_eq!(linked, 2),
            other => panic!("expected integrity error, got {other:?}"),
        }
        assert!(store.read("cidades/c1").await?.is_some());

        let view = svc.customers_of("c1").await?;
        assert_eq!(view.total, 2);
        let alice = view.clientes.iter().find_map(Listed::record).expect("numeric id decodes");
        assert_eq!((alice.id.as_str(), alice.age), ("7", 30));
        assert_eq!(svc.get_with_customers("c1").await?.total_clientes, 2);
        Ok(())
    }
}
