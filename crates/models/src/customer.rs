use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{errors::ModelError, fields, timestamp};

/// Stored customer record (`clientes/<id>`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(deserialize_with = "fields::stored::key")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "idade", deserialize_with = "fields::stored::int")]
    pub age: i64,
    #[serde(default, deserialize_with = "fields::stored::opt_text")]
    pub email: Option<String>,
    #[serde(default, rename = "telefone", deserialize_with = "fields::stored::opt_text")]
    pub phone: Option<String>,
    /// Soft reference to `cidades/<id>`.
    #[serde(default, rename = "cidadeId", deserialize_with = "fields::stored::opt_text")]
    pub city_id: Option<String>,
    #[serde(rename = "criadoEm", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizadoEm", with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Fields written by other clients; kept so updates do not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw `POST /clientes` body.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateCustomerInput {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, rename = "nome")]
    pub name: Option<Value>,
    #[serde(default, rename = "idade")]
    pub age: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default, rename = "telefone")]
    pub phone: Option<Value>,
    #[serde(default, rename = "cidadeId")]
    pub city_id: Option<Value>,
}

/// Validated create input.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCustomer {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city_id: Option<String>,
}

/// Raw `PUT /clientes/:id` body. The outer `Option` of the nullable fields
/// tells "absent" (keep) apart from an explicit `null` (clear).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateCustomerInput {
    #[serde(default, rename = "nome")]
    pub name: Option<Value>,
    #[serde(default, rename = "idade")]
    pub age: Option<Value>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub email: Option<Option<Value>>,
    #[serde(default, rename = "telefone", with = "::serde_with::rust::double_option")]
    pub phone: Option<Option<Value>>,
    #[serde(default, rename = "cidadeId", with = "::serde_with::rust::double_option")]
    pub city_id: Option<Option<Value>>,
}

/// Validated partial update; `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub city_id: Option<Option<String>>,
}

const REQUIRED: &str = "Campos obrigatórios: id, nome, idade";

fn opt(v: &Option<Value>) -> &Value {
    v.as_ref().unwrap_or(&Value::Null)
}

fn nullable<T>(
    v: &Option<Option<Value>>,
    coerce: impl Fn(&Value) -> Result<Option<T>, ModelError>,
) -> Result<Option<Option<T>>, ModelError> {
    match v {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(inner)) => coerce(inner).map(Some),
    }
}

impl CreateCustomerInput {
    pub fn validate(&self) -> Result<NewCustomer, ModelError> {
        let id = fields::text("id", opt(&self.id))?;
        let name = fields::text("nome", opt(&self.name))?;
        let age = fields::integer("idade", opt(&self.age))?;
        let (Some(id), Some(name), Some(age)) = (id, name, age) else {
            return Err(ModelError::validation(REQUIRED));
        };
        fields::validate_key(&id)?;
        Ok(NewCustomer {
            id,
            name,
            age,
            email: fields::text("email", opt(&self.email))?,
            phone: fields::text("telefone", opt(&self.phone))?,
            city_id: fields::key("cidadeId", opt(&self.city_id))?,
        })
    }
}

impl UpdateCustomerInput {
    pub fn validate(&self) -> Result<CustomerPatch, ModelError> {
        Ok(CustomerPatch {
            name: fields::text("nome", opt(&self.name))?,
            age: fields::integer("idade", opt(&self.age))?,
            email: nullable(&self.email, |v| fields::text("email", v))?,
            phone: nullable(&self.phone, |v| fields::text("telefone", v))?,
            city_id: nullable(&self.city_id, |v| fields::key("cidadeId", v))?,
        })
    }
}

impl CustomerPatch {
    /// City the patch links to, if it sets one.
    pub fn linked_city(&self) -> Option<&str> {
        self.city_id.as_ref().and_then(|c| c.as_deref())
    }
}

impl Customer {
    pub fn new(input: NewCustomer, now: DateTime<Utc>) -> Self {
        Self {
            id: input.id,
            name: input.name,
            age: input.age,
            email: input.email,
            phone: input.phone,
            city_id: input.city_id,
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }

    /// Merge a patch over the stored record and refresh `atualizadoEm`.
    pub fn apply(mut self, patch: CustomerPatch, now: DateTime<Utc>) -> Self {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(city_id) = patch.city_id {
            self.city_id = city_id;
        }
        self.updated_at = now;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(body: Value) -> Result<NewCustomer, ModelError> {
        serde_json::from_value::<CreateCustomerInput>(body).unwrap().validate()
    }

    fn patch(body: Value) -> CustomerPatch {
        serde_json::from_value::<UpdateCustomerInput>(body).unwrap().validate().unwrap()
    }

    fn stored() -> Customer {
        let input = create(json!({"id": "u1", "nome": "Alice", "idade": 30, "email": "a@x.io", "cidadeId": "c1"})).unwrap();
        Customer::new(input, timestamp::now())
    }

    #[test]
    fn create_requires_id_name_age() {
        for body in [
            json!({"nome": "Alice", "idade": 30}),
            json!({"id": "u1", "idade": 30}),
            json!({"id": "u1", "nome": "Alice"}),
            json!({"id": "", "nome": "Alice", "idade": 30}),
            json!({}),
        ] {
            assert_eq!(create(body).unwrap_err().to_string(), REQUIRED);
        }
    }

    #[test]
    fn create_coerces_and_defaults() {
        let c = create(json!({"id": 7, "nome": "Bob", "idade": "41"})).unwrap();
        assert_eq!(c.id, "7");
        assert_eq!(c.age, 41);
        assert_eq!(c.email, None);
        assert_eq!(c.phone, None);
        assert_eq!(c.city_id, None);
    }

    #[test]
    fn create_rejects_bad_keys_and_ages() {
        assert!(create(json!({"id": "a/b", "nome": "X", "idade": 1})).is_err());
        assert!(create(json!({"id": "u1", "nome": "X", "idade": 1, "cidadeId": "c.1"})).is_err());
        assert!(create(json!({"id": "u1", "nome": "X", "idade": "velho"})).is_err());
    }

    #[test]
    fn serializes_with_wire_names_and_nulls() {
        let mut c = stored();
        c.email = None;
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["nome"], "Alice");
        assert_eq!(v["idade"], 30);
        assert_eq!(v["cidadeId"], "c1");
        assert!(v["email"].is_null());
        assert!(v["telefone"].is_null());
        assert!(v["criadoEm"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn reads_records_missing_null_fields_and_keeps_extras() {
        let raw = json!({
            "id": "u9", "nome": "Eve", "idade": 22,
            "criadoEm": "2024-01-01T00:00:00.000Z",
            "atualizadoEm": "2024-01-02T00:00:00.000Z",
            "apelido": "evinha"
        });
        let c: Customer = serde_json::from_value(raw).unwrap();
        assert_eq!(c.email, None);
        assert_eq!(c.extra.get("apelido"), Some(&json!("evinha")));
        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["apelido"], "evinha");
    }

    #[test]
    fn empty_patch_only_touches_updated_at() {
        let before = stored();
        let later = before.updated_at + chrono::Duration::seconds(5);
        let after = before.clone().apply(patch(json!({})), later);
        assert_eq!(after.updated_at, later);
        assert_eq!(Customer { updated_at: before.updated_at, ..after }, before);
    }

    #[test]
    fn zero_age_is_applied_but_empty_name_is_ignored() {
        let after = stored().apply(patch(json!({"idade": 0, "nome": ""})), timestamp::now());
        assert_eq!(after.age, 0);
        assert_eq!(after.name, "Alice");
    }

    #[test]
    fn null_clears_and_absent_keeps() {
        let p = patch(json!({"email": null, "cidadeId": null}));
        assert_eq!(p.email, Some(None));
        assert_eq!(p.city_id, Some(None));
        assert_eq!(p.phone, None);
        assert_eq!(p.linked_city(), None);

        let after = stored().apply(p, timestamp::now());
        assert_eq!(after.email, None);
        assert_eq!(after.city_id, None);
    }

    #[test]
    fn patch_reports_linked_city() {
        assert_eq!(patch(json!({"cidadeId": "c2"})).linked_city(), Some("c2"));
        assert_eq!(patch(json!({"cidadeId": ""})).linked_city(), None);
    }

    #[test]
    fn stored_records_from_other_writers_decode() {
        let c: Customer = serde_json::from_value(json!({
            "id": 7, "nome": "Alice", "idade": "30", "telefone": 5551234, "cidadeId": "c1",
            "criadoEm": "2024-01-01T00:00:00.000Z", "atualizadoEm": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(c.id, "7");
        assert_eq!(c.age, 30);
        assert_eq!(c.phone.as_deref(), Some("5551234"));
        assert_eq!(c.email, None);

        let float_age: Customer = serde_json::from_value(json!({
            "id": "u2", "nome": "Bob", "idade": 41.0,
            "criadoEm": "2024-01-01T00:00:00.000Z", "atualizadoEm": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(float_age.age, 41);
    }
}
