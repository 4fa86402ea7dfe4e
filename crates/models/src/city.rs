use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{errors::ModelError, fields, timestamp};

pub const DEFAULT_COUNTRY: &str = "Brasil";

fn default_country() -> String { DEFAULT_COUNTRY.to_string() }

/// Stored city record (`cidades/<id>`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(deserialize_with = "fields::stored::key")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "estado")]
    pub state: String,
    #[serde(rename = "pais", default = "default_country")]
    pub country: String,
    #[serde(default, rename = "populacao", deserialize_with = "fields::stored::opt_int")]
    pub population: Option<i64>,
    #[serde(rename = "criadoEm", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizadoEm", with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw `POST /cidades` body.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateCityInput {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, rename = "nome")]
    pub name: Option<Value>,
    #[serde(default, rename = "estado")]
    pub state: Option<Value>,
    #[serde(default, rename = "pais")]
    pub country: Option<Value>,
    #[serde(default, rename = "populacao")]
    pub population: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewCity {
    pub id: String,
    pub name: String,
    pub state: String,
    pub country: String,
    pub population: Option<i64>,
}

/// Raw `PUT /cidades/:id` body; every field is optional.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateCityInput {
    #[serde(default, rename = "nome")]
    pub name: Option<Value>,
    #[serde(default, rename = "estado")]
    pub state: Option<Value>,
    #[serde(default, rename = "pais")]
    pub country: Option<Value>,
    #[serde(default, rename = "populacao")]
    pub population: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CityPatch {
    pub name: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub population: Option<i64>,
}

const REQUIRED: &str = "Campos obrigatórios: id, nome, estado";

fn opt(v: &Option<Value>) -> &Value {
    v.as_ref().unwrap_or(&Value::Null)
}

impl CreateCityInput {
    pub fn validate(&self) -> Result<NewCity, ModelError> {
        let id = fields::text("id", opt(&self.id))?;
        let name = fields::text("nome", opt(&self.name))?;
        let state = fields::text("estado", opt(&self.state))?;
        let (Some(id), Some(name), Some(state)) = (id, name, state) else {
            return Err(ModelError::validation(REQUIRED));
        };
        fields::validate_key(&id)?;
        Ok(NewCity {
            id,
            name,
            state,
            country: fields::text("pais", opt(&self.country))?.unwrap_or_else(default_country),
            population: fields::integer("populacao", opt(&self.population))?,
        })
    }
}

impl UpdateCityInput {
    pub fn validate(&self) -> Result<CityPatch, ModelError> {
        Ok(CityPatch {
            name: fields::text("nome", opt(&self.name))?,
            state: fields::text("estado", opt(&self.state))?,
            country: fields::text("pais", opt(&self.country))?,
            population: fields::integer("populacao", opt(&self.population))?,
        })
    }
}

impl City {
    pub fn new(input: NewCity, now: DateTime<Utc>) -> Self {
        Self {
            id: input.id,
            name: input.name,
            state: input.state,
            country: input.country,
            population: input.population,
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }

    pub fn apply(mut self, patch: CityPatch, now: DateTime<Utc>) -> Self {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(country) = patch.country {
            self.country = country;
        }
        if let Some(population) = patch.population {
            self.population = Some(population);
        }
        self.updated_at = now;
        self
    }
}
