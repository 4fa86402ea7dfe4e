use std::collections::BTreeMap;

use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub endpoints: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(ToSchema)]
pub struct ErrorBody { pub erro: String }

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct LinkedErrorBody { pub erro: String, pub clientesVinculados: u64 }

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct CustomerInputDoc {
    pub id: String,
    pub nome: String,
    pub idade: i64,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub cidadeId: Option<String>,
}

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct CustomerUpdateDoc {
    pub nome: Option<String>,
    pub idade: Option<i64>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub cidadeId: Option<String>,
}

#[derive(ToSchema)]
pub struct CityInputDoc {
    pub id: String,
    pub nome: String,
    pub estado: String,
    /// Defaults to "Brasil".
    pub pais: Option<String>,
    pub populacao: Option<i64>,
}

#[derive(ToSchema)]
pub struct CityUpdateDoc {
    pub nome: Option<String>,
    pub estado: Option<String>,
    pub pais: Option<String>,
    pub populacao: Option<i64>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::clientes::create,
        crate::routes::clientes::list,
        crate::routes::clientes::get,
        crate::routes::clientes::update,
        crate::routes::clientes::delete,
        crate::routes::cidades::create,
        crate::routes::cidades::list,
        crate::routes::cidades::get,
        crate::routes::cidades::update,
        crate::routes::cidades::delete,
        crate::routes::cidades::customers,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            LinkedErrorBody,
            CustomerInputDoc,
            CustomerUpdateDoc,
            CityInputDoc,
            CityUpdateDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "clientes"),
        (name = "cidades"),
        (name = "relacionais")
    )
)]
pub struct ApiDoc;
