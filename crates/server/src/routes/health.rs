use std::collections::BTreeMap;

use axum::Json;
use common::types::{Health, RouteMap};

fn route_map() -> RouteMap {
    let clientes = BTreeMap::from([
        ("GET /clientes", "Listar todos os clientes"),
        ("GET /clientes/:id", "Buscar cliente por ID"),
        ("POST /clientes", "Criar novo cliente"),
        ("PUT /clientes/:id", "Atualizar cliente"),
        ("DELETE /clientes/:id", "Deletar cliente"),
    ]);
    let cidades = BTreeMap::from([
        ("GET /cidades", "Listar todas as cidades"),
        ("GET /cidades/:id", "Buscar cidade por ID"),
        ("POST /cidades", "Criar nova cidade"),
        ("PUT /cidades/:id", "Atualizar cidade"),
        ("DELETE /cidades/:id", "Deletar cidade"),
    ]);
    let relacionais = BTreeMap::from([("GET /cidades/:id/clientes", "Buscar clientes de uma cidade")]);
    BTreeMap::from([("clientes", clientes), ("cidades", cidades), ("relacionais", relacionais)])
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service status and route map", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health::ok(route_map()))
}
