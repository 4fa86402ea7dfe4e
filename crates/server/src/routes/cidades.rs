use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use models::{CreateCityInput, UpdateCityInput};
use service::views::{CityCustomers, CityWithCustomers};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    errors::{ApiError, AppJson},
    state::AppState,
};

#[utoipa::path(
    post, path = "/cidades", tag = "cidades",
    request_body = crate::openapi::CityInputDoc,
    responses(
        (status = 201, description = "Cidade criada"),
        (status = 400, description = "Campos ausentes ou inválidos", body = crate::openapi::ErrorBody),
        (status = 409, description = "ID já existe", body = crate::openapi::ErrorBody),
        (status = 500, description = "Erro interno", body = crate::openapi::ErrorBody)
    )
)]
pub async fn create(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateCityInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let cidade = state.cities.create(input).await?;
    Ok((StatusCode::CREATED, Json(json!({"mensagem": "Cidade criada com sucesso!", "cidade": cidade}))))
}

#[utoipa::path(
    get, path = "/cidades", tag = "cidades",
    responses(
        (status = 200, description = "Lista de cidades com total"),
        (status = 500, description = "Erro interno", body = crate::openapi::ErrorBody)
    )
)]
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let cidades = state.cities.list().await?;
    info!(count = cidades.len(), "list cities");
    Ok(Json(json!({"total": cidades.len(), "cidades": cidades})))
}

#[utoipa::path(
    get, path = "/cidades/{id}", tag = "cidades",
    params(("id" = String, Path, description = "City id")),
    responses(
        (status = 200, description = "Cidade com `clientes` e `totalClientes`"),
        (status = 404, description = "Cidade não encontrada", body = crate::openapi::ErrorBody)
    )
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<CityWithCustomers>, ApiError> {
    Ok(Json(state.cities.get_with_customers(&id).await?))
}

#[utoipa::path(
    put, path = "/cidades/{id}", tag = "cidades",
    params(("id" = String, Path, description = "City id")),
    request_body = crate::openapi::CityUpdateDoc,
    responses(
        (status = 200, description = "Cidade atualizada"),
        (status = 400, description = "Campo inválido", body = crate::openapi::ErrorBody),
        (status = 404, description = "Cidade não encontrada", body = crate::openapi::ErrorBody)
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(input): AppJson<UpdateCityInput>,
) -> Result<Json<Value>, ApiError> {
    let cidade = state.cities.update(&id, input).await?;
    Ok(Json(json!({"mensagem": "Cidade atualizada com sucesso!", "cidade": cidade})))
}

#[utoipa::path(
    delete, path = "/cidades/{id}", tag = "cidades",
    params(("id" = String, Path, description = "City id")),
    responses(
        (status = 200, description = "Cidade deletada"),
        (status = 400, description = "Há clientes vinculados", body = crate::openapi::LinkedErrorBody),
        (status = 404, description = "Cidade não encontrada", body = crate::openapi::ErrorBody)
    )
)]
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    state.cities.delete(&id).await?;
    Ok(Json(json!({"mensagem": "Cidade deletada com sucesso!"})))
}

#[utoipa::path(
    get, path = "/cidades/{id}/clientes", tag = "relacionais",
    params(("id" = String, Path, description = "City id")),
    responses(
        (status = 200, description = "Nome da cidade, total e clientes vinculados"),
        (status = 404, description = "Cidade não encontrada", body = crate::openapi::ErrorBody)
    )
)]
pub async fn customers(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<CityCustomers>, ApiError> {
    let view = state.cities.customers_of(&id).await?;
    info!(%id, total = view.total, "list city customers");
    Ok(Json(view))
}
