use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use models::{CreateCustomerInput, UpdateCustomerInput};
use service::views::CustomerWithCity;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    errors::{ApiError, AppJson},
    state::AppState,
};

#[utoipa::path(
    post, path = "/clientes", tag = "clientes",
    request_body = crate::openapi::CustomerInputDoc,
    responses(
        (status = 201, description = "Cliente criado"),
        (status = 400, description = "Campos ausentes, inválidos ou cidade inexistente", body = crate::openapi::ErrorBody),
        (status = 409, description = "ID já existe", body = crate::openapi::ErrorBody),
        (status = 500, description = "Erro interno", body = crate::openapi::ErrorBody)
    )
)]
pub async fn create(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateCustomerInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let cliente = state.customers.create(input).await?;
    Ok((StatusCode::CREATED, Json(json!({"mensagem": "Cliente criado com sucesso!", "cliente": cliente}))))
}

#[utoipa::path(
    get, path = "/clientes", tag = "clientes",
    responses(
        (status = 200, description = "Lista de clientes com total"),
        (status = 500, description = "Erro interno", body = crate::openapi::ErrorBody)
    )
)]
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let clientes = state.customers.list().await?;
    info!(count = clientes.len(), "list customers");
    Ok(Json(json!({"total": clientes.len(), "clientes": clientes})))
}

#[utoipa::path(
    get, path = "/clientes/{id}", tag = "clientes",
    params(("id" = String, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Cliente, com a cidade vinculada em `cidade`"),
        (status = 404, description = "Cliente não encontrado", body = crate::openapi::ErrorBody)
    )
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<CustomerWithCity>, ApiError> {
    Ok(Json(state.customers.get_with_city(&id).await?))
}

#[utoipa::path(
    put, path = "/clientes/{id}", tag = "clientes",
    params(("id" = String, Path, description = "Customer id")),
    request_body = crate::openapi::CustomerUpdateDoc,
    responses(
        (status = 200, description = "Cliente atualizado"),
        (status = 400, description = "Campo inválido ou cidade inexistente", body = crate::openapi::ErrorBody),
        (status = 404, description = "Cliente não encontrado", body = crate::openapi::ErrorBody)
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(input): AppJson<UpdateCustomerInput>,
) -> Result<Json<Value>, ApiError> {
    let cliente = state.customers.update(&id, input).await?;
    Ok(Json(json!({"mensagem": "Cliente atualizado com sucesso!", "cliente": cliente})))
}

#[utoipa::path(
    delete, path = "/clientes/{id}", tag = "clientes",
    params(("id" = String, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Cliente deletado"),
        (status = 404, description = "Cliente não encontrado", body = crate::openapi::ErrorBody)
    )
)]
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    state.customers.delete(&id).await?;
    Ok(Json(json!({"mensagem": "Cliente deletado com sucesso!"})))
}
