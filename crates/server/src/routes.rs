use std::any::Any;

use axum::{
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, Level};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    observability::{self, INTERNAL_ERRORS_TOTAL},
    openapi::ApiDoc,
    state::AppState,
};

pub mod cidades;
pub mod clientes;
pub mod health;

/// Any origin, the four CRUD verbs, `Content-Type` only.
pub fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "handler panicked");
    INTERNAL_ERRORS_TOTAL.inc();
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"erro": "Erro interno do servidor"}))).into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"erro": "Rota não encontrada"}))).into_response()
}

/// Build the full application router: registry routes, health, metrics and API docs.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/clientes", get(clientes::list).post(clientes::create))
        .route("/clientes/:id", get(clientes::get).put(clientes::update).delete(clientes::delete))
        .route("/cidades", get(cidades::list).post(cidades::create))
        .route("/cidades/:id", get(cidades::get).put(cidades::update).delete(cidades::delete))
        .route("/cidades/:id/clientes", get(cidades::customers))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(observability::metrics))
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(observability::track_metrics))
        .layer(build_cors())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx and transport failures
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
