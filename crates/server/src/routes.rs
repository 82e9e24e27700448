use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::BigQueryService;

pub mod api;
pub mod ui;

#[derive(Clone)]
pub struct ServerState {
    pub service: Arc<BigQueryService>,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: liveness, server-rendered console,
/// and the REST API.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    // Server-rendered console, one form-post route per action
    let console = Router::new()
        .route("/", get(ui::console))
        .route("/execute-query", post(ui::execute_query))
        .route("/create-table", post(ui::create_table))
        .route("/delete-table", post(ui::delete_table));

    // REST API mirroring the console actions
    let rest = Router::new()
        .route("/bigquery/api/query", get(api::run_query))
        .route("/bigquery/api/tables", get(api::list_tables))
        .route(
            "/bigquery/api/table/:table_name",
            post(api::create_table).delete(api::delete_table),
        )
        .route("/bigquery/api/table/:table_name/data", post(api::insert_rows))
        .route("/bigquery/api/health", get(api::health_check));

    Router::new()
        .route("/health", get(health))
        .merge(console)
        .merge(rest)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
