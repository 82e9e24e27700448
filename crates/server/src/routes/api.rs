use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use service::{Row, TableSchema};

use crate::errors::ApiError;
use crate::routes::ServerState;

#[derive(Debug, Deserialize)]
pub struct RunQueryParams {
    // Optional so a missing parameter still reaches the validation path and
    // gets the JSON error envelope instead of an extractor rejection
    #[serde(default)]
    pub sql: Option<String>,
}

/// GET /bigquery/api/query?sql=...
pub async fn run_query(
    State(state): State<ServerState>,
    Query(q): Query<RunQueryParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sql = q.sql.unwrap_or_default();
    info!(%sql, "query request received");
    let rows = state.service.run_query(&sql).await?;
    Ok(Json(json!({ "success": true, "rowCount": rows.len(), "data": rows })))
}

/// POST /bigquery/api/table/:table_name — create a table with the fixed
/// sample schema.
pub async fn create_table(
    State(state): State<ServerState>,
    Path(table_name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!(table = %table_name, "create table request received");
    state.service.create_table(&table_name, &TableSchema::sample()).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("table created: {}", table_name),
    })))
}

/// POST /bigquery/api/table/:table_name/data
pub async fn insert_rows(
    State(state): State<ServerState>,
    Path(table_name): Path<String>,
    Json(rows): Json<Vec<Row>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!(table = %table_name, count = rows.len(), "insert request received");
    state.service.insert_rows(&table_name, &rows).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} rows inserted", rows.len()),
    })))
}

/// DELETE /bigquery/api/table/:table_name
pub async fn delete_table(
    State(state): State<ServerState>,
    Path(table_name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!(table = %table_name, "delete table request received");
    state.service.delete_table(&table_name).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("table deleted: {}", table_name),
    })))
}

/// GET /bigquery/api/tables
pub async fn list_tables(
    State(state): State<ServerState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("table list request received");
    let tables = state.service.list_tables().await?;
    Ok(Json(json!({ "success": true, "tableCount": tables.len(), "tables": tables })))
}

/// GET /bigquery/api/health — probes the backend with a trivial query.
pub async fn health_check(
    State(state): State<ServerState>,
) -> (StatusCode, Json<serde_json::Value>) {
    info!("bigquery health check request received");
    match state.service.run_query("SELECT 1 as health_check").await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "success": true, "status": "BigQuery connection is healthy" })),
        ),
        Err(e) => {
            error!(error = %e, "bigquery health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "status": "BigQuery connection failed",
                    "error": e.to_string(),
                })),
            )
        }
    }
}
