use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use server::routes::{self, ServerState};
use service::BigQueryService;

struct TestApp {
    base_url: String,
}

/// Start the router on an ephemeral port with a development-mode service, so
/// every warehouse operation answers with canned data and no network access.
async fn start_server() -> anyhow::Result<TestApp> {
    let service = Arc::new(BigQueryService::development("local-project", "sample_dataset"));
    let state = ServerState { service };

    let app: Router = routes::build_router(state, CorsLayer::very_permissive());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });

    Ok(TestApp { base_url })
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn e2e_public_health() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/health", app.base_url)).send().await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn e2e_list_tables_returns_samples() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/bigquery/api/tables", app.base_url)).send().await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["tableCount"], 4);
    assert_eq!(body["tables"][0], "sample_table1");
    Ok(())
}

#[tokio::test]
async fn e2e_query_returns_sample_rows() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client()
        .get(format!("{}/bigquery/api/query", app.base_url))
        .query(&[("sql", "SELECT * FROM users")])
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["rowCount"], 2);
    assert_eq!(body["data"][0]["name"], "Sample User 1");
    Ok(())
}

#[tokio::test]
async fn e2e_blank_query_is_bad_request() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client()
        .get(format!("{}/bigquery/api/query", app.base_url))
        .query(&[("sql", "   ")])
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap_or_default().contains("empty"));
    Ok(())
}

#[tokio::test]
async fn e2e_missing_sql_param_gets_json_envelope() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/bigquery/api/query", app.base_url)).send().await?;
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap_or_default().contains("empty"));
    Ok(())
}

#[tokio::test]
async fn e2e_create_insert_delete_table() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let res = c.post(format!("{}/bigquery/api/table/events", app.base_url)).send().await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);

    let rows = json!([
        { "id": 1, "name": "alice", "email": "alice@example.com", "created_at": "2024-01-01T00:00:00Z" }
    ]);
    let res = c
        .post(format!("{}/bigquery/api/table/events/data", app.base_url))
        .json(&rows)
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap_or_default().contains("1 rows"));

    let res = c.delete(format!("{}/bigquery/api/table/events", app.base_url)).send().await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    Ok(())
}

#[tokio::test]
async fn e2e_insert_empty_batch_is_bad_request() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client()
        .post(format!("{}/bigquery/api/table/events/data", app.base_url))
        .json(&json!([]))
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn e2e_backend_health_probe() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/bigquery/api/health", app.base_url)).send().await?;
    // Development mode answers the probe query with sample data
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "BigQuery connection is healthy");
    Ok(())
}

#[tokio::test]
async fn e2e_console_page_lists_tables() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/", app.base_url)).send().await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let html = res.text().await?;
    assert!(html.contains("BigQuery Console"));
    assert!(html.contains("<li>sample_table1</li>"));
    assert!(html.contains("<li>products</li>"));
    Ok(())
}

#[tokio::test]
async fn e2e_console_query_form_renders_rows() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client()
        .post(format!("{}/execute-query", app.base_url))
        .form(&[("sql", "SELECT * FROM users")])
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let html = res.text().await?;
    assert!(html.contains("2 rows returned"));
    assert!(html.contains("Sample User 1"));
    Ok(())
}

#[tokio::test]
async fn e2e_console_query_form_shows_validation_error() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client()
        .post(format!("{}/execute-query", app.base_url))
        .form(&[("sql", "")])
        .send()
        .await?;
    // UI flow always re-renders the page; the failure shows as a banner
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let html = res.text().await?;
    assert!(html.contains("query failed"));
    assert!(html.contains("<li>sample_table1</li>"));
    Ok(())
}

#[tokio::test]
async fn e2e_console_create_and_delete_forms() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let res = c
        .post(format!("{}/create-table", app.base_url))
        .form(&[("table_name", "events")])
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let html = res.text().await?;
    assert!(html.contains("table &#39;events&#39; created"));

    let res = c
        .post(format!("{}/delete-table", app.base_url))
        .form(&[("table_name", "events")])
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let html = res.text().await?;
    assert!(html.contains("table &#39;events&#39; deleted"));
    Ok(())
}
