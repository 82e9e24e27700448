use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::routes::{self, ServerState};
use service::BigQueryService;

fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load host/port from a validated config, or from `SERVER_HOST`/`SERVER_PORT`
/// env vars when no usable config exists, with sensible fallbacks
fn load_bind_addr(cfg: Option<&configs::ServerConfig>) -> anyhow::Result<SocketAddr> {
    let (host, port) = match cfg {
        Some(s) => (s.host.clone(), s.port),
        None => {
            let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            let port = env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8080);
            (host, port)
        }
    };
    Ok(format!("{}:{}", host, port).parse()?)
}

/// Resolve the application config. A missing or incomplete config is not
/// fatal: the console falls back to development mode with placeholder ids.
/// The flag reports whether a validated config was actually loaded.
fn load_config() -> (configs::AppConfig, bool) {
    match configs::AppConfig::load_and_validate() {
        Ok(cfg) => (cfg, true),
        Err(e) => {
            warn!(error = %e, "config incomplete; starting with development defaults");
            let mut cfg = configs::AppConfig::default();
            cfg.bigquery.project_id = "local-project".into();
            cfg.bigquery.dataset_id = "sample_dataset".into();
            (cfg, false)
        }
    }
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let (cfg, from_config) = load_config();
    let service = Arc::new(BigQueryService::from_config(&cfg.bigquery));
    if service.is_development() {
        warn!("no bigquery credentials; all operations return sample data");
    }
    let state = ServerState { service };

    let cors = build_cors();
    let app: Router = routes::build_router(state, cors);

    let addr = load_bind_addr(from_config.then_some(&cfg.server))?;
    info!(%addr, "starting bigquery console server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
