use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bigquery: BigQueryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Connection settings for the warehouse backend.
/// `access_token` is optional on purpose: without one the service runs in
/// development mode and serves canned data.
#[derive(Debug, Clone, Deserialize)]
pub struct BigQueryConfig {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset_id: String::new(),
            api_base: default_api_base(),
            access_token: None,
        }
    }
}

fn default_api_base() -> String {
    "https://bigquery.googleapis.com/bigquery/v2".to_string()
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default().unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.bigquery.normalize_from_env();
        self.bigquery.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 {
                self.worker_threads = Some(4);
            }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl BigQueryConfig {
    /// Fill unset fields from environment variables.
    pub fn normalize_from_env(&mut self) {
        if self.project_id.trim().is_empty() {
            if let Ok(v) = std::env::var("BIGQUERY_PROJECT_ID") {
                self.project_id = v;
            }
        }
        if self.dataset_id.trim().is_empty() {
            if let Ok(v) = std::env::var("BIGQUERY_DATASET_ID") {
                self.dataset_id = v;
            }
        }
        if self.access_token.is_none() {
            if let Ok(v) = std::env::var("BIGQUERY_ACCESS_TOKEN") {
                if !v.trim().is_empty() {
                    self.access_token = Some(v);
                }
            }
        }
        if let Ok(v) = std::env::var("BIGQUERY_API_BASE") {
            if !v.trim().is_empty() {
                self.api_base = v;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(anyhow!(
                "bigquery.project_id is empty; set it in config.toml or BIGQUERY_PROJECT_ID"
            ));
        }
        if self.dataset_id.trim().is_empty() {
            return Err(anyhow!(
                "bigquery.dataset_id is empty; set it in config.toml or BIGQUERY_DATASET_ID"
            ));
        }
        let lower = self.api_base.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("bigquery.api_base must start with http:// or https://"));
        }
        Ok(())
    }
}
