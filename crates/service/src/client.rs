//! Thin HTTP client for the BigQuery v2 REST API.
//!
//! Only the handful of endpoints the console needs: `jobs.query`,
//! `tables.insert`, `tabledata.insertAll`, `tables.delete`, `tables.list`.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::bigquery::{Row, TableSchema};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Query response, reduced to the parts needed to rebuild row objects.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub schema: Option<WireSchema>,
    #[serde(default)]
    pub rows: Vec<WireRow>,
}

#[derive(Debug, Deserialize)]
pub struct WireSchema {
    #[serde(default)]
    pub fields: Vec<WireField>,
}

#[derive(Debug, Deserialize)]
pub struct WireField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

/// BigQuery encodes result rows as `{"f": [{"v": ...}, ...]}`, positionally
/// aligned with the schema fields.
#[derive(Debug, Deserialize)]
pub struct WireRow {
    #[serde(default)]
    pub f: Vec<WireCell>,
}

#[derive(Debug, Deserialize)]
pub struct WireCell {
    #[serde(default)]
    pub v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllResponse {
    #[serde(default)]
    pub insert_errors: Vec<InsertError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertError {
    pub index: Option<u64>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableListResponse {
    #[serde(default)]
    pub tables: Vec<TableListEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableListEntry {
    pub table_reference: Option<TableReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
    pub table_id: String,
}

pub struct BigQueryClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
    project_id: String,
    dataset_id: String,
}

impl BigQueryClient {
    pub fn new(
        api_base: &str,
        access_token: &str,
        project_id: &str,
        dataset_id: &str,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            project_id: project_id.to_string(),
            dataset_id: dataset_id.to_string(),
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn tables_url(&self) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables",
            self.api_base, self.project_id, self.dataset_id
        )
    }

    /// Map non-2xx responses into `ClientError::Api`, extracting the message
    /// from the standard `{"error": {"message": ...}}` body when present.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
            .unwrap_or(body);
        Err(ClientError::Api { status: status.as_u16(), message })
    }

    /// Run a synchronous query job (`jobs.query`).
    pub async fn query(&self, sql: &str) -> Result<QueryResponse, ClientError> {
        let url = format!("{}/projects/{}/queries", self.api_base, self.project_id);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&json!({ "query": sql, "useLegacySql": false }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json::<QueryResponse>().await?)
    }

    /// Create a table in the configured dataset (`tables.insert`).
    pub async fn create_table(&self, table_id: &str, schema: &TableSchema) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.tables_url())
            .header("Authorization", self.bearer())
            .json(&json!({
                "tableReference": {
                    "projectId": self.project_id,
                    "datasetId": self.dataset_id,
                    "tableId": table_id,
                },
                "schema": schema,
            }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Stream rows into a table (`tabledata.insertAll`).
    pub async fn insert_all(&self, table_id: &str, rows: &[Row]) -> Result<InsertAllResponse, ClientError> {
        let url = format!("{}/{}/insertAll", self.tables_url(), table_id);
        let wrapped: Vec<serde_json::Value> = rows.iter().map(|r| json!({ "json": r })).collect();
        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&json!({ "rows": wrapped }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json::<InsertAllResponse>().await?)
    }

    /// Delete a table (`tables.delete`).
    pub async fn delete_table(&self, table_id: &str) -> Result<(), ClientError> {
        let url = format!("{}/{}", self.tables_url(), table_id);
        let resp = self
            .http
            .delete(&url)
            .header("Authorization", self.bearer())
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// List one page of tables in the dataset (`tables.list`).
    pub async fn list_tables(&self, page_token: Option<&str>) -> Result<TableListResponse, ClientError> {
        let mut req = self.http.get(self.tables_url()).header("Authorization", self.bearer());
        if let Some(token) = page_token {
            req = req.query(&[("pageToken", token)]);
        }
        let resp = req.send().await?;
        Ok(Self::check(resp).await?.json::<TableListResponse>().await?)
    }
}
