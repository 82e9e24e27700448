use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::client::BigQueryClient;
use crate::errors::ServiceError;

/// A result or insert row: column name -> JSON value.
pub type Row = serde_json::Map<String, Value>;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Integer,
    Float,
    String,
    Boolean,
    Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TableField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl TableField {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self { name: name.to_string(), field_type }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct TableSchema {
    pub fields: Vec<TableField>,
}

impl TableSchema {
    /// Fixed sample schema used by the console's create-table surface.
    pub fn sample() -> Self {
        Self {
            fields: vec![
                TableField::new("id", FieldType::Integer),
                TableField::new("name", FieldType::String),
                TableField::new("email", FieldType::String),
                TableField::new("created_at", FieldType::Timestamp),
            ],
        }
    }
}

/// Passthrough service over the warehouse API.
///
/// `client` is `None` when no credentials were available at startup; every
/// operation then answers with canned data so the console stays usable in
/// development.
pub struct BigQueryService {
    project_id: String,
    dataset_id: String,
    client: Option<BigQueryClient>,
}

impl BigQueryService {
    pub fn from_config(cfg: &configs::BigQueryConfig) -> Self {
        let client = match cfg.access_token.as_deref() {
            Some(token) if !token.trim().is_empty() => {
                match BigQueryClient::new(&cfg.api_base, token, &cfg.project_id, &cfg.dataset_id) {
                    Ok(c) => {
                        info!(project = %cfg.project_id, dataset = %cfg.dataset_id, "bigquery service initialized");
                        Some(c)
                    }
                    Err(e) => {
                        warn!(error = %e, "bigquery client init failed (normal in development)");
                        None
                    }
                }
            }
            _ => {
                info!(project = %cfg.project_id, dataset = %cfg.dataset_id, "bigquery service initialized in development mode");
                None
            }
        };
        Self { project_id: cfg.project_id.clone(), dataset_id: cfg.dataset_id.clone(), client }
    }

    /// Construct a service that always serves canned data.
    pub fn development(project_id: &str, dataset_id: &str) -> Self {
        info!(project = %project_id, dataset = %dataset_id, "bigquery service initialized in development mode");
        Self { project_id: project_id.to_string(), dataset_id: dataset_id.to_string(), client: None }
    }

    pub fn is_development(&self) -> bool {
        self.client.is_none()
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Run a SQL query and return its rows as JSON objects.
    pub async fn run_query(&self, sql: &str) -> Result<Vec<Row>, ServiceError> {
        if sql.trim().is_empty() {
            return Err(ServiceError::empty("sql query"));
        }

        let Some(client) = &self.client else {
            info!(%sql, "development mode: returning sample query result");
            return Ok(sample_query_result());
        };

        info!(%sql, "running bigquery query");
        let resp = client.query(sql).await.map_err(|e| {
            error!(error = %e, "bigquery query failed");
            ServiceError::from(e)
        })?;

        let names: Vec<String> = resp
            .schema
            .map(|s| s.fields.into_iter().map(|f| f.name).collect())
            .unwrap_or_default();
        let mut rows = Vec::with_capacity(resp.rows.len());
        for wire in resp.rows {
            let mut row = Row::new();
            for (name, cell) in names.iter().zip(wire.f) {
                row.insert(name.clone(), cell.v);
            }
            rows.push(row);
        }

        info!(count = rows.len(), "bigquery query complete");
        Ok(rows)
    }

    /// Create a table in the configured dataset. An already-existing table is
    /// tolerated (warn, then Ok), matching the console's idempotent UI flow.
    pub async fn create_table(&self, table_name: &str, schema: &TableSchema) -> Result<(), ServiceError> {
        if table_name.trim().is_empty() {
            return Err(ServiceError::empty("table name"));
        }
        if schema.fields.is_empty() {
            return Err(ServiceError::Validation("schema has no fields".into()));
        }

        let Some(client) = &self.client else {
            info!(table = %table_name, "development mode: simulated table create");
            return Ok(());
        };

        info!(project = %self.project_id, dataset = %self.dataset_id, table = %table_name, "creating bigquery table");
        match client.create_table(table_name, schema).await {
            Ok(()) => {
                info!(table = %table_name, "bigquery table created");
                Ok(())
            }
            Err(crate::client::ClientError::Api { status: 409, .. }) => {
                warn!(project = %self.project_id, dataset = %self.dataset_id, table = %table_name, "table already exists");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "bigquery table create failed");
                Err(e.into())
            }
        }
    }

    /// Insert rows into a table via the streaming API.
    pub async fn insert_rows(&self, table_name: &str, rows: &[Row]) -> Result<(), ServiceError> {
        if table_name.trim().is_empty() {
            return Err(ServiceError::empty("table name"));
        }
        if rows.is_empty() {
            return Err(ServiceError::empty("insert rows"));
        }

        let Some(client) = &self.client else {
            info!(table = %table_name, count = rows.len(), "development mode: simulated row insert");
            return Ok(());
        };

        info!(project = %self.project_id, dataset = %self.dataset_id, table = %table_name, count = rows.len(), "inserting rows");
        let resp = client.insert_all(table_name, rows).await.map_err(|e| {
            error!(error = %e, "bigquery insert failed");
            ServiceError::from(e)
        })?;

        // insertAll reports per-row failures with HTTP 200
        if !resp.insert_errors.is_empty() {
            let detail = resp
                .insert_errors
                .iter()
                .flat_map(|e| e.errors.iter())
                .filter_map(|p| p.message.clone())
                .collect::<Vec<_>>()
                .join("; ");
            error!(failed = resp.insert_errors.len(), %detail, "bigquery insert reported row errors");
            return Err(ServiceError::Backend(format!("insert reported row errors: {}", detail)));
        }

        info!(count = rows.len(), "bigquery insert complete");
        Ok(())
    }

    /// Delete a table. A missing table is tolerated (warn, then Ok).
    pub async fn delete_table(&self, table_name: &str) -> Result<(), ServiceError> {
        if table_name.trim().is_empty() {
            return Err(ServiceError::empty("table name"));
        }

        let Some(client) = &self.client else {
            info!(table = %table_name, "development mode: simulated table delete");
            return Ok(());
        };

        info!(project = %self.project_id, dataset = %self.dataset_id, table = %table_name, "deleting bigquery table");
        match client.delete_table(table_name).await {
            Ok(()) => {
                info!(table = %table_name, "bigquery table deleted");
                Ok(())
            }
            Err(crate::client::ClientError::Api { status: 404, .. }) => {
                warn!(project = %self.project_id, dataset = %self.dataset_id, table = %table_name, "table not found");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "bigquery table delete failed");
                Err(e.into())
            }
        }
    }

    /// List the names of all tables in the configured dataset.
    pub async fn list_tables(&self) -> Result<Vec<String>, ServiceError> {
        let Some(client) = &self.client else {
            info!("development mode: returning sample table list");
            return Ok(sample_table_names());
        };

        info!(project = %self.project_id, dataset = %self.dataset_id, "listing bigquery tables");
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = client.list_tables(page_token.as_deref()).await.map_err(|e| {
                error!(error = %e, "bigquery table list failed");
                ServiceError::from(e)
            })?;
            names.extend(
                page.tables
                    .into_iter()
                    .filter_map(|t| t.table_reference.map(|r| r.table_id)),
            );
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!(count = names.len(), "bigquery table list complete");
        Ok(names)
    }
}

/// Canned query result served in development mode.
fn sample_query_result() -> Vec<Row> {
    let mk = |id: i64, name: &str, email: &str, created_at: &str| {
        let mut row = Row::new();
        row.insert("id".into(), Value::from(id));
        row.insert("name".into(), Value::from(name));
        row.insert("email".into(), Value::from(email));
        row.insert("created_at".into(), Value::from(created_at));
        row
    };
    vec![
        mk(1, "Sample User 1", "sample1@example.com", "2023-01-01T00:00:00Z"),
        mk(2, "Sample User 2", "sample2@example.com", "2023-01-02T00:00:00Z"),
    ]
}

/// Canned table list served in development mode.
fn sample_table_names() -> Vec<String> {
    ["sample_table1", "sample_table2", "users", "products"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_service() -> BigQueryService {
        BigQueryService::development("local-project", "sample_dataset")
    }

    #[test]
    fn sample_schema_shape() {
        let schema = TableSchema::sample();
        assert_eq!(schema.fields.len(), 4);
        assert_eq!(schema.fields[0], TableField::new("id", FieldType::Integer));
        assert_eq!(schema.fields[3].field_type, FieldType::Timestamp);
    }

    #[test]
    fn field_type_wire_names() {
        let json = serde_json::to_value(TableSchema::sample()).expect("serialize schema");
        assert_eq!(json["fields"][0]["type"], "INTEGER");
        assert_eq!(json["fields"][1]["type"], "STRING");
        assert_eq!(json["fields"][3]["type"], "TIMESTAMP");
    }

    #[tokio::test]
    async fn run_query_rejects_blank_sql() {
        let svc = dev_service();
        let err = svc.run_query("   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn run_query_dev_mode_returns_samples() {
        let svc = dev_service();
        let rows = svc.run_query("SELECT * FROM users").await.expect("query ok");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Sample User 1");
        assert_eq!(rows[1]["email"], "sample2@example.com");
    }

    #[tokio::test]
    async fn create_table_rejects_blank_name_and_empty_schema() {
        let svc = dev_service();
        let schema = TableSchema::sample();
        assert!(matches!(
            svc.create_table("", &schema).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.create_table("users", &TableSchema::default()).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn insert_rows_rejects_empty_batch() {
        let svc = dev_service();
        assert!(matches!(
            svc.insert_rows("users", &[]).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.insert_rows(" ", &[Row::new()]).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn dev_mode_mutations_succeed_without_backend() {
        let svc = dev_service();
        assert!(svc.is_development());
        svc.create_table("events", &TableSchema::sample()).await.expect("create ok");
        svc.insert_rows("events", &[Row::new()]).await.expect("insert ok");
        svc.delete_table("events").await.expect("delete ok");
    }

    #[tokio::test]
    async fn list_tables_dev_mode_returns_samples() {
        let svc = dev_service();
        let tables = svc.list_tables().await.expect("list ok");
        assert_eq!(tables, vec!["sample_table1", "sample_table2", "users", "products"]);
    }
}
