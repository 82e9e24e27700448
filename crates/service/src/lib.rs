//! Service layer wrapping the BigQuery v2 REST API.
//! - One method per warehouse operation, validation first, then delegation.
//! - Runs in development mode (canned data) when no credentials are available.
//! - Provides clear error types for the HTTP layer to map onto statuses.

pub mod bigquery;
pub mod client;
pub mod errors;

pub use bigquery::{BigQueryService, FieldType, Row, TableField, TableSchema};
pub use errors::ServiceError;
