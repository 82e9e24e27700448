use thiserror::Error;

use crate::client::ClientError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl ServiceError {
    pub fn empty(field: &str) -> Self {
        Self::Validation(format!("{} must not be empty", field))
    }
}

impl From<ClientError> for ServiceError {
    fn from(e: ClientError) -> Self {
        Self::Backend(e.to_string())
    }
}
