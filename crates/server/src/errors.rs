use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use service::ServiceError;

/// REST error envelope: `{"success": false, "error": msg}` with the status
/// derived from the service error class (validation -> 400, backend -> 500).
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => {
                warn!(error = %msg, "invalid request parameter");
                Self { status: StatusCode::BAD_REQUEST, message: msg }
            }
            ServiceError::Backend(msg) => {
                error!(error = %msg, "bigquery operation failed");
                Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: msg }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
