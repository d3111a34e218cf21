use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::ServiceError;
use crate::server::database::Database;

/// Shared application state for handlers.
///
/// Right now this only wraps the database handle, but later additions
/// (config snapshot, metrics handles) can land here without touching every
/// handler signature. The handle is constructed by the entry point and
/// injected; handlers never reach for globals.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

/// Standard error response body for infrastructure failures.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    pub error: String,
}

/// Map internal ServiceError into an HTTP response Axum understands.
///
/// This lets handlers return:
///   Result<Json<T>, ServiceError>
/// and Axum will convert both success and error into HTTP responses.
/// Domain errors carry their own IntoResponse impls; everything landing here
/// is an infrastructure failure and maps to a 5xx.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::ConfigError(_) | ServiceError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Liveness response for `GET /`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Handler for `GET /`.
///
/// Plain liveness probe; does not touch the store.
pub async fn root_handler() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_reports_ok() {
        let response = root_handler().await;
        assert_eq!(response.0.status, "ok");
    }

    #[test]
    fn service_error_maps_to_500() {
        let response = ServiceError::DatabaseError("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
