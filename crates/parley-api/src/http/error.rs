//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use parley_types::error::{CoordinatorError, StoreError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Coordinator(CoordinatorError),
    /// Malformed request input, caught before any store is touched.
    Validation(String),
}

impl From<CoordinatorError> for AppError {
    fn from(e: CoordinatorError) -> Self {
        AppError::Coordinator(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Coordinator(CoordinatorError::Store(e))
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

fn store_status(e: &StoreError) -> (StatusCode, &'static str) {
    match e {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        StoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        StoreError::Connectivity { .. } => (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE"),
        StoreError::Write { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "WRITE_FAILED"),
    }
}

impl AppError {
    /// Status, code, and optional structured details for this error.
    fn classify(&self) -> (StatusCode, &'static str, Option<serde_json::Value>) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::Coordinator(CoordinatorError::PartialCreate { chat_id, stage, .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PARTIAL_CREATE",
                Some(json!({ "chatId": chat_id, "stage": stage.to_string() })),
            ),
            AppError::Coordinator(CoordinatorError::Delete { stage, source }) => {
                let (status, code) = store_status(source);
                (status, code, Some(json!({ "stage": stage.to_string() })))
            }
            AppError::Coordinator(CoordinatorError::Store(e)) => {
                let (status, code) = store_status(e);
                (status, code, None)
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Coordinator(e) => write!(f, "{e}"),
            AppError::Validation(msg) => write!(f, "{msg}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.classify();
        if status.is_server_error() {
            tracing::warn!(code, error = %self, "Request failed");
        }
        (status, Json(ApiResponse::error(code, self.to_string(), details))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::chat::ChatId;
    use parley_types::error::StoreKind;

    #[test]
    fn test_store_errors_map_to_codes() {
        let cases = [
            (StoreError::not_found(StoreKind::Durable, "x"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                StoreError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                StoreError::connectivity(StoreKind::Volatile, "get", "refused"),
                StatusCode::SERVICE_UNAVAILABLE,
                "BACKEND_UNAVAILABLE",
            ),
            (
                StoreError::write(StoreKind::Graph, "create_chat", "constraint"),
                StatusCode::INTERNAL_SERVER_ERROR,
                "WRITE_FAILED",
            ),
        ];

        for (err, status, code) in cases {
            let (got_status, got_code, _) = AppError::from(err).classify();
            assert_eq!((got_status, got_code), (status, code));
        }
    }

    #[test]
    fn test_partial_create_carries_identity_and_stage() {
        let err = AppError::from(CoordinatorError::PartialCreate {
            chat_id: ChatId::from("abc"),
            stage: StoreKind::Volatile,
            source: StoreError::connectivity(StoreKind::Volatile, "create_chat", "refused"),
        });

        let (status, code, details) = err.classify();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "PARTIAL_CREATE");
        let details = details.unwrap();
        assert_eq!(details["chatId"], "abc");
        assert_eq!(details["stage"], "volatile");
    }
}
