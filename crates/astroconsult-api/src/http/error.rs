//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use astroconsult_types::consultation::ConsultationStatus;
use astroconsult_types::error::ConsultationError;

use crate::http::response::{ApiErrorDetail, ApiResponse};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Consultation lifecycle, billing and history errors.
    Consultation(ConsultationError),
    /// Ending a consultation that is not active. Reported as 404, with the
    /// observed status in `details` so "already ended" stays distinguishable.
    NotActive {
        expected: ConsultationStatus,
        actual: ConsultationStatus,
    },
    /// Missing or unknown bearer token.
    Unauthorized(String),
    Internal(String),
}

impl From<ConsultationError> for AppError {
    fn from(e: ConsultationError) -> Self {
        AppError::Consultation(e)
    }
}

impl AppError {
    /// HTTP status, machine-readable code, message and optional details.
    fn parts(&self) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
        match self {
            AppError::Consultation(e) => match e {
                ConsultationError::Validation { field, message } => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    message.clone(),
                    Some(json!({ "field": field })),
                ),
                ConsultationError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "You are not a participant of this consultation".to_string(),
                    None,
                ),
                ConsultationError::StateConflict { expected, actual } => (
                    StatusCode::CONFLICT,
                    "STATE_CONFLICT",
                    e.to_string(),
                    Some(json!({ "expected": expected, "actual": actual })),
                ),
                ConsultationError::NotFound => (
                    StatusCode::NOT_FOUND,
                    "CONSULTATION_NOT_FOUND",
                    "Consultation not found".to_string(),
                    None,
                ),
                ConsultationError::ExternalDependency(msg) => (
                    StatusCode::BAD_GATEWAY,
                    "EXTERNAL_DEPENDENCY_ERROR",
                    msg.clone(),
                    None,
                ),
                ConsultationError::Storage(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    e.to_string(),
                    None,
                ),
                ConsultationError::Timeout(_) => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    e.to_string(),
                    None,
                ),
            },
            AppError::NotActive { expected, actual } => (
                StatusCode::NOT_FOUND,
                "CONSULTATION_NOT_ACTIVE",
                format!("Consultation is not active (status: {actual})"),
                Some(json!({ "expected": expected, "actual": actual })),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
                None,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }

        let body = ApiResponse::failure(
            ApiErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
            uuid::Uuid::now_v7().to_string(),
            0,
        );
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn status_of(e: ConsultationError) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn test_consultation_errors_map_to_documented_statuses() {
        assert_eq!(
            status_of(ConsultationError::validation("astrologer_id", "Astrologer not found")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(ConsultationError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(ConsultationError::StateConflict {
                expected: ConsultationStatus::Active,
                actual: ConsultationStatus::Completed,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(ConsultationError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ConsultationError::ExternalDependency("down".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ConsultationError::Storage("disk".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ConsultationError::Timeout(Duration::from_secs(5))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_validation_error_carries_field_detail() {
        let (_, code, message, details) =
            AppError::from(ConsultationError::validation("astrologer_id", "Astrologer is not online")).parts();
        assert_eq!(code, "VALIDATION_ERROR");
        assert_eq!(message, "Astrologer is not online");
        assert_eq!(details, Some(json!({ "field": "astrologer_id" })));
    }

    #[test]
    fn test_not_active_is_404_with_statuses() {
        let err = AppError::NotActive {
            expected: ConsultationStatus::Active,
            actual: ConsultationStatus::Completed,
        };
        let (status, code, _, details) = err.parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "CONSULTATION_NOT_ACTIVE");
        assert_eq!(details, Some(json!({ "expected": "active", "actual": "completed" })));
    }

    #[test]
    fn test_state_conflict_reports_both_statuses() {
        let (_, _, _, details) = AppError::from(ConsultationError::StateConflict {
            expected: ConsultationStatus::Active,
            actual: ConsultationStatus::Completed,
        })
        .parts();
        assert_eq!(details, Some(json!({ "expected": "active", "actual": "completed" })));
    }
}
