//! Consultation lifecycle and history handlers for the REST API.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use astroconsult_core::consultation::{ConsultationDetail, transition};
use astroconsult_types::chat::ChatMessage;
use astroconsult_types::consultation::{Consultation, ConsultationId, ConsultationType};
use astroconsult_types::error::ConsultationError;
use astroconsult_types::user::{User, UserId};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for POST /api/v1/consultations.
#[derive(Debug, Deserialize)]
pub struct CreateConsultationRequest {
    pub astrologer_id: UserId,
    #[serde(default)]
    pub consultation_type: ConsultationType,
}

/// A consultation with its history and the live elapsed minutes.
#[derive(Debug, Serialize)]
pub struct ConsultationView {
    #[serde(flatten)]
    pub detail: ConsultationDetail,
    pub elapsed_minutes: u32,
}

/// Unparseable ids are reported the same way as unknown ones.
fn parse_id(raw: &str) -> Result<ConsultationId, AppError> {
    raw.parse::<ConsultationId>()
        .map_err(|_| AppError::from(ConsultationError::NotFound))
}

fn consultation_response(
    consultation: Consultation,
    request_id: String,
    start: Instant,
) -> ApiResponse<Consultation> {
    let id = consultation.id;
    ApiResponse::success(consultation, request_id, start.elapsed().as_millis() as u64)
        .with_link("self", &format!("/api/v1/consultations/{id}"))
        .with_link("messages", &format!("/api/v1/consultations/{id}/messages"))
        .with_link("chat", &format!("/ws/chat/{id}"))
}

/// POST /api/v1/consultations - Open a consultation with an astrologer.
///
/// Chat consultations are started immediately when `auto_start_chat` is set.
pub async fn create_consultation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateConsultationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Consultation>>), AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let mut consultation = state
        .registry
        .create(&user, &body.astrologer_id, body.consultation_type)
        .await?;

    if consultation.consultation_type == ConsultationType::Chat && state.config.auto_start_chat {
        consultation = auto_start(&state, &user, consultation).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(consultation_response(consultation, request_id, start)),
    ))
}

/// Start a just-created consultation.
///
/// Creation has already committed, so a failed start is logged and the
/// pending row is returned; the client can retry `/start`.
async fn auto_start(state: &AppState, user: &User, created: Consultation) -> Consultation {
    match state.registry.start(user, &created.id).await {
        Ok(started) => started,
        Err(e) => {
            tracing::warn!(
                consultation_id = %created.id,
                error = %e,
                "auto-start failed, returning pending consultation"
            );
            created
        }
    }
}

/// GET /api/v1/consultations - Consultations the caller takes part in, newest first.
pub async fn list_consultations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<Consultation>>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let consultations = state.registry.list_mine(&user).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(
        ApiResponse::success(consultations, request_id, elapsed).with_link("self", "/api/v1/consultations"),
    ))
}

/// GET /api/v1/consultations/{id} - Consultation detail with chat history.
pub async fn get_consultation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ConsultationView>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();
    let id = parse_id(&id)?;

    let detail = state.registry.detail(&user, &id).await?;
    let elapsed_minutes = transition::elapsed_minutes(&detail.consultation, Utc::now());
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(
        ApiResponse::success(
            ConsultationView {
                detail,
                elapsed_minutes,
            },
            request_id,
            elapsed,
        )
        .with_link("self", &format!("/api/v1/consultations/{id}"))
        .with_link("chat", &format!("/ws/chat/{id}")),
    ))
}

/// POST /api/v1/consultations/{id}/start
pub async fn start_consultation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Consultation>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();
    let id = parse_id(&id)?;

    let consultation = state.registry.start(&user, &id).await?;
    Ok(Json(consultation_response(consultation, request_id, start)))
}

/// POST /api/v1/consultations/{id}/end - Complete and bill the consultation.
///
/// 403 for non-participants, 404 when unknown or not active.
pub async fn end_consultation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Consultation>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();
    let id = parse_id(&id)?;

    let consultation = state.registry.end(&user, &id).await.map_err(|e| match e {
        ConsultationError::StateConflict { expected, actual } => AppError::NotActive { expected, actual },
        other => AppError::from(other),
    })?;
    Ok(Json(consultation_response(consultation, request_id, start)))
}

/// POST /api/v1/consultations/{id}/cancel
pub async fn cancel_consultation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Consultation>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();
    let id = parse_id(&id)?;

    let consultation = state.registry.cancel(&user, &id).await?;
    Ok(Json(consultation_response(consultation, request_id, start)))
}

/// GET /api/v1/consultations/{id}/messages - Ordered chat history.
pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();
    let id = parse_id(&id)?;

    let messages = state.registry.history(&user, &id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(
        ApiResponse::success(messages, request_id, elapsed)
            .with_link("consultation", &format!("/api/v1/consultations/{id}")),
    ))
}
