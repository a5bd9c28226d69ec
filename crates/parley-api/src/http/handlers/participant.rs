//! Participant edge HTTP handlers.
//!
//! Endpoints:
//! - PUT    /api/v1/persons/{person_id}                - Register a person
//! - POST   /api/v1/participants                    - Link a person to a chat
//! - DELETE /api/v1/participants                    - Unlink a person from a chat
//! - GET    /api/v1/participants/{person_id}/chats  - Chats a person takes part in

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};

use parley_types::chat::{ChatSummary, ParticipantLink, PersonId};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

fn validate(link: &ParticipantLink) -> Result<(), AppError> {
    if link.person_id.as_str().is_empty() || link.chat_id.as_str().is_empty() {
        return Err(AppError::Validation(
            "personElementId and chatElementId must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// PUT /api/v1/persons/{person_id} - Register a person. Idempotent.
pub async fn register_person(
    State(state): State<AppState>,
    Path(person_id): Path<String>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let timer = RequestTimer::start();
    if person_id.is_empty() {
        return Err(AppError::Validation("personElementId must not be empty".to_string()));
    }
    let person_id = PersonId::from(person_id);

    state.coordinator.register_person(&person_id).await?;

    Ok(Json(timer.finish(format!("Person {person_id} registered"))))
}

/// POST /api/v1/participants - Link a person to a chat.
pub async fn add_participant(
    State(state): State<AppState>,
    payload: Result<Json<ParticipantLink>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let timer = RequestTimer::start();
    let Json(link) = payload?;
    validate(&link)?;

    let status = state.coordinator.add_person_to_chat(&link).await?;

    Ok(Json(timer.finish(status)))
}

/// DELETE /api/v1/participants - Unlink a person from a chat.
pub async fn remove_participant(
    State(state): State<AppState>,
    payload: Result<Json<ParticipantLink>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let timer = RequestTimer::start();
    let Json(link) = payload?;
    validate(&link)?;

    let status = state.coordinator.remove_person_from_chat(&link).await?;

    Ok(Json(timer.finish(status)))
}

/// GET /api/v1/participants/{person_id}/chats - List a person's chats.
pub async fn list_chats_for_person(
    State(state): State<AppState>,
    Path(person_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChatSummary>>>, AppError> {
    let timer = RequestTimer::start();
    let person_id = PersonId::from(person_id);

    let chats = state.coordinator.get_chats_for_person(&person_id).await?;

    Ok(Json(timer.finish(chats)))
}
