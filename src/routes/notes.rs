use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use serde_json::json;

use crate::{
    errors::AppError, models::note::NotePayload, responses::JsonResponse, state::AppState,
};

const NOTE_NOT_FOUND: &str = "Note not found";
const NOTE_FIELDS_REQUIRED: &str = "Title and createdAt are required";

/// Routes mounted under `/notes`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notes).post(create_note))
        .route("/{note_id}", get(get_note).put(update_note).delete(delete_note))
}

pub async fn list_notes(State(state): State<AppState>) -> Result<Response, AppError> {
    let notes = state.note_repo.list_notes().await?;
    Ok(Json(json!({ "success": true, "data": notes })).into_response())
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
) -> Result<Response, AppError> {
    match state.note_repo.find_note(note_id).await? {
        Some(note) => Ok(Json(json!({ "success": true, "data": note })).into_response()),
        None => Err(AppError::not_found(NOTE_NOT_FOUND)),
    }
}

pub async fn create_note(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<NotePayload>, AppError>,
) -> Result<Response, AppError> {
    let note = payload
        .into_new_note()
        .ok_or_else(|| AppError::invalid_input(NOTE_FIELDS_REQUIRED))?;

    let id = state.note_repo.create_note(&note).await?;
    tracing::debug!(note_id = id, "note created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Note added successfully",
            "id": id,
        })),
    )
        .into_response())
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    WithRejection(Json(payload), _): WithRejection<Json<NotePayload>, AppError>,
) -> Result<Response, AppError> {
    let note = payload
        .into_new_note()
        .ok_or_else(|| AppError::invalid_input(NOTE_FIELDS_REQUIRED))?;

    match state.note_repo.update_note(note_id, &note).await? {
        Some(updated) => Ok(Json(json!({ "success": true, "data": updated })).into_response()),
        None => Err(AppError::not_found(NOTE_NOT_FOUND)),
    }
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
) -> Result<Response, AppError> {
    if state.note_repo.delete_note(note_id).await? {
        Ok(JsonResponse::success("Note deleted").into_response())
    } else {
        Err(AppError::not_found(NOTE_NOT_FOUND))
    }
}
