use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    errors::AppError, responses::JsonResponse, services::tokens::hash_token, state::AppState,
    utils::password::hash_password,
};

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    token: String,
    #[serde(default)]
    password: String,
}

pub async fn handle_reset_password(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ResetPasswordRequest>, AppError>,
) -> Result<Response, AppError> {
    let token = payload.token.trim();
    if token.is_empty() || payload.password.is_empty() {
        return Err(AppError::invalid_input("Token and password are required"));
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return Ok(JsonResponse::server_error("Internal server error").into_response());
        }
    };

    match state
        .db
        .reset_password_with_token(&hash_token(token), &password_hash, OffsetDateTime::now_utc())
        .await?
    {
        Some(user_id) => {
            tracing::info!(%user_id, "password reset");
            Ok(JsonResponse::success("Password has been reset.").into_response())
        }
        None => Err(AppError::invalid_input("Invalid or expired token")),
    }
}
