use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use time::OffsetDateTime;

use crate::{
    errors::AppError,
    models::{signup::SignupPayload, token::TokenPurpose},
    responses::JsonResponse,
    services::tokens::issue_token,
    state::AppState,
    utils::password::hash_password,
};

pub async fn handle_signup(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<SignupPayload>, AppError>,
) -> Result<Response, AppError> {
    let repo = &state.db;

    let mut payload = payload;
    payload.email = payload.email.trim().to_string();
    payload.username = payload.username.trim().to_string();

    if let Some(field) = payload.missing_field() {
        return Err(AppError::invalid_input(format!("{} is required", field)));
    }

    if repo.is_email_taken(&payload.email).await? {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return Ok(JsonResponse::server_error("Password hashing failed").into_response());
        }
    };

    let user_id = match repo.create_user(&payload, &password_hash).await {
        Ok(id) => id,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(AppError::Conflict("User already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(%user_id, "user created");

    let token = issue_token(
        repo.as_ref(),
        user_id,
        TokenPurpose::EmailVerification,
        OffsetDateTime::now_utc(),
    )
    .await?;

    AppError::log_undelivered(
        state
            .mailer
            .send_verification_email(&payload.email, &token)
            .await,
        user_id,
        "verification",
    );

    Ok(
        JsonResponse::created("User created successfully. Check your email to verify your account.")
            .into_response(),
    )
}
