use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::session::{session_cookie, AuthSession, SESSION_TTL};
use crate::{
    errors::AppError,
    models::user::PublicUser,
    responses::JsonResponse,
    state::AppState,
    utils::password::verify_password,
};

#[derive(Deserialize, Serialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// Unverified accounts may log in; `is_verified` is returned so the client can
// decide what to show.
pub async fn handle_login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginPayload>, AppError>,
) -> Result<Response, AppError> {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::invalid_input("Email and password are required"));
    }

    let Some(user) = app_state.db.find_user_by_email(email).await? else {
        return Err(AppError::invalid_input("User not found"));
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(AppError::invalid_input("Invalid credentials")),
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "stored password hash is unreadable");
            return Ok(JsonResponse::server_error("Internal error").into_response());
        }
    }

    let token = match app_state
        .session_keys
        .sign(&user, OffsetDateTime::now_utc(), SESSION_TTL)
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = ?e, "JWT creation failed");
            return Ok(JsonResponse::server_error("Token generation failed").into_response());
        }
    };

    tracing::info!(user_id = %user.id, "user logged in");
    let jar = jar.add(session_cookie(token, app_state.config.auth_cookie_secure));
    Ok((
        jar,
        Json(json!({
            "message": "Login successful",
            "success": true,
            "user": PublicUser::from(&user),
        })),
    )
        .into_response())
}

pub async fn handle_me(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<Response, AppError> {
    let user_id = Uuid::parse_str(&claims.id)
        .map_err(|_| AppError::Unauthorized("Invalid user ID".into()))?;

    match app_state.db.find_public_user_by_id(user_id).await? {
        Some(user) => Ok(Json(json!({
            "message": "User fetched successfully",
            "user": user,
        }))
        .into_response()),
        None => Err(AppError::not_found("User not found")),
    }
}
