use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    errors::AppError, models::token::TokenPurpose, responses::JsonResponse,
    services::tokens::issue_token, state::AppState,
};

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

pub async fn handle_forgot_password(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ForgotPasswordRequest>, AppError>,
) -> Response {
    let db = &state.db;
    let email = payload.email.trim();

    match db.find_user_by_email(email).await {
        Ok(Some(user)) => {
            match issue_token(
                db.as_ref(),
                user.id,
                TokenPurpose::PasswordReset,
                OffsetDateTime::now_utc(),
            )
            .await
            {
                Err(e) => {
                    tracing::error!(user_id = %user.id, error = ?e, "failed to store password reset token");
                }
                Ok(token) => AppError::log_undelivered(
                    state.mailer.send_reset_email(&user.email, &token).await,
                    user.id,
                    "password_reset",
                ),
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = ?e, "error looking up user by email");
        }
    }

    JsonResponse::success("If that email exists, a reset link has been sent.").into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::db::mock_db::{test_user, MockDb};
    use crate::routes::users::test_support::{app, post_json};
    use crate::services::smtp_mailer::MockMailer;
    use crate::services::tokens::hash_token;

    #[tokio::test]
    async fn test_forgot_password_issues_reset_token() {
        let user = test_user("a@example.com", "hash");
        let id = user.id;
        let db = Arc::new(MockDb::with_user(user));
        let mailer = Arc::new(MockMailer::default());

        let res = app(db.clone(), mailer.clone())
            .oneshot(post_json("/forgot-password", json!({ "email": "a@example.com" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let token = mailer.last_reset_token().expect("reset email sent");
        assert_eq!(
            db.user(id).unwrap().forgot_password_token,
            Some(hash_token(&token))
        );
    }

    #[tokio::test]
    async fn test_forgot_password_hides_unknown_and_failing_cases() {
        let mailer = Arc::new(MockMailer::default());
        for db in [MockDb::default(), MockDb::failing()] {
            let res = app(Arc::new(db), mailer.clone())
                .oneshot(post_json("/forgot-password", json!({ "email": "ghost@example.com" })))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        assert!(mailer.sent_reset_emails.lock().unwrap().is_empty());
    }
}
