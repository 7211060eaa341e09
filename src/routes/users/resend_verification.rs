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

const RESEND_MESSAGE: &str =
    "If an account exists for that email, a verification link has been sent.";

#[derive(Deserialize)]
pub struct ResendVerificationPayload {
    #[serde(default)]
    pub email: String,
}

/// Issues a fresh verification token, which replaces any pending one. The
/// reply is identical whether or not the address is registered.
pub async fn resend_verification_email(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ResendVerificationPayload>, AppError>,
) -> Result<Response, AppError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::invalid_input("Email is required"));
    }

    let user = match state.db.find_user_by_email(email).await? {
        Some(user) if !user.is_verified => user,
        _ => return Ok(JsonResponse::success(RESEND_MESSAGE).into_response()),
    };

    let token = issue_token(
        state.db.as_ref(),
        user.id,
        TokenPurpose::EmailVerification,
        OffsetDateTime::now_utc(),
    )
    .await?;

    AppError::log_undelivered(
        state.mailer.send_verification_email(&user.email, &token).await,
        user.id,
        "verification",
    );

    Ok(JsonResponse::success(RESEND_MESSAGE).into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use time::OffsetDateTime;
    use tower::ServiceExt;

    use crate::db::mock_db::{test_user, MockDb};
    use crate::routes::users::test_support::{app, post_json};
    use crate::services::smtp_mailer::MockMailer;
    use crate::services::verification::{verify_email_token, VerifyError};

    #[tokio::test]
    async fn test_resend_replaces_pending_token() {
        let db = Arc::new(MockDb::with_user(test_user("a@example.com", "hash")));
        let mailer = Arc::new(MockMailer::default());
        let router = app(db.clone(), mailer.clone());

        for _ in 0..2 {
            let res = router
                .clone()
                .oneshot(post_json("/resend-verification", json!({ "email": "a@example.com" })))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        let sent = mailer.sent_verification_emails.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);

        let now = OffsetDateTime::now_utc();
        let stale = verify_email_token(&*db, &sent[0].1, now).await;
        assert!(matches!(stale, Err(VerifyError::InvalidOrExpiredToken)));
        verify_email_token(&*db, &sent[1].1, now).await.unwrap();
    }

    #[tokio::test]
    async fn test_resend_for_unknown_or_verified_user_sends_nothing() {
        let mut verified = test_user("done@example.com", "hash");
        verified.is_verified = true;
        let db = Arc::new(MockDb::with_user(verified));
        let mailer = Arc::new(MockMailer::default());
        let router = app(db, mailer.clone());

        for email in ["done@example.com", "ghost@example.com"] {
            let res = router
                .clone()
                .oneshot(post_json("/resend-verification", json!({ "email": email })))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        assert!(mailer.sent_verification_emails.lock().unwrap().is_empty());
    }
}
