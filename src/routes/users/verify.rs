use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    errors::AppError, responses::JsonResponse, services::verification::verify_email_token,
    state::AppState,
};

#[derive(Deserialize)]
pub struct VerifyEmailPayload {
    #[serde(default)]
    token: Option<String>,
}

pub async fn verify_email(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<VerifyEmailPayload>, AppError>,
) -> Result<Response, AppError> {
    let token = payload.token.unwrap_or_default();

    verify_email_token(state.db.as_ref(), &token, OffsetDateTime::now_utc()).await?;

    Ok(JsonResponse::success("Email verified successfully").into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;

    use crate::db::mock_db::{test_user, MockDb};
    use crate::routes::users::test_support::{app, body_json, post_json};
    use crate::services::smtp_mailer::MockMailer;
    use crate::services::tokens::hash_token;

    fn db_with_pending(token: &str, expires_in: Duration) -> (Arc<MockDb>, uuid::Uuid) {
        let mut user = test_user("verify@example.com", "hash");
        user.verify_token = Some(hash_token(token));
        user.verify_token_expiry = Some(OffsetDateTime::now_utc() + expires_in);
        let id = user.id;
        (Arc::new(MockDb::with_user(user)), id)
    }

    async fn verify(db: Arc<MockDb>, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let res = app(db, Arc::new(MockMailer::default()))
            .oneshot(post_json("/verify-email", body))
            .await
            .unwrap();
        let status = res.status();
        (status, body_json(res).await)
    }

    #[tokio::test]
    async fn test_verify_email_success_then_already_verified() {
        let (db, id) = db_with_pending("validtoken", Duration::hours(1));

        let (status, body) = verify(db.clone(), json!({ "token": "validtoken" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Email verified successfully");
        assert!(db.user(id).unwrap().is_verified);

        let (status, body) = verify(db, json!({ "token": "validtoken" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email already verified");
    }

    #[tokio::test]
    async fn test_verify_email_missing_token() {
        let (db, _) = db_with_pending("validtoken", Duration::hours(1));

        for body in [json!({}), json!({ "token": "" })] {
            let (status, body) = verify(db.clone(), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Invalid or missing token");
        }
    }

    #[tokio::test]
    async fn test_verify_email_invalid_token() {
        let (db, _) = db_with_pending("validtoken", Duration::hours(1));

        let (status, body) = verify(db, json!({ "token": "invalidtoken" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_verify_email_expired_token() {
        let (db, id) = db_with_pending("oldtoken", Duration::seconds(-1));

        let (status, body) = verify(db.clone(), json!({ "token": "oldtoken" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid or expired token");
        assert!(!db.user(id).unwrap().is_verified);
    }

    #[tokio::test]
    async fn test_verify_email_storage_error() {
        let (status, body) = verify(Arc::new(MockDb::failing()), json!({ "token": "x" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_verify_email_unparseable_bodies_get_json_400() {
        let requests = [
            post_json("/verify-email", json!({ "token": 123 })),
            Request::builder()
                .method("POST")
                .uri("/verify-email")
                .header("Content-Type", "application/json")
                .body(Body::empty())
                .unwrap(),
            Request::builder()
                .method("POST")
                .uri("/verify-email")
                .body(Body::from(r#"{"token":"abc"}"#))
                .unwrap(),
        ];

        for req in requests {
            let res = app(Arc::new(MockDb::default()), Arc::new(MockMailer::default()))
                .oneshot(req)
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            let body = body_json(res).await;
            assert_eq!(body["success"], false);
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }
}
