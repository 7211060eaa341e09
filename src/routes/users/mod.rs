use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod claims;
pub mod forgot_password;
pub mod login;
pub mod logout;
pub mod resend_verification;
pub mod reset_password;
pub mod session;
pub mod signup;
pub mod verify;

pub use forgot_password::handle_forgot_password;
pub use login::{handle_login, handle_me};
pub use logout::handle_logout;
pub use resend_verification::resend_verification_email;
pub use reset_password::handle_reset_password;
pub use signup::handle_signup;
pub use verify::verify_email;

/// Routes mounted under `/users`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handle_signup))
        .route("/login", post(handle_login))
        .route("/logout", get(handle_logout).post(handle_logout))
        .route("/me", get(handle_me))
        .route("/verify-email", post(verify_email))
        .route("/resend-verification", post(resend_verification_email))
        .route("/forgot-password", post(handle_forgot_password))
        .route("/reset-password", post(handle_reset_password))
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, Response},
        Router,
    };
    use serde_json::Value;
    use std::sync::Arc;

    use crate::db::mock_db::MockDb;
    use crate::services::smtp_mailer::MockMailer;
    use crate::state::test_state;

    pub fn app(db: Arc<MockDb>, mailer: Arc<MockMailer>) -> Router {
        super::router().with_state(test_state(db, mailer))
    }

    pub fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn body_json(res: Response<Body>) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
