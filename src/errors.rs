use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::responses::JsonResponse;
use crate::services::{smtp_mailer::MailError, verification::VerifyError};

/// Failures a request handler can end in.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),
    /// Never returned from a handler; see [`AppError::log_undelivered`].
    #[error("mail delivery failed: {0}")]
    DeliveryFailed(#[from] MailError),
}

impl AppError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Mail is best-effort: a failed send is logged and the request goes on.
    pub fn log_undelivered(result: Result<(), MailError>, user_id: Uuid, kind: &'static str) {
        if let Err(e) = result {
            let err = AppError::from(e);
            tracing::warn!(%user_id, email = kind, error = %err, "email not sent");
        }
    }
}

// Malformed or non-JSON bodies get the same 400 envelope as field errors.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Storage(e) => AppError::StorageUnavailable(e),
            VerifyError::AlreadyVerified => AppError::Conflict(err.to_string()),
            VerifyError::InvalidInput
            | VerifyError::InvalidOrExpiredToken
            | VerifyError::NoPendingToken => AppError::InvalidInput(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidInput(msg) | AppError::Conflict(msg) => {
                JsonResponse::bad_request(&msg).into_response()
            }
            AppError::NotFound(msg) => JsonResponse::not_found(&msg).into_response(),
            AppError::Unauthorized(msg) => JsonResponse::unauthorized(&msg).into_response(),
            AppError::StorageUnavailable(e) => {
                tracing::error!(error = ?e, "storage failure");
                JsonResponse::server_error("Internal Server Error").into_response()
            }
            AppError::DeliveryFailed(e) => {
                tracing::error!(error = %e, "mail delivery failure reached a response");
                JsonResponse::server_error("Internal Server Error").into_response()
            }
        }
    }
}
