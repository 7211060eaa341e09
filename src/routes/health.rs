use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{responses::JsonResponse, state::AppState};

pub async fn health(State(state): State<AppState>) -> Response {
    match state.db.ping().await {
        Ok(()) => JsonResponse::success("ok").into_response(),
        Err(e) => {
            tracing::warn!(error = ?e, "health check failed");
            JsonResponse::service_unavailable("database unavailable").into_response()
        }
    }
}
