use axum::{extract::State, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;

use crate::{responses::JsonResponse, state::AppState};

use super::session::expired_session_cookie;

pub async fn handle_logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(expired_session_cookie(state.config.auth_cookie_secure));
    (jar, JsonResponse::success("Logged out"))
}
