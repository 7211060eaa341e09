use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::errors::AppError;
use crate::routes::users::claims::Claims;
use crate::utils::jwt::SessionKeysProvider;

pub const SESSION_COOKIE: &str = "token";
pub const SESSION_TTL: Duration = Duration::days(1);

#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

impl<S> FromRequestParts<S> for AuthSession
where
    S: SessionKeysProvider + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .ok_or_else(|| AppError::Unauthorized("Not logged in".into()))?;

        let claims = state
            .session_keys()
            .verify(token.value())
            .map_err(|_| AppError::Unauthorized("Invalid or expired session".into()))?;

        Ok(AuthSession(claims))
    }
}

/// HTTP-only session cookie carrying `jwt`.
pub fn session_cookie(jwt: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, jwt))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(SESSION_TTL)
        .build()
}

/// Empty cookie that makes the browser drop the session.
pub fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
