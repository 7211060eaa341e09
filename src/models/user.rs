use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verify_token: Option<String>,
    #[serde(skip_serializing)]
    pub verify_token_expiry: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub verified_token: Option<String>,
    #[serde(skip_serializing)]
    pub forgot_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub forgot_password_token_expiry: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// True while a verification token is waiting to be used.
    pub fn has_pending_verification(&self) -> bool {
        self.verify_token.is_some() && self.verify_token_expiry.is_some()
    }
}

/// The subset of a user that is safe to hand back to clients.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}
