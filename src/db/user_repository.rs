use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{
    signup::SignupPayload,
    token::TokenPurpose,
    user::{PublicUser, User},
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error>;
    async fn create_user(
        &self,
        payload: &SignupPayload,
        password_hash: &str,
    ) -> Result<Uuid, sqlx::Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error>;

    /// Overwrites whatever token is stored for `purpose`. Fails with
    /// `RowNotFound` when the user does not exist.
    async fn store_token(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error>;

    /// User holding `token_hash` as a pending verification token that
    /// expires strictly after `now`.
    async fn find_user_by_verify_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, sqlx::Error>;

    /// User whose verification was completed with `token_hash`.
    async fn find_user_by_verified_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Conditional update: marks the user verified and clears the pending
    /// token only if the token is still pending and unexpired. Returns
    /// whether a row was changed.
    async fn complete_email_verification(
        &self,
        user_id: Uuid,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<bool, sqlx::Error>;

    /// Conditional update: swaps in `password_hash` and clears the reset
    /// token if it matches and has not expired. Returns the affected user.
    async fn reset_password_with_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Uuid>, sqlx::Error>;

    async fn ping(&self) -> Result<(), sqlx::Error>;
}
