//! Issuing of single-use emailed tokens.
//!
//! Only the SHA-256 digest of a token is stored; the raw value exists in
//! the outgoing email and nowhere else.

use rand::RngCore;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::user_repository::UserRepository;
use crate::models::token::{TokenPurpose, TOKEN_TTL};

const TOKEN_BYTES: usize = 32;

/// 256 bits from the thread-local CSPRNG, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Generates a fresh token for `user_id`, stores its hash with an expiry of
/// `now + TOKEN_TTL`, and returns the raw token. Any earlier token for the
/// same purpose is overwritten.
pub async fn issue_token(
    repo: &dyn UserRepository,
    user_id: Uuid,
    purpose: TokenPurpose,
    now: OffsetDateTime,
) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let expires_at = now + TOKEN_TTL;

    repo.store_token(user_id, purpose, &hash_token(&token), expires_at)
        .await?;

    tracing::debug!(%user_id, %purpose, %expires_at, "issued token");
    Ok(token)
}
