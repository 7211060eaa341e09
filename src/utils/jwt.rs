//! Signing and checking of the HS256 session token carried in the
//! `token` cookie.

use std::{collections::HashSet, env};

use jsonwebtoken::{
    decode, encode, errors::Error, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::models::user::User;
use crate::routes::users::claims::Claims;

pub const MIN_SECRET_LEN: usize = 32;
// A 32-byte secret made of one or two repeated characters is a placeholder.
const MIN_DISTINCT_SECRET_BYTES: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("JWT_SECRET must be set")]
    Missing,
    #[error("JWT_SECRET is {0} bytes; at least {} are required", MIN_SECRET_LEN)]
    TooShort(usize),
    #[error(
        "JWT_SECRET uses only {0} distinct bytes; at least {} are required",
        MIN_DISTINCT_SECRET_BYTES
    )]
    Repetitive(usize),
}

/// Key pair plus the issuer/audience every session is bound to.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn from_env(issuer: &str, audience: &str) -> Result<Self, SecretError> {
        let secret = env::var("JWT_SECRET").map_err(|_| SecretError::Missing)?;
        Self::new(secret, issuer, audience)
    }

    pub fn new(
        secret: impl AsRef<[u8]>,
        issuer: &str,
        audience: &str,
    ) -> Result<Self, SecretError> {
        let secret = secret.as_ref();
        check_secret(secret)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        // Sessions end exactly at `exp`.
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer: issuer.to_owned(),
            audience: audience.to_owned(),
        })
    }

    /// Signs a session for `user` valid until `now + ttl`.
    pub fn sign(&self, user: &User, now: OffsetDateTime, ttl: Duration) -> Result<String, Error> {
        let claims = Claims {
            id: user.id.to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            exp: (now + ttl).unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}

/// Implemented by router state so the session extractor can find its keys.
pub trait SessionKeysProvider {
    fn session_keys(&self) -> &SessionKeys;
}

fn check_secret(secret: &[u8]) -> Result<(), SecretError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(SecretError::TooShort(secret.len()));
    }
    match secret.iter().collect::<HashSet<_>>().len() {
        distinct if distinct < MIN_DISTINCT_SECRET_BYTES => Err(SecretError::Repetitive(distinct)),
        _ => Ok(()),
    }
}
