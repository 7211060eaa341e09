use serde::{Deserialize, Serialize};

/// Payload of the session cookie.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub username: String,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub iss: String,
    pub aud: String,
}
