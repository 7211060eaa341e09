use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SignupPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignupPayload {
    /// Returns the name of the first required field that is blank.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.username.trim().is_empty() {
            Some("username")
        } else if self.email.trim().is_empty() {
            Some("email")
        } else if self.password.is_empty() {
            Some("password")
        } else {
            None
        }
    }
}
