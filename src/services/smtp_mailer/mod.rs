use async_trait::async_trait;
use lettre::address::AddressError;
use std::fmt;

use crate::models::token::TokenPurpose;

#[derive(Debug)]
pub enum MailError {
    Other(String),
    InvalidEmailAddress(String),
    SendError(String),
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::Other(e) => write!(f, "Error: {}", e),
            MailError::InvalidEmailAddress(e) => write!(f, "Invalid Address: {}", e),
            MailError::SendError(e) => write!(f, "Send error: {}", e),
        }
    }
}

impl std::error::Error for MailError {}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<AddressError> for MailError {
    fn from(e: AddressError) -> Self {
        MailError::InvalidEmailAddress(e.to_string())
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(&self, to: &str, token: &str) -> Result<(), MailError>;
    async fn send_reset_email(&self, to: &str, token: &str) -> Result<(), MailError>;
}

mod mock_mailer;
mod smtp_impl;

pub use mock_mailer::MockMailer;
pub use smtp_impl::SmtpMailer;

/// Rendered subject and bodies for a token email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEmail {
    pub subject: &'static str,
    pub html: String,
    pub text: String,
}

/// Builds the message for `purpose`. The HTML part links to the frontend
/// page that consumes the token; the plain-text part carries the raw token.
pub fn render_token_email(base_url: &str, purpose: TokenPurpose, token: &str) -> TokenEmail {
    let base_url = base_url.trim_end_matches('/');
    let (subject, path, action) = match purpose {
        TokenPurpose::EmailVerification => {
            ("Verify your email", "verify-email", "verify your email")
        }
        TokenPurpose::PasswordReset => {
            ("Reset your password", "reset-password", "reset your password")
        }
    };
    let link = format!("{}/{}?token={}", base_url, path, token);

    TokenEmail {
        subject,
        html: format!(
            "<p>Click <a href=\"{}\">here</a> to {}. This link will expire in 1 hour.</p>",
            link, action
        ),
        text: format!("Your token is: {}", token),
    }
}
