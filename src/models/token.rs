use core::fmt;

use time::Duration;

/// Lifetime of every emailed token, regardless of purpose.
pub const TOKEN_TTL: Duration = Duration::hours(1);

/// Which pair of token columns on the user record a token lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        };
        write!(f, "{}", s)
    }
}
