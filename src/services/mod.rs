pub mod smtp_mailer;
pub mod tokens;
pub mod verification;
