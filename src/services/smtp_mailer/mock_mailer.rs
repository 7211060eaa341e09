use crate::services::smtp_mailer::{MailError, Mailer};
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock mailer that records sent emails for testing purposes.
#[derive(Debug, Default)]
pub struct MockMailer {
    pub sent_verification_emails: Mutex<Vec<(String, String)>>,
    pub sent_reset_emails: Mutex<Vec<(String, String)>>,
    pub fail_send: bool,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail_send: true,
            ..Default::default()
        }
    }

    pub fn last_verification_token(&self) -> Option<String> {
        self.sent_verification_emails
            .lock()
            .unwrap()
            .last()
            .map(|(_, token)| token.clone())
    }

    pub fn last_reset_token(&self) -> Option<String> {
        self.sent_reset_emails
            .lock()
            .unwrap()
            .last()
            .map(|(_, token)| token.clone())
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_verification_email(&self, to: &str, token: &str) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.sent_verification_emails
            .lock()
            .unwrap()
            .push((to.to_string(), token.to_string()));
        Ok(())
    }

    async fn send_reset_email(&self, to: &str, token: &str) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.sent_reset_emails
            .lock()
            .unwrap()
            .push((to.to_string(), token.to_string()));
        Ok(())
    }
}
