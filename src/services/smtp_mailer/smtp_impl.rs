use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::SmtpSettings;
use crate::models::token::TokenPurpose;
use crate::services::smtp_mailer::{render_token_email, Mailer};

use super::MailError;

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    sender: Mailbox,
    base_url: String,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, base_url: &str) -> Result<Self, MailError> {
        let sender: Mailbox = settings.from.parse()?;
        let transport = build_transport(settings)?;

        Ok(Self {
            transport: Arc::new(transport),
            sender,
            base_url: base_url.to_string(),
        })
    }

    async fn send_token_email(
        &self,
        to: &str,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<(), MailError> {
        let content = render_token_email(&self.base_url, purpose, token);
        let email = Message::builder()
            .from(self.sender.clone())
            .to(to.parse::<Mailbox>()?)
            .subject(content.subject)
            .multipart(MultiPart::alternative_plain_html(content.text, content.html))?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| e.into())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification_email(&self, to: &str, token: &str) -> Result<(), MailError> {
        self.send_token_email(to, TokenPurpose::EmailVerification, token)
            .await
    }

    async fn send_reset_email(&self, to: &str, token: &str) -> Result<(), MailError> {
        self.send_token_email(to, TokenPurpose::PasswordReset, token)
            .await
    }
}

fn build_transport(
    settings: &SmtpSettings,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let mut builder = if settings.tls_disabled {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host).port(settings.port)
    } else {
        let tls = TlsParameters::new(settings.host.clone())?;
        AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
            .port(settings.port)
            .tls(Tls::Required(tls))
    };

    if let (Some(username), Some(password)) =
        (settings.username.as_ref(), settings.password.as_ref())
    {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(builder.build())
}
