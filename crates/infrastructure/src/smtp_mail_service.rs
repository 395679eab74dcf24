//! SMTP mail service using the `lettre` crate.

use async_trait::async_trait;
use cardflow_application::MailService;
use cardflow_core::{AppError, AppResult};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP mail service configuration.
#[derive(Clone)]
pub struct SmtpMailConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// SMTP username.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// Sender email address.
    pub from_address: String,
}

/// Production mail service using SMTP.
#[derive(Clone)]
pub struct SmtpMailService {
    config: SmtpMailConfig,
}

impl SmtpMailService {
    /// Creates a new SMTP mail service.
    #[must_use]
    pub fn new(config: SmtpMailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailService for SmtpMailService {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from = self
            .config
            .from_address
            .parse()
            .map_err(|error| AppError::Internal(format!("invalid from address: {error}")))?;

        let to_mailbox = to
            .parse()
            .map_err(|error| AppError::Internal(format!("invalid recipient address: {error}")))?;

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())
            .map_err(|error| AppError::Internal(format!("failed to build mail: {error}")))?;

        let credentials =
            Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
            .map_err(|error| {
                AppError::Internal(format!("failed to create SMTP transport: {error}"))
            })?
            .port(self.config.port)
            .credentials(credentials)
            .build();

        mailer
            .send(message)
            .await
            .map_err(|error| AppError::Internal(format!("failed to send mail: {error}")))?;

        Ok(())
    }
}
