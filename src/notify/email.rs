//! SMTP notifier via lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::info;

use crate::config::SmtpConfig;
use crate::error::NotifyError;
use crate::notify::{AssignmentEmail, Delivery, Notifier};

/// Sends assignment emails over SMTP.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|e| NotifyError::InvalidAddress {
                address: config.from_address.clone(),
                reason: format!("{e}"),
            })?;

        let mut builder = SmtpTransport::relay(&config.host)
            .map_err(|e| NotifyError::SendFailed(format!("SMTP relay error: {e}")))?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &AssignmentEmail) -> Result<Message, NotifyError> {
        let to: Mailbox = email.to.trim().parse().map_err(|e| NotifyError::InvalidAddress {
            address: email.to.clone(),
            reason: format!("{e}"),
        })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, email: &AssignmentEmail) -> Result<Delivery, NotifyError> {
        let message = self.build_message(email)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| NotifyError::SendFailed(format!("send task failed: {e}")))?
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

        info!(to = %email.to, "Assignment email sent");
        Ok(Delivery::Sent)
    }
}

/// Used when no SMTP host is configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn send(&self, _email: &AssignmentEmail) -> Result<Delivery, NotifyError> {
        Ok(Delivery::Skipped)
    }
}
