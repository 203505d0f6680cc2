//! Outbound email delivery
//!
//! OTP mails are fire-and-forget notifications: one send per issuance, no
//! retry. A send failure bubbles up and aborts the enclosing operation.

use std::path::PathBuf;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;
use tracing::info;

use crate::config::SmtpConfig;
use crate::error::EmailError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Renders `templates/{template}.html` with `data` and sends it to `to`.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        template: &str,
        data: &Value,
    ) -> Result<(), EmailError>;
}

pub struct SmtpSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    templates_dir: PathBuf,
}

impl SmtpSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| EmailError::SendError(e.to_string()))?
            .credentials(creds)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            templates_dir: PathBuf::from(&config.templates_dir),
        })
    }

    fn render(&self, template: &str, data: &Value) -> Result<String, EmailError> {
        let path = self.templates_dir.join(format!("{}.html", template));
        let mut body = std::fs::read_to_string(&path)
            .map_err(|e| EmailError::TemplateError(format!("{}: {}", path.display(), e)))?;

        if let Some(vars) = data.as_object() {
            for (key, value) in vars {
                let placeholder = format!("{{{{{}}}}}", key);
                let rendered = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                body = body.replace(&placeholder, &rendered);
            }
        }

        Ok(body)
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        template: &str,
        data: &Value,
    ) -> Result<(), EmailError> {
        let body = self.render(template, data)?;

        let from = self
            .from_address
            .parse::<Mailbox>()
            .map_err(|e| EmailError::SendError(format!("Invalid from address: {}", e)))?;
        let to_mailbox = to
            .parse::<Mailbox>()
            .map_err(|e| EmailError::SendError(format!("Invalid recipient address: {}", e)))?;

        let email = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        info!("Sent '{}' mail to {}", template, to);
        Ok(())
    }
}
