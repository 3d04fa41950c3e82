pub mod templates;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{SmtpConfig, TlsMode};
use crate::error::SendError;

/// A plain-text message ready to hand to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError>;
}

/// SMTP transport configured once at startup.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let tls = match config.tls {
            TlsMode::None => Tls::None,
            mode => {
                let params = TlsParameters::new(config.host.clone())
                    .map_err(|e| format!("SMTP TLS error: {e}"))?;
                match mode {
                    TlsMode::Wrapper => Tls::Wrapper(params),
                    TlsMode::StartTls => Tls::Required(params),
                    _ => Tls::Opportunistic(params),
                }
            }
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls);

        if let Some((user, pass)) = &config.credentials {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        // Fail fast on a bad sender rather than on every message.
        config
            .from
            .parse::<lettre::message::Mailbox>()
            .map_err(|e| format!("Invalid SMTP_FROM address: {e}"))?;

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, SendError> {
        Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| SendError::from(format!("Invalid from address: {e}")))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| SendError::from(format!("Invalid to address: {e}")))?)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| SendError::from(format!("Failed to build email: {e}")))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError> {
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| SendError::from(format!("Failed to send email: {e}")))?;

        Ok(())
    }
}
