//! SMTP delivery with lettre's pooled async transport.

use std::str::FromStr;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use portal_core::ports::{MailError, MailTransport, OutboundEmail};

/// How the connection to the SMTP server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (port 587).
    StartTls,
    /// TLS from the first byte (port 465).
    Implicit,
    /// No encryption; local relays and test servers only.
    None,
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "implicit" | "ssl" | "tls" => Ok(Self::Implicit),
            "none" | "plain" => Ok(Self::None),
            other => Err(format!("unknown SMTP security mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub security: SmtpSecurity,
}

/// Holds one transport for the lifetime of the process; its pool keeps
/// connections open between sends so a fan-out reuses them.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| MailError::Transport(e.to_string()))?
            }
            SmtpSecurity::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let mut builder = builder.port(config.port);
        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        tracing::info!(
            host = %config.host,
            port = config.port,
            security = ?config.security,
            "SMTP transport configured"
        );
        Ok(Self {
            transport: builder.build(),
        })
    }

    fn build_message(message: &OutboundEmail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&message.from)?)
            .subject(message.subject.clone());
        for to in &message.to {
            builder = builder.to(parse_mailbox(to)?);
        }

        let built = match &message.html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                html.clone(),
            )),
            None => builder.body(message.text_body.clone()),
        };
        built.map_err(|e| MailError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailError> {
        let email = Self::build_message(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::debug!(to = ?message.to, subject = %message.subject, "Mail sent");
        Ok(())
    }
}
