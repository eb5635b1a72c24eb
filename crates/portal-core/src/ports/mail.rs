//! Mail transport port.

use async_trait::async_trait;

/// A fully addressed message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    /// HTML alternative attached next to the plain-text body.
    pub html_body: Option<String>,
}

/// Sends mail. Implementations keep their connection between calls so batch
/// sends reuse it.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("Message build failed: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
