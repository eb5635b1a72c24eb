use async_trait::async_trait;

use portal_core::ports::{MailError, MailTransport, OutboundEmail};

/// Writes each message to the log instead of sending it. Used when no SMTP
/// server is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailError> {
        tracing::info!(
            from = %message.from,
            to = ?message.to,
            subject = %message.subject,
            body = %message.text_body,
            "Mail not sent (log transport)"
        );
        Ok(())
    }
}
