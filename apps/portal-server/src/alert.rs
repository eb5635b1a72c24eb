//! Error mail to site administrators.
//!
//! [`AdminAlertLayer`] picks ERROR events off the tracing pipeline and hands
//! them to [`AdminMailer`], which sends one message per event to every
//! address in `ADMINS`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use portal_core::ports::{MailTransport, OutboundEmail};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{Layer, layer::Context};

const ALERT_BUFFER: usize = 100;

/// One ERROR event, captured for mailing.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub message: String,
    pub target: String,
    pub timestamp: DateTime<Utc>,
    pub fields: Vec<(String, String)>,
}

pub type AlertReceiver = mpsc::Receiver<AlertMessage>;

/// Tracing layer that forwards ERROR events without blocking the caller.
/// Events are dropped while the buffer is full.
pub struct AdminAlertLayer {
    sender: mpsc::Sender<AlertMessage>,
}

impl AdminAlertLayer {
    pub fn new() -> (Self, AlertReceiver) {
        Self::with_buffer(ALERT_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> (Self, AlertReceiver) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

impl<S> Layer<S> for AdminAlertLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // The mailer reports its own failures; never mail those.
        if *metadata.level() != Level::ERROR || metadata.target() == module_path!() {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let _ = self.sender.try_send(AlertMessage {
            message: visitor.message,
            target: metadata.target().to_string(),
            timestamp: Utc::now(),
            fields: visitor.fields,
        });
    }
}

/// Mails captured errors to the administrators.
pub struct AdminMailer {
    mail: Arc<dyn MailTransport>,
    from: String,
    admins: Vec<String>,
    service_name: String,
}

impl AdminMailer {
    pub fn new(
        mail: Arc<dyn MailTransport>,
        from: impl Into<String>,
        admins: Vec<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            mail,
            from: from.into(),
            admins,
            service_name: service_name.into(),
        }
    }

    pub fn compose(&self, alert: &AlertMessage) -> OutboundEmail {
        let mut body = format!(
            "{}\n\nTarget: {}\nTime: {}\n",
            alert.message,
            alert.target,
            alert.timestamp.to_rfc3339()
        );
        for (name, value) in &alert.fields {
            body.push_str(&format!("{}: {}\n", name, value));
        }

        OutboundEmail {
            from: self.from.clone(),
            to: self.admins.clone(),
            subject: format!("[{}] ERROR: {}", self.service_name, alert.message),
            text_body: body,
            html_body: None,
        }
    }

    /// Send every alert until the channel closes.
    pub async fn run(self, mut alerts: AlertReceiver) {
        while let Some(alert) = alerts.recv().await {
            if let Err(e) = self.mail.send(&self.compose(&alert)).await {
                tracing::warn!(error = %e, "Failed to mail error report to admins");
            }
        }
    }

    pub fn spawn(self, alerts: AlertReceiver) {
        tracing::info!(admins = self.admins.len(), "Admin error mail enabled");
        tokio::spawn(self.run(alerts));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_infra::InMemoryMailbox;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(emit: impl FnOnce()) -> Vec<AlertMessage> {
        let (layer, mut rx) = AdminAlertLayer::with_buffer(8);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);

        let mut alerts = Vec::new();
        while let Ok(alert) = rx.try_recv() {
            alerts.push(alert);
        }
        alerts
    }

    #[test]
    fn only_errors_are_captured() {
        let alerts = capture(|| {
            tracing::warn!("slow query");
            tracing::error!(post_id = 7, "Failed to send digest");
        });

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "Failed to send digest");
        assert_eq!(alerts[0].fields, vec![("post_id".to_string(), "7".to_string())]);
    }

    #[test]
    fn full_buffer_drops_instead_of_blocking() {
        let (layer, mut rx) = AdminAlertLayer::with_buffer(1);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("first");
            tracing::error!("second");
        });

        assert_eq!(rx.try_recv().unwrap().message, "first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn mailer_sends_each_alert_to_all_admins() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let mailer = AdminMailer::new(
            mailbox.clone(),
            "portal@example.com",
            vec!["ops@example.com".into(), "lead@example.com".into()],
            "news-portal",
        );
        let (tx, rx) = mpsc::channel(4);
        tx.send(AlertMessage {
            message: "Failed to connect to Redis queue".into(),
            target: "portal_server::state".into(),
            timestamp: Utc::now(),
            fields: vec![("error".into(), "refused".into())],
        })
        .await
        .unwrap();
        drop(tx);

        mailer.run(rx).await;

        for admin in ["ops@example.com", "lead@example.com"] {
            let inbox = mailbox.inbox(admin).await;
            assert_eq!(inbox.len(), 1);
            assert_eq!(
                inbox[0].subject,
                "[news-portal] ERROR: Failed to connect to Redis queue"
            );
            assert!(inbox[0].text_body.contains("error: refused"));
        }
    }

    #[tokio::test]
    async fn mailer_survives_a_rejected_message() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox.reject("ops@example.com").await;
        let mailer = AdminMailer::new(
            mailbox.clone(),
            "portal@example.com",
            vec!["ops@example.com".into()],
            "news-portal",
        );
        let (tx, rx) = mpsc::channel(4);
        for message in ["one", "two"] {
            tx.send(AlertMessage {
                message: message.into(),
                target: "portal_server".into(),
                timestamp: Utc::now(),
                fields: Vec::new(),
            })
            .await
            .unwrap();
        }
        drop(tx);

        mailer.run(rx).await;
        assert!(mailbox.sent().await.is_empty());
    }
}
