//! Mailbox that keeps every message in memory.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use portal_core::ports::{MailError, MailTransport, OutboundEmail};

/// Records sent messages. Addresses registered with
/// [`InMemoryMailbox::reject`] fail with a transport error, which lets tests
/// exercise partial delivery.
#[derive(Default)]
pub struct InMemoryMailbox {
    sent: Mutex<Vec<OutboundEmail>>,
    rejected: Mutex<HashSet<String>>,
}

impl InMemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reject(&self, address: &str) {
        self.rejected.lock().await.insert(address.to_string());
    }

    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }

    /// Messages addressed to `address`.
    pub async fn inbox(&self, address: &str) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.to.iter().any(|to| to == address))
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl MailTransport for InMemoryMailbox {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailError> {
        {
            let rejected = self.rejected.lock().await;
            if let Some(address) = message.to.iter().find(|to| rejected.contains(*to)) {
                return Err(MailError::Transport(format!("mailbox {} unavailable", address)));
            }
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}
