//! New-post notification fan-out.
//!
//! A published post is announced once to every reader subscribed to one of
//! its categories or to its author. A reader who matches several ways gets a
//! single message; the category wording takes precedence over the author one.

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Repositories;
use super::composer::{NotificationComposer, Recipient, RecipientReason};
use crate::domain::{Post, User};
use crate::error::RepoError;
use crate::ports::{Job, JobQueue, MailError, MailTransport, TemplateError};

/// Job type enqueued when a post is published.
pub const POST_PUBLISHED_JOB: &str = "post.published";

/// Sends in flight at once for one post.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Payload of a [`POST_PUBLISHED_JOB`] job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPublished {
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub recipients: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Merge the subscriber lists into one recipient per reader.
///
/// Category lists come first, in the order given, so a reader subscribed to
/// both a category and the author is addressed through the category. Readers
/// without a usable address are skipped.
pub fn collect_recipients(
    category_subscribers: Vec<(Uuid, Vec<User>)>,
    author_subscribers: Vec<User>,
) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    let mut recipients = Vec::new();

    let tagged = category_subscribers
        .into_iter()
        .flat_map(|(category_id, users)| {
            users
                .into_iter()
                .map(move |u| (u, RecipientReason::Category(category_id)))
        })
        .chain(
            author_subscribers
                .into_iter()
                .map(|u| (u, RecipientReason::Author)),
        );

    for (user, reason) in tagged {
        let Some(address) = user.mail_address().map(str::to_string) else {
            continue;
        };
        if seen.insert(user.id) {
            recipients.push(Recipient {
                user,
                address,
                reason,
            });
        }
    }

    recipients
}

pub struct FanOutDispatcher {
    repos: Repositories,
    composer: Arc<NotificationComposer>,
    mail: Arc<dyn MailTransport>,
    from_address: String,
    concurrency: usize,
}

impl FanOutDispatcher {
    pub fn new(
        repos: Repositories,
        composer: Arc<NotificationComposer>,
        mail: Arc<dyn MailTransport>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            repos,
            composer,
            mail,
            from_address: from_address.into(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Resolve who should hear about `post`.
    pub async fn recipients(&self, post: &Post) -> Result<Vec<Recipient>, RepoError> {
        let mut by_category = Vec::with_capacity(post.category_ids.len());
        for category_id in &post.category_ids {
            let users = self.repos.categories.subscribers(*category_id).await?;
            by_category.push((*category_id, users));
        }
        let by_author = self.repos.authors.subscribers(post.author_id).await?;

        Ok(collect_recipients(by_category, by_author))
    }

    /// Load the post and announce it. Returns `None` when the post no longer
    /// exists.
    pub async fn dispatch_by_id(&self, post_id: Uuid) -> Result<Option<DispatchReport>, RepoError> {
        match self.repos.posts.find_by_id(post_id).await? {
            Some(post) => Ok(Some(self.dispatch(&post).await)),
            None => {
                tracing::warn!(post_id = %post_id, "Post vanished before notification");
                Ok(None)
            }
        }
    }

    /// Send one message per recipient. Individual failures are logged and
    /// counted; they never abort the rest of the batch.
    pub async fn dispatch(&self, post: &Post) -> DispatchReport {
        let recipients = match self.recipients(post).await {
            Ok(recipients) => recipients,
            Err(e) => {
                tracing::error!(
                    post_id = %post.id,
                    error = %e,
                    "Failed to resolve notification recipients"
                );
                return DispatchReport::default();
            }
        };

        let author_name = self.author_name(post.author_id).await;

        let sends: Vec<_> = recipients
            .iter()
            .map(|recipient| {
                let author_name = author_name.as_str();
                async move {
                    match self.send_one(post, author_name, recipient).await {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::error!(
                                post_id = %post.id,
                                user_id = %recipient.user.id,
                                address = %recipient.address,
                                error = %e,
                                "Failed to send post notification"
                            );
                            false
                        }
                    }
                }
            })
            .collect();
        let outcomes: Vec<bool> = futures::stream::iter(sends)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let sent = outcomes.iter().filter(|ok| **ok).count();
        let report = DispatchReport {
            recipients: recipients.len(),
            sent,
            failed: outcomes.len() - sent,
        };

        tracing::info!(
            post_id = %post.id,
            recipients = report.recipients,
            sent = report.sent,
            failed = report.failed,
            "Post notifications dispatched"
        );
        report
    }

    async fn author_name(&self, author_id: Uuid) -> String {
        match self.repos.users.find_by_id(author_id).await {
            Ok(Some(user)) => user.username,
            Ok(None) => String::from("unknown author"),
            Err(e) => {
                tracing::warn!(author_id = %author_id, error = %e, "Failed to load author name");
                String::from("unknown author")
            }
        }
    }

    async fn send_one(
        &self,
        post: &Post,
        author_name: &str,
        recipient: &Recipient,
    ) -> Result<(), SendError> {
        let content = self
            .composer
            .post_notification(post, author_name, recipient)?;
        let message = content.addressed(&self.from_address, &recipient.address);
        self.mail.send(&message).await?;
        Ok(())
    }
}

/// How a freshly created post reaches the fan-out.
#[derive(Clone)]
pub enum NotificationDelivery {
    /// Send before the create call returns.
    Inline(Arc<FanOutDispatcher>),
    /// Hand off to the job queue as a [`POST_PUBLISHED_JOB`].
    Queued(Arc<dyn JobQueue>),
}

impl NotificationDelivery {
    /// Announce a published post. Failures are logged, never returned: the
    /// post is already stored.
    pub async fn post_published(&self, post: &Post) {
        match self {
            NotificationDelivery::Inline(dispatcher) => {
                dispatcher.dispatch(post).await;
            }
            NotificationDelivery::Queued(queue) => {
                let payload = serde_json::json!({ "post_id": post.id });
                if let Err(e) = queue.enqueue(Job::new(POST_PUBLISHED_JOB, payload)).await {
                    tracing::error!(
                        post_id = %post.id,
                        error = %e,
                        "Failed to enqueue post notification"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> User {
        User::new(name.into(), email.into(), String::new())
    }

    #[test]
    fn reader_in_two_categories_is_addressed_once() {
        let u1 = user("u1", "u1@example.com");
        let (tech, science) = (Uuid::new_v4(), Uuid::new_v4());

        let recipients = collect_recipients(
            vec![(tech, vec![u1.clone()]), (science, vec![u1.clone()])],
            vec![],
        );

        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].reason, RecipientReason::Category(tech));
    }

    #[test]
    fn category_reason_wins_over_author() {
        let u1 = user("u1", "u1@example.com");
        let u2 = user("u2", "u2@example.com");
        let tech = Uuid::new_v4();

        let recipients = collect_recipients(vec![(tech, vec![u1.clone()])], vec![u2.clone(), u1]);

        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].reason, RecipientReason::Category(tech));
        assert_eq!(recipients[1].user.id, u2.id);
        assert_eq!(recipients[1].reason, RecipientReason::Author);
    }

    #[test]
    fn readers_without_address_are_skipped() {
        let silent = user("silent", "   ");
        let u1 = user("u1", " u1@example.com ");

        let recipients = collect_recipients(vec![(Uuid::new_v4(), vec![silent, u1])], vec![]);

        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].address, "u1@example.com");
    }
}
