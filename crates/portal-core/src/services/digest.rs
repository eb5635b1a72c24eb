//! Weekly per-category digest.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::Repositories;
use super::composer::NotificationComposer;
use crate::domain::{Category, Post};
use crate::ports::MailTransport;

/// Posts newer than this many days go into the digest.
pub const DIGEST_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestReport {
    /// Categories with at least one new post.
    pub categories: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Mails every category subscriber the category's posts of the past week.
/// A category without new posts produces no mail.
pub struct DigestJob {
    repos: Repositories,
    composer: Arc<NotificationComposer>,
    mail: Arc<dyn MailTransport>,
    from_address: String,
    window: Duration,
}

impl DigestJob {
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
            window: Duration::days(DIGEST_WINDOW_DAYS),
        }
    }

    pub async fn run(&self) -> DigestReport {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> DigestReport {
        let mut report = DigestReport::default();
        let since = now - self.window;

        let categories = match self.repos.categories.list().await {
            Ok(categories) => categories,
            Err(e) => {
                tracing::error!(error = %e, "Digest aborted: failed to list categories");
                return report;
            }
        };

        for category in categories {
            let found = self
                .repos
                .posts
                .find_by_category_since(category.id, since)
                .await;
            let posts = match found {
                Ok(posts) => posts,
                Err(e) => {
                    tracing::error!(
                        category = %category.name,
                        error = %e,
                        "Failed to load digest posts"
                    );
                    continue;
                }
            };
            if posts.is_empty() {
                continue;
            }
            report.categories += 1;
            self.send_category(&category, &posts, &mut report).await;
        }

        tracing::info!(
            categories = report.categories,
            sent = report.sent,
            failed = report.failed,
            "Weekly digest finished"
        );
        report
    }

    async fn send_category(
        &self,
        category: &Category,
        posts: &[Post],
        report: &mut DigestReport,
    ) {
        let subscribers = match self.repos.categories.subscribers(category.id).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(
                    category = %category.name,
                    error = %e,
                    "Failed to load digest subscribers"
                );
                return;
            }
        };

        for user in subscribers {
            let Some(address) = user.mail_address() else {
                continue;
            };

            let content = match self.composer.weekly_digest(category, posts, &user.username) {
                Ok(content) => content,
                Err(e) => {
                    tracing::error!(
                        category = %category.name,
                        user_id = %user.id,
                        error = %e,
                        "Failed to render digest"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let email = content.addressed(&self.from_address, address);
            match self.mail.send(&email).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    tracing::error!(
                        category = %category.name,
                        address = %address,
                        error = %e,
                        "Failed to send digest"
                    );
                    report.failed += 1;
                }
            }
        }
    }
}
