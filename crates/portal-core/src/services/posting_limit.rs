//! Per-author posting limit: at most N posts in a trailing window.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::RepoError;
use crate::ports::{PostRepository, RateLimitResult};

/// How many posts an author may publish per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingPolicy {
    pub max_posts: u32,
    pub window: Duration,
}

impl Default for PostingPolicy {
    fn default() -> Self {
        Self {
            max_posts: 3,
            window: Duration::hours(24),
        }
    }
}

impl PostingPolicy {
    /// Earliest creation time that still counts against the limit.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    /// Decide from the creation times of the author's recent posts.
    /// Posts created at or after the cutoff count.
    pub fn evaluate(&self, created: &[DateTime<Utc>], now: DateTime<Utc>) -> RateLimitResult {
        let cutoff = self.cutoff(now);
        let counted: Vec<DateTime<Utc>> =
            created.iter().copied().filter(|t| *t >= cutoff).collect();
        let count = u32::try_from(counted.len()).unwrap_or(u32::MAX);

        if count < self.max_posts {
            return RateLimitResult {
                allowed: true,
                remaining: self.max_posts - count,
                reset_after: std::time::Duration::ZERO,
            };
        }

        // The allowance frees up once the oldest counted post leaves the window.
        let reset_after = counted
            .iter()
            .min()
            .map(|oldest| (*oldest + self.window - now).to_std().unwrap_or_default())
            .unwrap_or_default();

        RateLimitResult {
            allowed: false,
            remaining: 0,
            reset_after,
        }
    }
}

/// Checks an author's allowance against the content store.
pub struct PostingLimiter {
    posts: Arc<dyn PostRepository>,
    policy: PostingPolicy,
}

impl PostingLimiter {
    pub fn new(posts: Arc<dyn PostRepository>, policy: PostingPolicy) -> Self {
        Self { posts, policy }
    }

    pub fn policy(&self) -> PostingPolicy {
        self.policy
    }

    pub async fn check(&self, author_id: Uuid) -> Result<RateLimitResult, RepoError> {
        self.check_at(author_id, Utc::now()).await
    }

    pub async fn check_at(
        &self,
        author_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult, RepoError> {
        let created = self
            .posts
            .created_by_author_since(author_id, self.policy.cutoff(now))
            .await?;

        let result = self.policy.evaluate(&created, now);
        tracing::debug!(
            author_id = %author_id,
            recent_posts = created.len(),
            allowed = result.allowed,
            "Posting allowance checked"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn fourth_post_within_a_day_is_rejected() {
        let policy = PostingPolicy::default();
        let now = now();
        let created = vec![
            now - Duration::hours(1),
            now - Duration::hours(5),
            now - Duration::hours(23),
        ];

        let result = policy.evaluate(&created, now);

        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.reset_after, std::time::Duration::from_secs(3600));
    }

    #[test]
    fn post_older_than_window_does_not_count() {
        let policy = PostingPolicy::default();
        let now = now();
        let created = vec![
            now - Duration::hours(24) - Duration::seconds(1),
            now - Duration::hours(2),
            now - Duration::hours(3),
        ];

        let result = policy.evaluate(&created, now);

        assert!(result.allowed);
        assert_eq!(result.remaining, 1);
    }

    #[test]
    fn post_exactly_at_cutoff_counts() {
        let policy = PostingPolicy::default();
        let now = now();
        let created = vec![
            now - Duration::hours(24),
            now - Duration::hours(2),
            now - Duration::hours(3),
        ];

        assert!(!policy.evaluate(&created, now).allowed);
    }

    #[test]
    fn fresh_author_has_full_allowance() {
        let result = PostingPolicy::default().evaluate(&[], now());
        assert!(result.allowed);
        assert_eq!(result.remaining, 3);
    }
}
