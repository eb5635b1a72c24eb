//! Template rendering port for notification bodies.

use crate::domain::{Category, Post};

/// Name of the new-post notification template.
pub const POST_NOTIFICATION_TEMPLATE: &str = "post_notification";
/// Name of the weekly digest template.
pub const WEEKLY_DIGEST_TEMPLATE: &str = "weekly_digest";

/// Substitutions for the new-post notification.
#[derive(Debug, Clone, Copy)]
pub struct PostNotificationContext<'a> {
    pub username: &'a str,
    pub author_name: &'a str,
    pub post: &'a Post,
    pub post_url: &'a str,
}

/// Substitutions for the weekly digest of one category.
#[derive(Debug, Clone, Copy)]
pub struct WeeklyDigestContext<'a> {
    pub username: &'a str,
    pub category: &'a Category,
    pub posts: &'a [Post],
    pub site_url: &'a str,
}

/// Renders the named HTML templates.
pub trait TemplateRenderer: Send + Sync {
    fn render_post_notification(
        &self,
        ctx: &PostNotificationContext<'_>,
    ) -> Result<String, TemplateError>;

    fn render_weekly_digest(&self, ctx: &WeeklyDigestContext<'_>) -> Result<String, TemplateError>;
}

#[derive(Debug, thiserror::Error)]
#[error("Rendering template '{template}' failed: {reason}")]
pub struct TemplateError {
    pub template: &'static str,
    pub reason: String,
}
