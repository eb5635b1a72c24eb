//! Builds notification emails: subject, plain-text body and HTML alternative.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Category, Post, User, preview_of};
use crate::ports::{
    OutboundEmail, PostNotificationContext, TemplateError, TemplateRenderer, WeeklyDigestContext,
};

/// Characters of content quoted in the plain-text notification.
const TEXT_PREVIEW_CHARS: usize = 100;

/// Why a reader receives a new-post notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientReason {
    /// Subscribed to this category of the post.
    Category(Uuid),
    /// Subscribed to the post's author.
    Author,
}

/// A reader resolved for one notification, with a usable address.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub user: User,
    pub address: String,
    pub reason: RecipientReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl EmailContent {
    pub fn addressed(self, from: &str, to: &str) -> OutboundEmail {
        OutboundEmail {
            from: from.to_string(),
            to: vec![to.to_string()],
            subject: self.subject,
            text_body: self.text_body,
            html_body: Some(self.html_body),
        }
    }
}

pub struct NotificationComposer {
    renderer: Arc<dyn TemplateRenderer>,
    site_url: String,
}

impl NotificationComposer {
    pub fn new(renderer: Arc<dyn TemplateRenderer>, site_url: impl Into<String>) -> Self {
        let site_url = site_url.into().trim_end_matches('/').to_string();
        Self { renderer, site_url }
    }

    pub fn post_url(&self, post: &Post) -> String {
        format!("{}/news/{}", self.site_url, post.id)
    }

    pub fn post_notification(
        &self,
        post: &Post,
        author_name: &str,
        recipient: &Recipient,
    ) -> Result<EmailContent, TemplateError> {
        let username = recipient.user.username.as_str();
        let post_url = self.post_url(post);

        let (subject, greeting) = match recipient.reason {
            RecipientReason::Category(_) => (
                post.title.clone(),
                format!("Hello, {}. A new post in your favourite section!", username),
            ),
            RecipientReason::Author => (
                format!("New publication from {}", author_name),
                format!(
                    "Hello, {}. Author {} has published a new post!",
                    username, author_name
                ),
            ),
        };

        let text_body = format!(
            "{}\n\n{}\n{}\n\nRead more: {}\n",
            greeting,
            post.title,
            preview_of(&post.content, TEXT_PREVIEW_CHARS),
            post_url
        );

        let html_body = self
            .renderer
            .render_post_notification(&PostNotificationContext {
                username,
                author_name,
                post,
                post_url: &post_url,
            })?;

        Ok(EmailContent {
            subject,
            text_body,
            html_body,
        })
    }

    pub fn weekly_digest(
        &self,
        category: &Category,
        posts: &[Post],
        username: &str,
    ) -> Result<EmailContent, TemplateError> {
        let mut text_body = format!(
            "Hello, {}. New posts in \"{}\" this week:\n\n",
            username, category.name
        );
        for post in posts {
            text_body.push_str(&format!("- {}: {}\n", post.title, self.post_url(post)));
        }

        let html_body = self.renderer.render_weekly_digest(&WeeklyDigestContext {
            username,
            category,
            posts,
            site_url: &self.site_url,
        })?;

        Ok(EmailContent {
            subject: format!("New posts in \"{}\" this week", category.name),
            text_body,
            html_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PostKind;

    struct TitleRenderer;

    impl TemplateRenderer for TitleRenderer {
        fn render_post_notification(
            &self,
            ctx: &PostNotificationContext<'_>,
        ) -> Result<String, TemplateError> {
            Ok(format!("<p>{}</p>", ctx.post.title))
        }

        fn render_weekly_digest(
            &self,
            ctx: &WeeklyDigestContext<'_>,
        ) -> Result<String, TemplateError> {
            Ok(format!("<p>{} posts</p>", ctx.posts.len()))
        }
    }

    fn composer() -> NotificationComposer {
        NotificationComposer::new(Arc::new(TitleRenderer), "http://portal.test/")
    }

    fn recipient(reason: RecipientReason) -> Recipient {
        let user = User::new("u1".into(), "u1@example.com".into(), String::new());
        Recipient {
            address: user.email.clone(),
            user,
            reason,
        }
    }

    fn post() -> Post {
        Post::new(
            Uuid::new_v4(),
            PostKind::News,
            "Rust 2.0".into(),
            "x".repeat(120),
            vec![],
        )
    }

    #[test]
    fn category_notification_uses_post_title_as_subject() {
        let post = post();
        let content = composer()
            .post_notification(&post, "alice", &recipient(RecipientReason::Category(Uuid::nil())))
            .unwrap();

        assert_eq!(content.subject, "Rust 2.0");
        assert!(content.text_body.starts_with("Hello, u1. A new post in your favourite section!"));
        assert!(content.text_body.contains(&format!("{}...", "x".repeat(100))));
        assert!(content.text_body.contains(&format!("http://portal.test/news/{}", post.id)));
        assert_eq!(content.html_body, "<p>Rust 2.0</p>");
    }

    #[test]
    fn author_notification_names_the_author() {
        let content = composer()
            .post_notification(&post(), "alice", &recipient(RecipientReason::Author))
            .unwrap();

        assert_eq!(content.subject, "New publication from alice");
        assert!(content.text_body.contains("Author alice has published a new post!"));
    }

    #[test]
    fn digest_lists_every_post() {
        let category = Category::new("Tech");
        let posts = vec![post(), post()];
        let content = composer().weekly_digest(&category, &posts, "u1").unwrap();

        assert_eq!(content.subject, "New posts in \"Tech\" this week");
        assert_eq!(content.text_body.matches("- Rust 2.0: ").count(), 2);

        let email = content.addressed("portal@example.com", "u1@example.com");
        assert_eq!(email.to, vec!["u1@example.com".to_string()]);
        assert_eq!(email.html_body.as_deref(), Some("<p>2 posts</p>"));
    }
}
