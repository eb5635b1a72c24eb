//! Askama-rendered HTML bodies for notification mail.

use askama::Template;

use portal_core::domain::{Post, preview_of};
use portal_core::ports::{
    POST_NOTIFICATION_TEMPLATE, PostNotificationContext, TemplateError, TemplateRenderer,
    WEEKLY_DIGEST_TEMPLATE, WeeklyDigestContext,
};

/// Characters of content shown per post in the digest.
const DIGEST_PREVIEW_CHARS: usize = 100;

#[derive(Template)]
#[template(path = "post_notification.html")]
struct PostNotificationTemplate<'a> {
    username: &'a str,
    author_name: &'a str,
    kind: &'static str,
    title: &'a str,
    preview: String,
    post_url: &'a str,
}

struct DigestEntry<'a> {
    title: &'a str,
    preview: String,
    url: String,
}

#[derive(Template)]
#[template(path = "weekly_digest.html")]
struct WeeklyDigestTemplate<'a> {
    username: &'a str,
    category: &'a str,
    posts: Vec<DigestEntry<'a>>,
    site_url: &'a str,
}

/// Compiled-in templates; rendering never touches the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct AskamaRenderer;

impl AskamaRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn entry<'a>(post: &'a Post, site_url: &str) -> DigestEntry<'a> {
    DigestEntry {
        title: &post.title,
        preview: preview_of(&post.content, DIGEST_PREVIEW_CHARS),
        url: format!("{}/news/{}", site_url, post.id),
    }
}

impl TemplateRenderer for AskamaRenderer {
    fn render_post_notification(
        &self,
        ctx: &PostNotificationContext<'_>,
    ) -> Result<String, TemplateError> {
        PostNotificationTemplate {
            username: ctx.username,
            author_name: ctx.author_name,
            kind: ctx.post.kind.config().display_name,
            title: &ctx.post.title,
            preview: ctx.post.preview(),
            post_url: ctx.post_url,
        }
        .render()
        .map_err(|e| TemplateError {
            template: POST_NOTIFICATION_TEMPLATE,
            reason: e.to_string(),
        })
    }

    fn render_weekly_digest(&self, ctx: &WeeklyDigestContext<'_>) -> Result<String, TemplateError> {
        WeeklyDigestTemplate {
            username: ctx.username,
            category: &ctx.category.name,
            posts: ctx.posts.iter().map(|p| entry(p, ctx.site_url)).collect(),
            site_url: ctx.site_url,
        }
        .render()
        .map_err(|e| TemplateError {
            template: WEEKLY_DIGEST_TEMPLATE,
            reason: e.to_string(),
        })
    }
}
