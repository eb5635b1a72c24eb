use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of characters kept by [`Post::preview`].
pub const PREVIEW_CHARS: usize = 150;

/// Maximum title length accepted for a post.
pub const MAX_TITLE_CHARS: usize = 100;

/// The two kinds of publication an author can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    News,
    Article,
}

/// Per-kind presentation and storage settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostKindConfig {
    pub kind: PostKind,
    /// Two-letter code stored in the `posts.kind` column.
    pub code: &'static str,
    /// Path segment used by edit/delete routes and the `type` query parameter.
    pub slug: &'static str,
    pub display_name: &'static str,
    pub content_label: &'static str,
}

const NEWS_CONFIG: PostKindConfig = PostKindConfig {
    kind: PostKind::News,
    code: "NW",
    slug: "news",
    display_name: "News",
    content_label: "News text:",
};

const ARTICLE_CONFIG: PostKindConfig = PostKindConfig {
    kind: PostKind::Article,
    code: "AR",
    slug: "article",
    display_name: "Article",
    content_label: "Article text:",
};

impl PostKind {
    pub const ALL: [PostKind; 2] = [PostKind::News, PostKind::Article];

    pub fn config(self) -> &'static PostKindConfig {
        match self {
            PostKind::News => &NEWS_CONFIG,
            PostKind::Article => &ARTICLE_CONFIG,
        }
    }

    pub fn code(self) -> &'static str {
        self.config().code
    }

    pub fn slug(self) -> &'static str {
        self.config().slug
    }

    /// Resolve a kind from its stored two-letter code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PostKind {
    type Err = String;

    /// Accepts the slug (`news`, `article`) or the plural `articles` used by
    /// the edit routes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "news" => Ok(PostKind::News),
            "article" | "articles" => Ok(PostKind::Article),
            other => Err(format!("unknown post type '{}'", other)),
        }
    }
}

/// Post entity - a news item or an article.
///
/// `created_at` is fixed when the post is first created and `score` only
/// moves through like/dislike; repositories never write either column on
/// update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub kind: PostKind,
    pub title: String,
    pub content: String,
    pub score: i64,
    pub category_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post with a fresh id, zero score and the current time.
    pub fn new(
        author_id: Uuid,
        kind: PostKind,
        title: String,
        content: String,
        category_ids: Vec<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            kind,
            title,
            content,
            score: 0,
            category_ids,
            created_at: Utc::now(),
        }
    }

    /// Set an explicit creation time. Used by seeding and tests.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// First [`PREVIEW_CHARS`] characters of the content.
    pub fn preview(&self) -> String {
        preview_of(&self.content, PREVIEW_CHARS)
    }

    pub fn in_category(&self, category_id: Uuid) -> bool {
        self.category_ids.contains(&category_id)
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when shortened.
pub fn preview_of(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_config_is_selected_by_variant() {
        assert_eq!(PostKind::News.config().content_label, "News text:");
        assert_eq!(PostKind::Article.config().content_label, "Article text:");
        assert_eq!(PostKind::from_code("NW"), Some(PostKind::News));
        assert_eq!(PostKind::from_code("AR"), Some(PostKind::Article));
        assert_eq!(PostKind::from_code("XX"), None);
    }

    #[test]
    fn kind_parses_slugs() {
        assert_eq!("news".parse::<PostKind>(), Ok(PostKind::News));
        assert_eq!("Articles".parse::<PostKind>(), Ok(PostKind::Article));
        assert!("video".parse::<PostKind>().is_err());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "й".repeat(200);
        let preview = preview_of(&long, 150);
        assert_eq!(preview.chars().count(), 153);
        assert!(preview.ends_with("..."));

        assert_eq!(preview_of("short", 150), "short");
    }
}
