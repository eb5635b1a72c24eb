//! Content store ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Author, Category, Comment, Post, RatingComponents, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID. Dependents are removed with it.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Reader accounts.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
}

/// Author profiles and the reader → author subscription relation.
#[async_trait]
pub trait AuthorRepository: BaseRepository<Author, Uuid> {
    async fn list(&self) -> Result<Vec<Author>, RepoError>;

    /// Readers subscribed to the author.
    async fn subscribers(&self, author_id: Uuid) -> Result<Vec<User>, RepoError>;

    async fn add_subscriber(&self, author_id: Uuid, user_id: Uuid) -> Result<(), RepoError>;

    async fn remove_subscriber(&self, author_id: Uuid, user_id: Uuid) -> Result<(), RepoError>;

    /// Aggregate the scores the author's rating is computed from.
    async fn rating_components(&self, author_id: Uuid) -> Result<RatingComponents, RepoError>;

    /// Persist a freshly computed rating.
    async fn store_rating(&self, author_id: Uuid, rating: i64) -> Result<(), RepoError>;
}

/// Categories and the reader → category subscription relation.
#[async_trait]
pub trait CategoryRepository: BaseRepository<Category, Uuid> {
    async fn list(&self) -> Result<Vec<Category>, RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, RepoError>;

    /// Readers subscribed to the category.
    async fn subscribers(&self, category_id: Uuid) -> Result<Vec<User>, RepoError>;

    async fn add_subscriber(&self, category_id: Uuid, user_id: Uuid) -> Result<(), RepoError>;

    async fn remove_subscriber(&self, category_id: Uuid, user_id: Uuid)
    -> Result<(), RepoError>;
}

/// Search criteria for post listings. Text filters are case-insensitive
/// substring matches.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub title: Option<String>,
    pub author_username: Option<String>,
    pub published_after: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
}

/// 1-based page request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u64 = 5;
    pub const MAX_PER_PAGE: u64 = 100;
    /// Pages past this one are always empty; the cap keeps offsets in range.
    pub const MAX_PAGE: u64 = 1_000_000;

    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.clamp(1, Self::MAX_PAGE),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PER_PAGE)
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Posts. `save` on an existing post updates kind, title, content and
/// categories only.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// All posts of an author, newest first.
    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError>;

    /// Creation times of the author's posts with `created_at >= since`.
    async fn created_by_author_since(
        &self,
        author_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, RepoError>;

    /// Posts filed under the category with `created_at >= since`, newest first.
    async fn find_by_category_since(
        &self,
        category_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Post>, RepoError>;

    /// Filtered listing, newest first.
    async fn search(&self, filter: &PostFilter, page: PageRequest)
    -> Result<Page<Post>, RepoError>;

    /// Add `delta` to the score and return the new score.
    async fn adjust_score(&self, id: Uuid, delta: i64) -> Result<i64, RepoError>;
}

/// Comments under posts.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Comments of a post, oldest first.
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    /// Add `delta` to the score and return the new score.
    async fn adjust_score(&self, id: Uuid, delta: i64) -> Result<i64, RepoError>;
}
