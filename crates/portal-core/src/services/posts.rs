//! Post lifecycle: create under the posting limit, edit and delete own posts,
//! read through the cache, vote.

use uuid::Uuid;

use super::Repositories;
use super::post_cache::PostCache;
use super::posting_limit::PostingLimiter;
use crate::domain::{MAX_TITLE_CHARS, Post, PostKind};
use crate::error::DomainError;
use crate::ports::{Page, PageRequest, PostFilter, RateLimitResult};

/// Input for a new post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub kind: PostKind,
    pub title: String,
    pub content: String,
    pub category_ids: Vec<Uuid>,
}

/// Replacement fields for an existing post. The kind is fixed by the route.
#[derive(Debug, Clone)]
pub struct PostEdit {
    pub title: String,
    pub content: String,
    pub category_ids: Vec<Uuid>,
}

pub struct PostService {
    repos: Repositories,
    limiter: PostingLimiter,
    cache: PostCache,
}

impl PostService {
    pub fn new(repos: Repositories, limiter: PostingLimiter, cache: PostCache) -> Self {
        Self {
            repos,
            limiter,
            cache,
        }
    }

    /// The author's current allowance, or `None` when the user is not an author.
    pub async fn allowance(&self, user_id: Uuid) -> Result<Option<RateLimitResult>, DomainError> {
        if self.repos.authors.find_by_id(user_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.limiter.check(user_id).await?))
    }

    pub async fn create(&self, user_id: Uuid, input: NewPost) -> Result<Post, DomainError> {
        if self.repos.authors.find_by_id(user_id).await?.is_none() {
            return Err(DomainError::NotAnAuthor);
        }
        self.validate(&input.title, &input.content, &input.category_ids)
            .await?;

        let allowance = self.limiter.check(user_id).await?;
        if !allowance.allowed {
            tracing::info!(author_id = %user_id, kind = %input.kind, "Posting limit reached");
            return Err(DomainError::PostingLimitExceeded {
                kind: input.kind,
                limit: self.limiter.policy().max_posts,
                retry_after: allowance.reset_after,
            });
        }

        let post = Post::new(
            user_id,
            input.kind,
            input.title.trim().to_string(),
            input.content,
            dedup(input.category_ids),
        );
        let post = self.repos.posts.save(post).await?;

        tracing::info!(post_id = %post.id, author_id = %user_id, kind = %post.kind, "Post created");
        Ok(post)
    }

    pub async fn get(&self, id: Uuid) -> Result<Post, DomainError> {
        let posts = self.repos.posts.clone();
        self.cache
            .get_or_load(id, || async move { posts.find_by_id(id).await })
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Post",
                id,
            })
    }

    pub async fn search(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> Result<Page<Post>, DomainError> {
        Ok(self.repos.posts.search(filter, page).await?)
    }

    pub async fn by_author(&self, author_id: Uuid) -> Result<Vec<Post>, DomainError> {
        Ok(self.repos.posts.find_by_author(author_id).await?)
    }

    /// Edit a post the user wrote. A post of another kind or another author
    /// reads as missing.
    pub async fn update(
        &self,
        user_id: Uuid,
        kind: PostKind,
        id: Uuid,
        edit: PostEdit,
    ) -> Result<Post, DomainError> {
        let mut post = self.owned(user_id, kind, id).await?;
        self.validate(&edit.title, &edit.content, &edit.category_ids)
            .await?;

        post.title = edit.title.trim().to_string();
        post.content = edit.content;
        post.category_ids = dedup(edit.category_ids);

        let post = self.repos.posts.save(post).await?;
        self.cache.invalidate(id).await;

        tracing::info!(post_id = %id, "Post updated");
        Ok(post)
    }

    pub async fn delete(&self, user_id: Uuid, kind: PostKind, id: Uuid) -> Result<(), DomainError> {
        self.owned(user_id, kind, id).await?;
        self.repos.posts.delete(id).await?;
        self.cache.invalidate(id).await;

        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    pub async fn like(&self, id: Uuid) -> Result<i64, DomainError> {
        self.vote(id, 1).await
    }

    pub async fn dislike(&self, id: Uuid) -> Result<i64, DomainError> {
        self.vote(id, -1).await
    }

    async fn vote(&self, id: Uuid, delta: i64) -> Result<i64, DomainError> {
        let score = self.repos.posts.adjust_score(id, delta).await.map_err(|e| match e {
            crate::error::RepoError::NotFound => DomainError::NotFound {
                entity_type: "Post",
                id,
            },
            other => other.into(),
        })?;
        self.cache.invalidate(id).await;
        Ok(score)
    }

    async fn owned(&self, user_id: Uuid, kind: PostKind, id: Uuid) -> Result<Post, DomainError> {
        match self.repos.posts.find_by_id(id).await? {
            Some(post) if post.author_id == user_id && post.kind == kind => Ok(post),
            _ => Err(DomainError::NotFound {
                entity_type: "Post",
                id,
            }),
        }
    }

    async fn validate(
        &self,
        title: &str,
        content: &str,
        category_ids: &[Uuid],
    ) -> Result<(), DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::Validation("title must not be empty".into()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(DomainError::Validation(format!(
                "title must be at most {} characters",
                MAX_TITLE_CHARS
            )));
        }
        if content.trim().is_empty() {
            return Err(DomainError::Validation("content must not be empty".into()));
        }
        for category_id in category_ids {
            if self.repos.categories.find_by_id(*category_id).await?.is_none() {
                return Err(DomainError::Validation(format!(
                    "unknown category {}",
                    category_id
                )));
            }
        }
        Ok(())
    }
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
