//! Comments under posts and their votes.

use uuid::Uuid;

use super::Repositories;
use crate::domain::Comment;
use crate::error::{DomainError, RepoError};

pub struct CommentService {
    repos: Repositories,
}

impl CommentService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn list(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        self.ensure_post(post_id).await?;
        Ok(self.repos.comments.find_by_post(post_id).await?)
    }

    pub async fn add(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        text: String,
    ) -> Result<Comment, DomainError> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(DomainError::Validation("comment must not be empty".into()));
        }
        self.ensure_post(post_id).await?;

        let comment = self.repos.comments.save(Comment::new(post_id, user_id, text)).await?;
        tracing::debug!(comment_id = %comment.id, post_id = %post_id, "Comment added");
        Ok(comment)
    }

    pub async fn like(&self, id: Uuid) -> Result<i64, DomainError> {
        self.vote(id, 1).await
    }

    pub async fn dislike(&self, id: Uuid) -> Result<i64, DomainError> {
        self.vote(id, -1).await
    }

    async fn vote(&self, id: Uuid, delta: i64) -> Result<i64, DomainError> {
        self.repos.comments.adjust_score(id, delta).await.map_err(|e| match e {
            RepoError::NotFound => DomainError::NotFound {
                entity_type: "Comment",
                id,
            },
            other => other.into(),
        })
    }

    async fn ensure_post(&self, post_id: Uuid) -> Result<(), DomainError> {
        match self.repos.posts.find_by_id(post_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::NotFound {
                entity_type: "Post",
                id: post_id,
            }),
        }
    }
}
