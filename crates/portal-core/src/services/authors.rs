//! Author profiles and ratings.

use uuid::Uuid;

use super::Repositories;
use crate::domain::{Author, Post, RatingComponents, User};
use crate::error::DomainError;

/// An author with the account behind it, their posts and a fresh rating.
#[derive(Debug, Clone)]
pub struct AuthorProfile {
    pub author: Author,
    pub user: User,
    pub components: RatingComponents,
    pub posts: Vec<Post>,
}

pub struct AuthorService {
    repos: Repositories,
}

impl AuthorService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Register the user as an author. Calling it again returns the existing
    /// profile.
    pub async fn become_author(&self, user_id: Uuid) -> Result<Author, DomainError> {
        if self.repos.users.find_by_id(user_id).await?.is_none() {
            return Err(DomainError::NotFound {
                entity_type: "User",
                id: user_id,
            });
        }
        if let Some(author) = self.repos.authors.find_by_id(user_id).await? {
            return Ok(author);
        }

        let author = self.repos.authors.save(Author::new(user_id)).await?;
        tracing::info!(user_id = %user_id, "User became an author");
        Ok(author)
    }

    pub async fn is_author(&self, user_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.repos.authors.find_by_id(user_id).await?.is_some())
    }

    /// All authors with their account, by stored rating, best first.
    pub async fn list(&self) -> Result<Vec<(Author, User)>, DomainError> {
        let mut out = Vec::new();
        for author in self.repos.authors.list().await? {
            if let Some(user) = self.repos.users.find_by_id(author.user_id).await? {
                out.push((author, user));
            }
        }
        out.sort_by(|a, b| b.0.rating.cmp(&a.0.rating));
        Ok(out)
    }

    /// Recompute and store the rating from current scores.
    pub async fn refresh_rating(
        &self,
        author_id: Uuid,
    ) -> Result<(Author, RatingComponents), DomainError> {
        let mut author = self
            .repos
            .authors
            .find_by_id(author_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Author",
                id: author_id,
            })?;

        let components = self.repos.authors.rating_components(author_id).await?;
        author.rating = components.rating();
        self.repos.authors.store_rating(author_id, author.rating).await?;

        tracing::debug!(author_id = %author_id, rating = author.rating, "Author rating refreshed");
        Ok((author, components))
    }

    pub async fn profile(&self, author_id: Uuid) -> Result<AuthorProfile, DomainError> {
        let (author, components) = self.refresh_rating(author_id).await?;
        let user = self
            .repos
            .users
            .find_by_id(author_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "User",
                id: author_id,
            })?;
        let posts = self.repos.posts.find_by_author(author_id).await?;

        Ok(AuthorProfile {
            author,
            user,
            components,
            posts,
        })
    }
}
