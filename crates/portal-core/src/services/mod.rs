//! Application services built on top of the ports.

mod authors;
mod comments;
mod composer;
mod digest;
mod fanout;
mod post_cache;
mod posting_limit;
mod posts;
mod subscriptions;

use std::sync::Arc;

use crate::ports::{
    AuthorRepository, CategoryRepository, CommentRepository, PostRepository, UserRepository,
};

pub use authors::{AuthorProfile, AuthorService};
pub use comments::CommentService;
pub use composer::{EmailContent, NotificationComposer, Recipient, RecipientReason};
pub use digest::{DIGEST_WINDOW_DAYS, DigestJob, DigestReport};
pub use fanout::{
    DEFAULT_CONCURRENCY, DispatchReport, FanOutDispatcher, NotificationDelivery,
    POST_PUBLISHED_JOB, PostPublished, collect_recipients,
};
pub use post_cache::PostCache;
pub use posting_limit::{PostingLimiter, PostingPolicy};
pub use posts::{NewPost, PostEdit, PostService};
pub use subscriptions::SubscriptionService;

/// Handles to every content repository, shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub authors: Arc<dyn AuthorRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    /// Use one store that implements every repository.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + AuthorRepository
            + CategoryRepository
            + PostRepository
            + CommentRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            authors: store.clone(),
            categories: store.clone(),
            posts: store.clone(),
            comments: store,
        }
    }
}
