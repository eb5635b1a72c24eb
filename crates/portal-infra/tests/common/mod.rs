#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use portal_core::domain::{
    Category, PostKind, SubscriptionAction, SubscriptionTarget, User,
};
use portal_core::ports::{BaseRepository, Cache, MailTransport};
use portal_core::services::{
    AuthorService, CommentService, DigestJob, FanOutDispatcher, NewPost, NotificationComposer,
    PostCache, PostService, PostingLimiter, PostingPolicy, Repositories, SubscriptionService,
};
use portal_infra::{AskamaRenderer, InMemoryCache, InMemoryContentStore, InMemoryMailbox};
use uuid::Uuid;

pub const FROM: &str = "portal@example.com";
pub const SITE: &str = "http://portal.test";

pub struct World {
    pub store: Arc<InMemoryContentStore>,
    pub repos: Repositories,
    pub mailbox: Arc<InMemoryMailbox>,
    pub cache: Arc<InMemoryCache>,
    pub posts: PostService,
    pub comments: CommentService,
    pub authors: AuthorService,
    pub subscriptions: SubscriptionService,
    pub dispatcher: Arc<FanOutDispatcher>,
    pub digest: DigestJob,
}

impl World {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryContentStore::new());
        let repos = Repositories::from_store(store.clone());
        let mailbox = Arc::new(InMemoryMailbox::new());
        let cache = Arc::new(InMemoryCache::new());

        let composer = Arc::new(NotificationComposer::new(Arc::new(AskamaRenderer), SITE));
        let mail: Arc<dyn MailTransport> = mailbox.clone();
        let cache_port: Arc<dyn Cache> = cache.clone();

        let posts = PostService::new(
            repos.clone(),
            PostingLimiter::new(repos.posts.clone(), PostingPolicy::default()),
            PostCache::new(cache_port, Some(Duration::from_secs(300))),
        );
        let dispatcher = Arc::new(FanOutDispatcher::new(
            repos.clone(),
            composer.clone(),
            mail.clone(),
            FROM,
        ));

        Self {
            comments: CommentService::new(repos.clone()),
            authors: AuthorService::new(repos.clone()),
            subscriptions: SubscriptionService::new(repos.clone()),
            digest: DigestJob::new(repos.clone(), composer, mail, FROM),
            store,
            repos,
            mailbox,
            cache,
            posts,
            dispatcher,
        }
    }

    pub async fn user(&self, name: &str) -> User {
        self.user_with_email(name, &format!("{}@example.com", name))
            .await
    }

    pub async fn user_with_email(&self, name: &str, email: &str) -> User {
        self.repos
            .users
            .save(User::new(name.into(), email.into(), String::new()))
            .await
            .unwrap()
    }

    pub async fn author(&self, name: &str) -> User {
        let user = self.user(name).await;
        self.authors.become_author(user.id).await.unwrap();
        user
    }

    pub async fn category(&self, name: &str) -> Category {
        self.repos.categories.save(Category::new(name)).await.unwrap()
    }

    pub async fn follow_category(&self, user: &User, category: &Category) {
        self.subscriptions
            .apply(
                user.id,
                SubscriptionAction::Subscribe,
                SubscriptionTarget::Category,
                category.id,
            )
            .await
            .unwrap();
    }

    pub async fn follow_author(&self, user: &User, author: &User) {
        self.subscriptions
            .apply(
                user.id,
                SubscriptionAction::Subscribe,
                SubscriptionTarget::Author,
                author.id,
            )
            .await
            .unwrap();
    }
}

pub fn news(title: &str, categories: &[Uuid]) -> NewPost {
    NewPost {
        kind: PostKind::News,
        title: title.into(),
        content: format!("{} body text", title),
        category_ids: categories.to_vec(),
    }
}
