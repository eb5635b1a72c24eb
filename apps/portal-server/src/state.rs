//! Application state - shared across all handlers.

use std::sync::Arc;

use portal_core::domain::Censor;
use portal_core::ports::{Cache, JobQueue, MailTransport, PasswordService, TokenService};
use portal_core::services::{
    AuthorService, CommentService, DigestJob, FanOutDispatcher, NotificationComposer,
    NotificationDelivery, PostCache, PostService, PostingLimiter, Repositories,
    SubscriptionService,
};
use portal_infra::{
    Argon2PasswordService, AskamaRenderer, InMemoryCache, InMemoryContentStore, InMemoryJobQueue,
    InMemoryJobQueueConfig, JwtTokenService, LogMailer,
};

#[cfg(feature = "postgres")]
use portal_infra::{DatabaseConnections, postgres_repositories};
#[cfg(feature = "redis")]
use portal_infra::{RedisCache, RedisConfig, RedisJobQueue, RedisJobQueueConfig};
#[cfg(feature = "smtp")]
use portal_infra::SmtpMailer;

use crate::config::{AppConfig, CacheBackend, NotificationMode, QueueBackend};

/// The adapters behind the ports, chosen from configuration.
#[derive(Clone)]
pub struct Adapters {
    pub repos: Repositories,
    pub cache: Arc<dyn Cache>,
    pub mail: Arc<dyn MailTransport>,
    pub queue: Arc<dyn JobQueue>,
    #[cfg(feature = "postgres")]
    pub db: Option<Arc<DatabaseConnections>>,
}

impl Adapters {
    /// Connect every configured backend. A backend that cannot be reached is
    /// replaced by its in-memory counterpart and the failure is logged.
    pub async fn connect(config: &AppConfig) -> Self {
        #[cfg(feature = "postgres")]
        let (repos, db) = connect_store(config).await;
        #[cfg(not(feature = "postgres"))]
        let repos = memory_store();

        Self {
            repos,
            cache: connect_cache(config).await,
            mail: connect_mail(config),
            queue: connect_queue(config).await,
            #[cfg(feature = "postgres")]
            db,
        }
    }

    /// Everything in process memory.
    pub fn in_memory(mail: Arc<dyn MailTransport>) -> Self {
        Self {
            repos: memory_store(),
            cache: Arc::new(InMemoryCache::new()),
            mail,
            queue: Arc::new(InMemoryJobQueue::default()),
            #[cfg(feature = "postgres")]
            db: None,
        }
    }
}

fn memory_store() -> Repositories {
    Repositories::from_store(Arc::new(InMemoryContentStore::new()))
}

#[cfg(feature = "postgres")]
async fn connect_store(config: &AppConfig) -> (Repositories, Option<Arc<DatabaseConnections>>) {
    let Some(db_config) = config.database.as_ref() else {
        tracing::warn!("DATABASE_URL not set. Content is kept in memory and lost on exit.");
        return (memory_store(), None);
    };

    match DatabaseConnections::init(db_config).await {
        Ok(connections) => {
            let conn = Arc::new(connections);
            (postgres_repositories(conn.main.clone()), Some(conn))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database. Using in-memory store.");
            (memory_store(), None)
        }
    }
}

async fn connect_cache(config: &AppConfig) -> Arc<dyn Cache> {
    match config.cache_backend {
        CacheBackend::Memory => Arc::new(InMemoryCache::new()),
        #[cfg(feature = "redis")]
        CacheBackend::Redis => {
            let redis = RedisConfig {
                url: config.redis_url.clone(),
                ..RedisConfig::default()
            };
            match RedisCache::new(redis).await {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Failed to connect to Redis cache. Using in-memory cache."
                    );
                    Arc::new(InMemoryCache::new())
                }
            }
        }
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => {
            tracing::warn!("Built without the redis feature. Using in-memory cache.");
            Arc::new(InMemoryCache::new())
        }
    }
}

async fn connect_queue(config: &AppConfig) -> Arc<dyn JobQueue> {
    let memory = || -> Arc<dyn JobQueue> {
        Arc::new(InMemoryJobQueue::new(InMemoryJobQueueConfig {
            max_size: config.jobs.max_size,
            workers: config.jobs.workers,
        }))
    };

    match config.jobs.backend {
        QueueBackend::Memory => memory(),
        #[cfg(feature = "redis")]
        QueueBackend::Redis => {
            let queue_config = RedisJobQueueConfig {
                redis: RedisConfig {
                    url: config.redis_url.clone(),
                    ..RedisConfig::default()
                },
                queue_name: config.jobs.queue_name.clone(),
                workers: config.jobs.workers,
                ..RedisJobQueueConfig::default()
            };
            match RedisJobQueue::new(queue_config).await {
                Ok(queue) => Arc::new(queue),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Failed to connect to Redis queue. Using in-memory queue."
                    );
                    memory()
                }
            }
        }
        #[cfg(not(feature = "redis"))]
        QueueBackend::Redis => {
            tracing::warn!("Built without the redis feature. Using in-memory queue.");
            memory()
        }
    }
}

fn connect_mail(config: &AppConfig) -> Arc<dyn MailTransport> {
    #[cfg(feature = "smtp")]
    if let Some(smtp) = config.mail.smtp.as_ref() {
        match SmtpMailer::new(smtp) {
            Ok(mailer) => {
                tracing::info!(host = %smtp.host, port = smtp.port, "SMTP mail transport ready");
                return Arc::new(mailer);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Invalid SMTP configuration. Mail will only be logged."
                );
            }
        }
    }

    #[cfg(not(feature = "smtp"))]
    let _ = config;

    tracing::warn!("No SMTP server configured. Outbound mail is written to the log.");
    Arc::new(LogMailer)
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub authors: Arc<AuthorService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub dispatcher: Arc<FanOutDispatcher>,
    pub delivery: NotificationDelivery,
    pub digest: Arc<DigestJob>,
    pub queue: Arc<dyn JobQueue>,
    pub mail: Arc<dyn MailTransport>,
    /// Applied to post text in API responses.
    pub censor: Censor,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    #[cfg(feature = "postgres")]
    pub db: Option<Arc<DatabaseConnections>>,
}

impl AppState {
    /// Build the application state with the configured backends.
    pub async fn new(config: &AppConfig) -> Self {
        let state = Self::assemble(Adapters::connect(config).await, config);
        tracing::info!("Application state initialized");
        state
    }

    /// Wire the services on top of already chosen adapters.
    pub fn assemble(adapters: Adapters, config: &AppConfig) -> Self {
        let repos = adapters.repos;
        let composer = Arc::new(NotificationComposer::new(
            Arc::new(AskamaRenderer::new()),
            config.mail.site_url.clone(),
        ));

        let posts = PostService::new(
            repos.clone(),
            PostingLimiter::new(repos.posts.clone(), config.posting),
            PostCache::new(adapters.cache, Some(config.post_cache_ttl)),
        );
        let dispatcher = Arc::new(
            FanOutDispatcher::new(
                repos.clone(),
                composer.clone(),
                adapters.mail.clone(),
                config.mail.from.clone(),
            )
            .with_concurrency(config.notification_concurrency),
        );
        let delivery = match config.notification_mode {
            NotificationMode::Inline => NotificationDelivery::Inline(dispatcher.clone()),
            NotificationMode::Queued => NotificationDelivery::Queued(adapters.queue.clone()),
        };
        let digest = DigestJob::new(
            repos.clone(),
            composer,
            adapters.mail.clone(),
            config.mail.from.clone(),
        );

        Self {
            posts: Arc::new(posts),
            comments: Arc::new(CommentService::new(repos.clone())),
            authors: Arc::new(AuthorService::new(repos.clone())),
            subscriptions: Arc::new(SubscriptionService::new(repos.clone())),
            dispatcher,
            delivery,
            digest: Arc::new(digest),
            queue: adapters.queue,
            mail: adapters.mail,
            censor: config.censor.clone(),
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            passwords: Arc::new(Argon2PasswordService::new()),
            #[cfg(feature = "postgres")]
            db: adapters.db,
            repos,
        }
    }
}
