//! # Portal Infrastructure
//!
//! Concrete implementations of the ports defined in `portal-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - In-memory adapters only
//! - `postgres` - PostgreSQL content store via SeaORM
//! - `auth` - JWT + Argon2 authentication
//! - `rate-limit` - Per-client request throttling via governor
//! - `redis` - Redis cache and job queue
//! - `smtp` - SMTP mail delivery via lettre

pub mod cache;
pub mod database;
pub mod jobs;
pub mod mail;
pub mod templates;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use database::InMemoryContentStore;
pub use jobs::{InMemoryJobQueue, InMemoryJobQueueConfig};
pub use mail::{InMemoryMailbox, LogMailer};
pub use templates::AskamaRenderer;

#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, DatabaseConnections, postgres_repositories};

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{KeyedRateLimiter, RateLimitConfig};

#[cfg(feature = "smtp")]
pub use mail::{SmtpConfig, SmtpMailer, SmtpSecurity};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
#[cfg(feature = "redis")]
pub use jobs::{RedisJobQueue, RedisJobQueueConfig};
