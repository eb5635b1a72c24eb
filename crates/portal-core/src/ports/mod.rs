//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod job_queue;
mod mail;
mod rate_limit;
mod repository;
mod template;

pub use auth::{
    AuthError, PasswordService, ROLE_AUTHOR, ROLE_READER, ROLE_STAFF, TokenClaims, TokenService,
};
pub use cache::{Cache, CacheError};
pub use job_queue::{Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats};
pub use mail::{MailError, MailTransport, OutboundEmail};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use repository::{
    AuthorRepository, BaseRepository, CategoryRepository, CommentRepository, Page, PageRequest,
    PostFilter, PostRepository, UserRepository,
};
pub use template::{
    POST_NOTIFICATION_TEMPLATE, PostNotificationContext, TemplateError, TemplateRenderer,
    WEEKLY_DIGEST_TEMPLATE, WeeklyDigestContext,
};
