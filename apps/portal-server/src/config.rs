//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use portal_core::domain::Censor;
use portal_core::services::{DEFAULT_CONCURRENCY, PostingPolicy};
use portal_infra::JwtConfig;

#[cfg(feature = "postgres")]
use portal_infra::DatabaseConfig;
#[cfg(feature = "rate-limit")]
use portal_infra::RateLimitConfig;
#[cfg(feature = "smtp")]
use portal_infra::{SmtpConfig, SmtpSecurity};

/// Where cached posts live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Where background jobs are queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Memory,
    Redis,
}

impl FromStr for QueueBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown job queue backend '{}'", other)),
        }
    }
}

/// Whether new-post notifications go out before the create request returns
/// or through the job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMode {
    Inline,
    Queued,
}

impl FromStr for NotificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" | "sync" => Ok(Self::Inline),
            "queued" | "async" => Ok(Self::Queued),
            other => Err(format!("unknown notification mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub backend: QueueBackend,
    pub workers: usize,
    pub max_size: usize,
    pub queue_name: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Sender address of every outbound message.
    pub from: String,
    /// Base URL used for links inside messages.
    pub site_url: String,
    /// Receive a message for every error logged by the server.
    pub admins: Vec<String>,
    /// `None` when `SMTP_HOST` is unset; messages are then only logged.
    #[cfg(feature = "smtp")]
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Six-field cron expression (seconds first).
    pub schedule: String,
    pub enabled: bool,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    pub redis_url: String,
    pub cache_backend: CacheBackend,
    pub post_cache_ttl: Duration,
    pub jobs: JobsConfig,
    pub notification_mode: NotificationMode,
    /// Sends in flight at once while notifying subscribers of one post.
    pub notification_concurrency: usize,
    pub mail: MailConfig,
    pub digest: DigestConfig,
    pub posting: PostingPolicy,
    pub jwt: JwtConfig,
    /// Words masked in post titles and text served by the API.
    pub censor: Censor,
    #[cfg(feature = "rate-limit")]
    pub rate_limit: RateLimitConfig,
}

/// Weekly digest: Mondays at 08:00.
pub const DEFAULT_DIGEST_SCHEDULE: &str = "0 0 8 * * Mon";

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        #[cfg(feature = "postgres")]
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: parsed("DB_MAX_CONNECTIONS", 100),
            min_connections: parsed("DB_MIN_CONNECTIONS", 10),
        });

        let jwt_defaults = JwtConfig::default();
        let posting_defaults = PostingPolicy::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT", 8080),
            #[cfg(feature = "postgres")]
            database,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            cache_backend: parsed("CACHE_BACKEND", CacheBackend::Memory),
            post_cache_ttl: Duration::from_secs(parsed("POST_CACHE_TTL_SECS", 300)),
            jobs: JobsConfig {
                backend: parsed("JOB_QUEUE_BACKEND", QueueBackend::Memory),
                workers: parsed("JOB_QUEUE_WORKERS", 4),
                max_size: parsed("JOB_QUEUE_MAX_SIZE", 10_000),
                queue_name: env::var("JOB_QUEUE_NAME")
                    .unwrap_or_else(|_| "portal:jobs".to_string()),
            },
            notification_mode: parsed("NOTIFICATION_MODE", NotificationMode::Queued),
            notification_concurrency: parsed("NOTIFICATION_CONCURRENCY", DEFAULT_CONCURRENCY)
                .max(1),
            mail: MailConfig {
                from: env::var("MAIL_FROM").unwrap_or_else(|_| "portal@localhost".to_string()),
                site_url: env::var("SITE_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string()),
                admins: env::var("ADMINS").map(|raw| address_list(&raw)).unwrap_or_default(),
                #[cfg(feature = "smtp")]
                smtp: env::var("SMTP_HOST").ok().map(|host| SmtpConfig {
                    host,
                    port: parsed("SMTP_PORT", 587),
                    user: env::var("SMTP_USER").ok(),
                    password: env::var("SMTP_PASSWORD").ok(),
                    security: parsed("SMTP_TLS", SmtpSecurity::StartTls),
                }),
            },
            digest: DigestConfig {
                schedule: env::var("DIGEST_SCHEDULE")
                    .unwrap_or_else(|_| DEFAULT_DIGEST_SCHEDULE.to_string()),
                enabled: flag("SCHEDULER_ENABLED", true),
            },
            posting: PostingPolicy {
                max_posts: parsed("POSTING_LIMIT_MAX", posting_defaults.max_posts),
                window: chrono::Duration::hours(parsed(
                    "POSTING_LIMIT_WINDOW_HOURS",
                    posting_defaults.window.num_hours(),
                )),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").unwrap_or(jwt_defaults.secret),
                expiration_hours: parsed("JWT_EXPIRATION_HOURS", jwt_defaults.expiration_hours),
                issuer: env::var("JWT_ISSUER").unwrap_or(jwt_defaults.issuer),
            },
            censor: env::var("CENSORED_WORDS")
                .map(|raw| Censor::from_list(&raw))
                .unwrap_or_default(),
            #[cfg(feature = "rate-limit")]
            rate_limit: RateLimitConfig {
                max_requests: parsed("RATE_LIMIT_MAX_REQUESTS", 100),
                window: Duration::from_secs(parsed("RATE_LIMIT_WINDOW_SECS", 60)),
            },
        }
    }
}

/// Read and parse `key`, falling back to `default` when unset or invalid.
fn parsed<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key = %key, value = %raw, error = %e, "Ignoring invalid setting");
            default
        }
    }
}

/// Comma separated addresses, blanks dropped.
pub(crate) fn address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_parse_case_insensitively() {
        assert_eq!("Redis".parse::<CacheBackend>(), Ok(CacheBackend::Redis));
        assert_eq!("memory".parse::<QueueBackend>(), Ok(QueueBackend::Memory));
        assert!("memcached".parse::<CacheBackend>().is_err());
    }

    #[test]
    fn notification_mode_accepts_aliases() {
        assert_eq!("sync".parse::<NotificationMode>(), Ok(NotificationMode::Inline));
        assert_eq!("QUEUED".parse::<NotificationMode>(), Ok(NotificationMode::Queued));
    }

    #[test]
    fn invalid_values_fall_back_to_default() {
        assert_eq!(parse_or("PORT", "eighty", 8080u16), 8080);
        assert_eq!(parse_or("PORT", " 9000 ", 8080u16), 9000);
        assert_eq!(
            parse_or("NOTIFICATION_MODE", "later", NotificationMode::Inline),
            NotificationMode::Inline
        );
    }

    #[test]
    fn admin_addresses_are_split_and_trimmed() {
        assert_eq!(
            address_list(" ops@example.com, ,dev@example.com "),
            vec!["ops@example.com".to_string(), "dev@example.com".to_string()]
        );
        assert!(address_list("").is_empty());
    }
}
