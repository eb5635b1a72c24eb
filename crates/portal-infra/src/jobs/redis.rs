//! Redis-backed job queue on a LIST: producers RPUSH, workers BLPOP.
//!
//! Lets the HTTP server and a separate `worker` process share one queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use portal_core::ports::{Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats};

use crate::cache::RedisConfig;

#[derive(Debug, Clone)]
pub struct RedisJobQueueConfig {
    pub redis: RedisConfig,
    /// Queue name, used as the key prefix.
    pub queue_name: String,
    /// Number of worker consumers.
    pub workers: usize,
    /// Timeout for blocking pop (seconds).
    pub pop_timeout: u64,
}

impl Default for RedisJobQueueConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            queue_name: "portal:jobs".to_string(),
            workers: 4,
            pop_timeout: 5,
        }
    }
}

#[derive(Debug, Default)]
struct JobStats {
    processing: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

pub struct RedisJobQueue {
    conn: ConnectionManager,
    config: RedisJobQueueConfig,
    stats: Arc<JobStats>,
}

impl RedisJobQueue {
    pub async fn new(config: RedisJobQueueConfig) -> Result<Self, JobQueueError> {
        let client = Client::open(config.redis.url.as_str())
            .map_err(|e| JobQueueError::Backend(e.to_string()))?;

        let connect = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.redis.connect_timeout, connect)
            .await
            .map_err(|_| JobQueueError::Backend("Connection timed out".to_string()))?
            .map_err(|e| JobQueueError::Backend(e.to_string()))?;

        tracing::info!(
            url = %config.redis.url,
            queue = %config.queue_name,
            workers = config.workers,
            "Connected to Redis job queue"
        );

        Ok(Self {
            conn,
            config,
            stats: Arc::new(JobStats::default()),
        })
    }

    fn pending_key(&self) -> String {
        format!("{}:pending", self.config.queue_name)
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError> {
        let mut conn = self.conn.clone();
        let job_json =
            serde_json::to_string(&job).map_err(|e| JobQueueError::EnqueueError(e.to_string()))?;

        conn.rpush::<_, _, ()>(self.pending_key(), &job_json)
            .await
            .map_err(|e| JobQueueError::Backend(e.to_string()))?;

        tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Job enqueued");
        Ok(())
    }

    async fn start_worker(&self, handler: JobHandler) -> Result<(), JobQueueError> {
        let handler = Arc::new(handler);

        for worker_id in 0..self.config.workers.max(1) {
            let mut conn = self.conn.clone();
            let pending_key = self.pending_key();
            let stats = self.stats.clone();
            let handler = handler.clone();
            let pop_timeout = self.config.pop_timeout as f64;

            tokio::spawn(async move {
                tracing::info!(worker = worker_id, queue = %pending_key, "Job worker started");

                // Workers live as long as the process.
                loop {
                    let popped: Result<Option<(String, String)>, _> =
                        conn.blpop(&pending_key, pop_timeout).await;

                    let job_json = match popped {
                        Ok(Some((_, json))) => json,
                        Ok(None) => continue,
                        Err(e) => {
                            tracing::error!(error = %e, "Redis BLPOP error");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            continue;
                        }
                    };

                    let job: Job = match serde_json::from_str(&job_json) {
                        Ok(job) => job,
                        Err(e) => {
                            tracing::error!(error = %e, "Dropping undecodable job");
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                    };

                    let job_id = job.id.clone();
                    tracing::debug!(
                        worker = worker_id,
                        job_id = %job_id,
                        job_type = %job.job_type,
                        "Processing job"
                    );

                    stats.processing.fetch_add(1, Ordering::Relaxed);
                    let result = handler(job).await;
                    stats.processing.fetch_sub(1, Ordering::Relaxed);

                    match result {
                        JobResult::Success => {
                            stats.completed.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!(job_id = %job_id, "Job completed");
                        }
                        JobResult::Failed(reason) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(job_id = %job_id, reason = %reason, "Job failed");
                        }
                    }
                }
            });
        }

        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        let mut conn = self.conn.clone();
        let pending: usize = conn
            .llen(self.pending_key())
            .await
            .map_err(|e| JobQueueError::Backend(e.to_string()))?;

        Ok(QueueStats {
            pending,
            processing: self.stats.processing.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        })
    }
}
