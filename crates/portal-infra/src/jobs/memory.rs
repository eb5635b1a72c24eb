//! In-process job queue.
//!
//! Jobs live in a bounded channel drained by local worker tasks. Pending jobs
//! are lost when the process exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use portal_core::ports::{Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats};

#[derive(Debug, Clone)]
pub struct InMemoryJobQueueConfig {
    /// Maximum number of pending jobs.
    pub max_size: usize,
    /// Number of worker tasks.
    pub workers: usize,
}

impl Default for InMemoryJobQueueConfig {
    fn default() -> Self {
        Self {
            max_size: 10000,
            workers: 4,
        }
    }
}

#[derive(Default)]
struct JobStats {
    pending: AtomicUsize,
    processing: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

pub struct InMemoryJobQueue {
    stats: Arc<JobStats>,
    config: InMemoryJobQueueConfig,
    sender: mpsc::Sender<Job>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl InMemoryJobQueue {
    pub fn new(config: InMemoryJobQueueConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.max_size.max(1));

        Self {
            stats: Arc::new(JobStats::default()),
            config,
            sender: tx,
            receiver: Arc::new(Mutex::new(rx)),
        }
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new(InMemoryJobQueueConfig::default())
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError> {
        let job_id = job.id.clone();
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => JobQueueError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => {
                JobQueueError::EnqueueError("queue closed".to_string())
            }
        })?;
        let pending = self.stats.pending.fetch_add(1, Ordering::Relaxed) + 1;

        tracing::debug!(job_id = %job_id, pending, "Job enqueued");
        Ok(())
    }

    async fn start_worker(&self, handler: JobHandler) -> Result<(), JobQueueError> {
        let handler = Arc::new(handler);

        for worker_id in 0..self.config.workers.max(1) {
            let handler = handler.clone();
            let receiver = self.receiver.clone();
            let stats = self.stats.clone();

            tokio::spawn(async move {
                tracing::info!(worker = worker_id, "Job worker started");

                loop {
                    let job = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };
                    let Some(job) = job else {
                        tracing::info!(worker = worker_id, "Job worker shutting down");
                        break;
                    };

                    stats.pending.fetch_sub(1, Ordering::Relaxed);
                    stats.processing.fetch_add(1, Ordering::Relaxed);

                    let job_id = job.id.clone();
                    tracing::debug!(
                        worker = worker_id,
                        job_id = %job_id,
                        job_type = %job.job_type,
                        "Processing job"
                    );

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
        Ok(QueueStats {
            pending: self.stats.pending.load(Ordering::Relaxed),
            processing: self.stats.processing.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_rejects_when_full() {
        let queue = InMemoryJobQueue::new(InMemoryJobQueueConfig {
            max_size: 1,
            workers: 1,
        });
        queue.enqueue(Job::new("a", serde_json::json!({}))).await.unwrap();

        let err = queue
            .enqueue(Job::new("b", serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, JobQueueError::QueueFull));
    }

    #[tokio::test]
    async fn test_workers_run_jobs_once() {
        let queue = InMemoryJobQueue::default();
        let handler: JobHandler = Box::new(|job: Job| {
            Box::pin(async move {
                if job.job_type == "ok" {
                    JobResult::Success
                } else {
                    JobResult::Failed("boom".into())
                }
            })
        });
        queue.start_worker(handler).await.unwrap();

        queue.enqueue(Job::new("ok", serde_json::json!({}))).await.unwrap();
        queue.enqueue(Job::new("bad", serde_json::json!({}))).await.unwrap();

        for _ in 0..50 {
            let stats = queue.stats().await.unwrap();
            if stats.completed + stats.failed == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 0);
    }
}
