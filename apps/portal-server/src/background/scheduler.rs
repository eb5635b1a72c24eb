//! Cron-style job scheduler using tokio-cron-scheduler.

use std::sync::Arc;

use portal_core::services::DigestJob;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::config::DigestConfig;

/// Cron job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
    enabled: bool,
}

impl Scheduler {
    pub async fn new(enabled: bool) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, enabled })
    }

    /// Add a cron job. `schedule` has six fields, seconds first.
    pub async fn add_cron<F, Fut>(
        &self,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.enabled {
            tracing::info!("Scheduler disabled");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

/// Build a started scheduler running the weekly digest.
pub async fn start_digest_scheduler(
    config: &DigestConfig,
    digest: Arc<DigestJob>,
) -> Result<Scheduler, JobSchedulerError> {
    let scheduler = Scheduler::new(config.enabled).await?;

    scheduler
        .add_cron(&config.schedule, move || {
            let digest = digest.clone();
            async move {
                tracing::info!("Weekly digest triggered");
                digest.run().await;
            }
        })
        .await?;

    scheduler.start().await?;
    Ok(scheduler)
}
