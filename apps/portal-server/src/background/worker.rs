//! Routes queued jobs to the services that handle them.

use std::sync::Arc;

use portal_core::ports::{Job, JobHandler, JobResult};
use portal_core::services::{FanOutDispatcher, POST_PUBLISHED_JOB, PostPublished};

/// Handler for every job type the portal enqueues.
pub fn job_router(dispatcher: Arc<FanOutDispatcher>) -> JobHandler {
    Box::new(move |job: Job| {
        let dispatcher = dispatcher.clone();
        Box::pin(async move { route(&dispatcher, job).await })
    })
}

async fn route(dispatcher: &FanOutDispatcher, job: Job) -> JobResult {
    match job.job_type.as_str() {
        POST_PUBLISHED_JOB => {
            let payload: PostPublished = match job.payload_as() {
                Ok(payload) => payload,
                Err(e) => {
                    return JobResult::Failed(format!("invalid payload: {}", e));
                }
            };
            match dispatcher.dispatch_by_id(payload.post_id).await {
                Ok(Some(report)) if report.failed > 0 => {
                    tracing::warn!(
                        job_id = %job.id,
                        post_id = %payload.post_id,
                        failed = report.failed,
                        "Some notifications were not delivered"
                    );
                    JobResult::Success
                }
                Ok(_) => JobResult::Success,
                Err(e) => JobResult::Failed(e.to_string()),
            }
        }
        other => {
            tracing::warn!(job_id = %job.id, job_type = %other, "No handler for job type");
            JobResult::Failed(format!("unknown job type '{}'", other))
        }
    }
}
