//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    /// `up`, `down`, or `memory` when no database is configured.
    pub database: &'static str,
    pub pending_jobs: Option<usize>,
}

/// Health check endpoint - returns server status.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = database_status(&state).await;
    let pending_jobs = match state.queue.stats().await {
        Ok(stats) => Some(stats.pending),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read job queue stats");
            None
        }
    };

    let response = HealthResponse {
        status: if database == "down" { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database,
        pending_jobs,
    };

    HttpResponse::Ok().json(response)
}

#[cfg(feature = "postgres")]
async fn database_status(state: &AppState) -> &'static str {
    match state.db.as_ref() {
        Some(db) => match db.ping().await {
            Ok(()) => "up",
            Err(e) => {
                tracing::error!(error = %e, "Database ping failed");
                "down"
            }
        },
        None => "memory",
    }
}

#[cfg(not(feature = "postgres"))]
async fn database_status(_state: &AppState) -> &'static str {
    "memory"
}

#[cfg(test)]
mod tests {
    use actix_web::test;

    use crate::handlers::test_support::TestApp;

    #[actix_web::test]
    async fn reports_in_memory_store() {
        let ctx = TestApp::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "memory");
        assert_eq!(body["pending_jobs"], 0);
    }
}
